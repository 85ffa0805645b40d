//! Configuration loader
//!
//! Loads and validates `VarsConfig` from YAML or from the environment.
//!
//! Environment variables:
//!
//! | variable | field |
//! |---|---|
//! | `SCENARIO_VARS_CONFIG` | YAML file loaded before the overrides below |
//! | `SCENARIO_VARS_PREFIX` | `var_prefix` |
//! | `SCENARIO_VARS_IGNORE_DIFF` | `ignore_diff_marker` |
//! | `SCENARIO_VARS_FIXTURES` | `fixtures_dir` |

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::store::DEFAULT_PREFIX;

pub const ENV_CONFIG: &str = "SCENARIO_VARS_CONFIG";
pub const ENV_PREFIX: &str = "SCENARIO_VARS_PREFIX";
pub const ENV_IGNORE_DIFF: &str = "SCENARIO_VARS_IGNORE_DIFF";
pub const ENV_FIXTURES: &str = "SCENARIO_VARS_FIXTURES";

pub const DEFAULT_IGNORE_DIFF_MARKER: &str = "<ignore-diff>";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VarsConfig {
    /// Sigil that starts every variable name.
    pub var_prefix: char,
    /// Expected-side string that matches any received value.
    pub ignore_diff_marker: String,
    /// Base directory for relative template file paths.
    pub fixtures_dir: Option<PathBuf>,
}

impl Default for VarsConfig {
    fn default() -> Self {
        Self {
            var_prefix: DEFAULT_PREFIX,
            ignore_diff_marker: DEFAULT_IGNORE_DIFF_MARKER.to_string(),
            fixtures_dir: None,
        }
    }
}

impl VarsConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse vars config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid vars config in {}", path.display()))?;

        info!(
            "Loaded vars config from {} (prefix {:?})",
            path.display(),
            config.var_prefix
        );

        Ok(config)
    }

    /// Defaults, then the `SCENARIO_VARS_CONFIG` file if set, then the
    /// individual overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(prefix) = lookup(ENV_PREFIX) {
            config.var_prefix = single_char(&prefix)
                .ok_or_else(|| anyhow!("{ENV_PREFIX} must be one character, got {prefix:?}"))?;
        }
        if let Some(marker) = lookup(ENV_IGNORE_DIFF) {
            config.ignore_diff_marker = marker;
        }
        if let Some(dir) = lookup(ENV_FIXTURES) {
            config.fixtures_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.var_prefix;
        if p.is_alphanumeric() || p == '_' || p.is_whitespace() {
            bail!("var_prefix {p:?} must not be a word or whitespace character");
        }
        if self.ignore_diff_marker.is_empty() {
            bail!("ignore_diff_marker must not be empty");
        }
        Ok(())
    }

    /// Join a relative template path onto `fixtures_dir`.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match &self.fixtures_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
