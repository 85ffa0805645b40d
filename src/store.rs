//! Variable store
//!
//! A scope is a flat mapping from variable name (sigil included, e.g. `$foo`)
//! to a decoded JSON value. Scopes are layered by forking: a fork is a
//! snapshot of its parent at fork time, later parent writes are not visible
//! to it and child writes never reach the parent.
//!
//! A `VarStore` has no interior locking. The scenario owns its store
//! exclusively; shared global and feature stores are guarded by
//! [`crate::scopes::VarsSuite`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, VarsError};

/// Word characters allowed after the sigil.
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

/// Default variable sigil.
pub const DEFAULT_PREFIX: char = '$';

/// A validated variable name, sigil included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarName(String);

impl VarName {
    /// Parse `$name` style input, the prefix is kept as part of the key.
    pub fn parse(raw: &str, prefix: char) -> Result<Self> {
        if is_var_name(raw, prefix) {
            Ok(Self(raw.to_string()))
        } else {
            Err(VarsError::InvalidName {
                name: raw.to_string(),
                prefix,
            })
        }
    }

    /// Build a name from its bare word part, as captured by a step pattern.
    pub fn from_word(word: &str, prefix: char) -> Result<Self> {
        Self::parse(&format!("{prefix}{word}"), prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VarName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// True when `s` is the sigil followed by one or more word characters.
pub fn is_var_name(s: &str, prefix: char) -> bool {
    s.strip_prefix(prefix)
        .is_some_and(|word| WORD_RE.is_match(word))
}

/// Layered key/value store of scenario variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarStore {
    vars: BTreeMap<String, Value>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child scope seeded from a snapshot of this one.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Copy every entry of `other` into this scope, overwriting same names.
    pub fn seed_from(&mut self, other: &VarStore) {
        for (k, v) in &other.vars {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Bind `name`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Snapshot of all bindings, ordered by name.
    pub fn get_all(&self) -> BTreeMap<String, Value> {
        self.vars.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<(String, Value)> for VarStore {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
