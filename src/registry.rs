//! Generator and factory registry
//!
//! Both kinds of callables are registered by name during suite setup and
//! looked up by name while scenarios run. The registry is mutated only
//! through `&mut self`, so once it is shared behind an `Arc` it is read-only
//! and lookups need no locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, VarsError};
use crate::store::VarStore;

/// Zero-argument value producer, invoked as `gen:<name>`.
pub type Generator = Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>;

/// Value constructor invoked as `<name>(<args>)`.
///
/// Receives the scenario scope, which it may update, and the already
/// resolved argument values.
pub type Factory = Arc<dyn Fn(&mut VarStore, Vec<Value>) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Registry {
    generators: HashMap<String, Generator>,
    factories: HashMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator, replacing any previous one with the same name.
    pub fn add_generator<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.generators.insert(name.into(), Arc::new(f));
    }

    /// Register a factory, replacing any previous one with the same name.
    pub fn add_factory<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut VarStore, Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(f));
    }

    pub fn factory(&self, name: &str) -> Option<&Factory> {
        self.factories.get(name)
    }

    pub fn has_generator(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Invoke the generator registered as `name`.
    pub fn generate(&self, name: &str) -> Result<Value> {
        let generator = self
            .generators
            .get(name)
            .ok_or_else(|| VarsError::UnknownGenerator(name.to_string()))?;

        debug!(generator = name, "generating value");

        generator().map_err(|source| VarsError::Generator {
            name: name.to_string(),
            source,
        })
    }

    pub fn generator_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.generators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn factory_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("generators", &self.generator_names())
            .field("factories", &self.factory_names())
            .finish()
    }
}

/// Ready-made generators for random identifiers.
pub mod generators {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    use serde_json::Value;

    /// Random ASCII letters and digits of fixed length.
    pub fn alphanumeric(len: usize) -> impl Fn() -> anyhow::Result<Value> + Send + Sync {
        move || {
            let s: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            Ok(Value::String(s))
        }
    }

    /// Random v4 UUID in hyphenated form.
    pub fn uuid_v4() -> impl Fn() -> anyhow::Result<Value> + Send + Sync {
        || Ok(Value::String(uuid::Uuid::new_v4().to_string()))
    }
}
