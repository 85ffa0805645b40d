//! Global, feature and scenario scopes
//!
//! ```text
//! VarsSuite ─┬─ registry (read-only once scenarios run)
//!            └─ Mutex<SharedScopes> ─┬─ global
//!                                    └─ features["checkout.feature"], ...
//!
//! start_scenario(feature) ──► Scenario { vars: global ∪ feature snapshot }
//! ```
//!
//! Every access to the shared scopes goes through one mutex. The
//! once-per-feature and once-globally table operations hold it across the
//! whole check, evaluate and store sequence, so concurrent scenarios never
//! evaluate the same row twice.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::config::VarsConfig;
use crate::error::Result;
use crate::expr::Resolver;
use crate::registry::{generators, Registry};
use crate::store::{VarName, VarStore};

#[derive(Debug, Default)]
struct SharedScopes {
    global: VarStore,
    features: HashMap<String, VarStore>,
}

/// Wider scope a table row may be bound in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SharedLayer {
    Feature,
    Global,
}

/// Suite-wide state: configuration, registry and shared scopes.
#[derive(Debug)]
pub struct VarsSuite {
    config: VarsConfig,
    registry: Registry,
    shared: Mutex<SharedScopes>,
}

impl VarsSuite {
    pub fn new(config: VarsConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            shared: Mutex::new(SharedScopes::default()),
        }
    }

    /// Register `alphanum-8` and `uuid` generators.
    pub fn with_builtin_generators(mut self) -> Self {
        self.registry
            .add_generator("alphanum-8", generators::alphanumeric(8));
        self.registry.add_generator("uuid", generators::uuid_v4());
        self
    }

    /// Register a generator. Only possible before the suite is shared.
    ///
    /// Once-per-feature and once-globally rows run callables while the
    /// shared scopes are locked, so a callable must not call back into the
    /// suite. Factories write through the `&mut VarStore` they receive.
    pub fn add_generator<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.registry.add_generator(name, f);
    }

    /// Register a factory. Only possible before the suite is shared.
    ///
    /// Once-per-feature and once-globally rows run callables while the
    /// shared scopes are locked, so a callable must not call back into the
    /// suite. Factories write through the `&mut VarStore` they receive.
    pub fn add_factory<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut VarStore, Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.registry.add_factory(name, f);
    }

    pub fn config(&self) -> &VarsConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Create a scenario scope seeded with global, then feature bindings.
    pub fn start_scenario(self: &Arc<Self>, feature: impl Into<String>) -> Scenario {
        let feature = feature.into();
        let mut shared = self.lock_shared();

        let mut vars = shared.global.fork();
        let feature_scope = shared.features.entry(feature.clone()).or_default();
        vars.seed_from(feature_scope);

        debug!(feature = %feature, vars = vars.len(), "scenario scope started");

        Scenario {
            suite: Arc::clone(self),
            feature,
            vars,
        }
    }

    /// Snapshot of the global scope.
    pub fn global_vars(&self) -> VarStore {
        self.lock_shared().global.fork()
    }

    /// Snapshot of a feature scope, `None` until the feature is first used.
    pub fn feature_vars(&self, feature: &str) -> Option<VarStore> {
        self.lock_shared().features.get(feature).map(VarStore::fork)
    }

    fn lock_shared(&self) -> MutexGuard<'_, SharedScopes> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for VarsSuite {
    fn default() -> Self {
        Self::new(VarsConfig::default())
    }
}

/// Variables of one running scenario.
///
/// Owned exclusively by the scenario; dropped when the scenario ends.
#[derive(Debug)]
pub struct Scenario {
    pub(crate) suite: Arc<VarsSuite>,
    feature: String,
    pub(crate) vars: VarStore,
}

impl Scenario {
    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn vars(&self) -> &VarStore {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarStore {
        &mut self.vars
    }

    pub fn suite(&self) -> &Arc<VarsSuite> {
        &self.suite
    }

    pub(crate) fn parse_name(&self, raw: &str) -> Result<VarName> {
        VarName::parse(raw.trim(), self.suite.config.var_prefix)
    }

    /// Bind each `(name, expression)` row in the scenario scope, evaluating
    /// the expression only when `layer` does not hold the name yet.
    pub(crate) fn set_values_once(
        &mut self,
        layer: SharedLayer,
        rows: &[(VarName, &str)],
    ) -> Result<()> {
        let suite = Arc::clone(&self.suite);
        let resolver = Resolver::new(&suite.registry);
        let mut shared = suite.lock_shared();

        let scope = match layer {
            SharedLayer::Global => &mut shared.global,
            SharedLayer::Feature => shared.features.entry(self.feature.clone()).or_default(),
        };

        for (name, expr) in rows {
            let value = match scope.get(name.as_str()) {
                Some(existing) => {
                    debug!(var = %name, ?layer, "reusing shared value");
                    existing.clone()
                }
                None => {
                    let value = resolver.resolve(&mut self.vars, expr)?;
                    debug!(var = %name, ?layer, value = %value, "evaluated shared value");
                    scope.set(name.as_str(), value.clone());
                    value
                }
            };

            self.vars.set(name.as_str(), value);
        }

        Ok(())
    }
}
