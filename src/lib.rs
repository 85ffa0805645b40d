//! Scenario variables for behaviour-driven API tests
//!
//! Steps of a scenario bind values to `$name` variables, substitute them into
//! request templates and compare received JSON against expected templates,
//! capturing unknown placeholders as new variables on the way.
//!
//! Key concepts:
//! - Variables live in layered scopes: global → feature → scenario
//! - `"$id"` in a template is replaced by the typed value, `"ooo::$id"` by its text
//! - `"$id"` in an expected document that is not bound yet captures the received value
//! - Values come from literals, `gen:<name>` generators or `name(args)` factories
//!
//! # Example
//!
//! ```gherkin
//! Given variable $user is set to newUserID("John Doe", addDuration(now(), "-10h"))
//! When I request "/orders" with body
//!   """json5
//!   {user: "$user", /* any id */ ref: "gen:uuid"}
//!   """
//! Then the response body matches
//!   """json
//!   {"id": "$order_id", "user": "$user", "created_at": "<ignore-diff>"}
//!   """
//! And variable $order matches JSON paths
//!   | $.items[0].sku | "A-1" |
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use scenario_vars::{VarsConfig, VarsSuite};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let suite = Arc::new(VarsSuite::new(VarsConfig::from_env()?).with_builtin_generators());
//!
//! let mut scenario = suite.start_scenario("orders.feature");
//! scenario.resolve_and_store("$ref", "gen:uuid")?;
//! let body = scenario.replace(r#"{"ref": "$ref"}"#)?;
//! # let response = body.as_bytes();
//! scenario.assert_payload(r#"{"ref": "$ref", "id": "$order_id"}"#, response, true)?;
//! # Ok(())
//! # }
//! ```

mod compare;
mod config;
mod error;
mod expr;
mod infer;
mod jsonpath;
pub mod relaxed;
mod registry;
mod replace;
mod scopes;
mod steps;
mod store;

pub use compare::{json_equal, Captures, Comparer, Mismatch, MismatchDetail};
pub use config::VarsConfig;
pub use error::{Result, VarsError};
pub use expr::Resolver;
pub use infer::infer;
pub use jsonpath::JsonPath;
pub use registry::{generators, Factory, Generator, Registry};
pub use replace::{replace, replace_table};
pub use scopes::{Scenario, VarsSuite};
pub use store::{is_var_name, VarName, VarStore, DEFAULT_PREFIX};
