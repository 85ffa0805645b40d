//! Expression evaluation
//!
//! A value expression is one of:
//!
//! - a factory call `name(arg0, arg1, ...)`, arguments being expressions
//!   themselves, e.g. `newUserID("John Doe", addDuration(now(), "-10h"))`
//! - a generator reference `gen:<name>`
//! - a literal, decoded as JSON or inferred as a scalar
//!
//! Resolution order, first success wins:
//!
//! ```text
//! text ──► replace vars ──► factory call? ──► gen:<name>? ──► JSON ──► infer
//! ```
//!
//! Inside a call, a top-level comma separates arguments. `\,` is a literal
//! comma, and commas inside nested calls or double-quoted strings do not
//! split.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, VarsError};
use crate::infer::infer;
use crate::registry::{Factory, Registry};
use crate::replace::replace;
use crate::store::VarStore;

/// Names that read as a call target, used to report unknown factories.
static CALL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w.\-]*$").unwrap());

const GENERATOR_PREFIX: &str = "gen:";

/// Resolves value expressions against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r Registry,
}

/// A parsed call whose factory is registered.
struct Call<'t> {
    name: &'t str,
    factory: Factory,
    args: Vec<String>,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Resolve `text` to a value.
    ///
    /// Literals that are not valid JSON fall back to type inference. The
    /// scope is updated only when resolution succeeds; factories that modify
    /// it see their changes dropped on failure.
    pub fn resolve(&self, scope: &mut VarStore, text: &str) -> Result<Value> {
        self.transaction(scope, text, false)
    }

    /// Like [`Resolver::resolve`] but literals must be JSON and call-shaped
    /// text naming an unregistered factory is an error.
    pub fn resolve_strict(&self, scope: &mut VarStore, text: &str) -> Result<Value> {
        self.transaction(scope, text, true)
    }

    fn transaction(&self, scope: &mut VarStore, text: &str, strict: bool) -> Result<Value> {
        let mut working = scope.fork();
        let value = self.eval(&mut working, text, strict)?;
        *scope = working;
        Ok(value)
    }

    fn eval(&self, scope: &mut VarStore, text: &str, strict: bool) -> Result<Value> {
        let replaced = replace(scope, text)?;
        let trimmed = text.trim();

        if let Some(call) = self.parse_call(trimmed, strict)? {
            return self.invoke(scope, call, strict);
        }

        if let Some(name) = trimmed.strip_prefix(GENERATOR_PREFIX) {
            return self.registry.generate(name.trim());
        }

        match serde_json::from_str(&replaced) {
            Ok(v) => Ok(v),
            Err(e) if strict => Err(VarsError::decode(&replaced, e)),
            Err(_) => infer(&replaced),
        }
    }

    fn parse_call<'t>(&self, text: &'t str, strict: bool) -> Result<Option<Call<'t>>> {
        let open = match text.find('(') {
            None | Some(0) => return Ok(None),
            Some(open) => open,
        };

        let name = text[..open].trim();
        let factory = match self.registry.factory(name) {
            Some(factory) => factory.clone(),
            None if strict && text.ends_with(')') && CALL_NAME_RE.is_match(name) => {
                return Err(VarsError::UnknownFactory(name.to_string()));
            }
            None => return Ok(None),
        };

        let inner = text[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| VarsError::syntax(text, "missing closing parenthesis"))?;

        let args = split_args(inner).map_err(|reason| VarsError::syntax(text, reason))?;

        Ok(Some(Call {
            name,
            factory,
            args,
        }))
    }

    fn invoke(&self, scope: &mut VarStore, call: Call<'_>, strict: bool) -> Result<Value> {
        let mut values = Vec::with_capacity(call.args.len());

        for (index, arg) in call.args.iter().enumerate() {
            let value =
                self.eval(scope, arg, strict)
                    .map_err(|e| VarsError::FactoryArgument {
                        factory: call.name.to_string(),
                        index,
                        source: Box::new(e),
                    })?;
            values.push(value);
        }

        debug!(factory = call.name, args = values.len(), "invoking factory");

        (call.factory)(scope, values).map_err(|source| VarsError::Factory {
            name: call.name.to_string(),
            source,
        })
    }
}

/// Split the interior of a call into top-level argument texts.
fn split_args(inner: &str) -> std::result::Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&',') => {
                chars.next();
                // Nested calls are split again when their arguments resolve.
                if depth > 0 {
                    current.push('\\');
                }
                current.push(',');
            }
            '\\' if in_string => {
                current.push(c);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => {
                in_string = !in_string;
                current.push(c);
            }
            '(' if !in_string => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_string => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unexpected closing parenthesis".to_string())?;
                current.push(c);
            }
            ',' if !in_string && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }

    if in_string {
        return Err("unterminated string".to_string());
    }
    if depth > 0 {
        return Err("missing closing parenthesis".to_string());
    }

    if args.is_empty() && current.trim().is_empty() {
        return Ok(args);
    }
    args.push(current.trim().to_string());

    Ok(args)
}
