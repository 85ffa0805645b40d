//! JSON comparison with placeholder capture
//!
//! Compares an expected template with a received document. A string leaf in
//! the template that is a bare variable name (`"$id"`) with no stored value
//! is a capture point: it matches whatever is received at that path and,
//! once the whole comparison succeeds, binds the variable to that value.
//!
//! Rules applied while walking both trees:
//!
//! - objects: every expected key must be present and match; extra received
//!   keys fail unless `ignore_added_fields` is set
//! - arrays: same length, element-wise match
//! - numbers: compared by value, `1` equals `1.0`
//! - the ignore-diff marker matches any present value and captures nothing
//!
//! Failures carry a key-sorted line diff.

mod diff;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::VarsConfig;
use crate::error::{Result, VarsError};
use crate::relaxed;
use crate::replace::replace;
use crate::store::{is_var_name, VarStore};

/// Values bound during a comparison, keyed by variable name.
pub type Captures = BTreeMap<String, Value>;

/// Why two payloads did not match.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// What was being asserted, e.g. a json path or variable name.
    pub context: Option<String>,
    pub detail: MismatchDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MismatchDetail {
    /// Both sides are JSON; rendered line diff.
    Diff(String),
    /// At least one side is not JSON; raw texts.
    Raw { expected: String, received: String },
}

impl Mismatch {
    pub fn diff(diff: String) -> Self {
        Self {
            context: None,
            detail: MismatchDetail::Diff(diff),
        }
    }

    pub fn raw(expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self {
            context: None,
            detail: MismatchDetail::Raw {
                expected: expected.into(),
                received: received.into(),
            },
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{context}: ")?;
        }
        match &self.detail {
            MismatchDetail::Diff(diff) => write!(f, "not equal:\n{diff}"),
            MismatchDetail::Raw { expected, received } => {
                write!(f, "expected: {expected:?}, received: {received:?}")
            }
        }
    }
}

/// Structural JSON comparer.
#[derive(Debug, Clone)]
pub struct Comparer {
    prefix: char,
    ignore_diff_marker: String,
    ignore_added_fields: bool,
    capture: bool,
}

impl Comparer {
    pub fn new(config: &VarsConfig, ignore_added_fields: bool) -> Self {
        Self {
            prefix: config.var_prefix,
            ignore_diff_marker: config.ignore_diff_marker.clone(),
            ignore_added_fields,
            capture: true,
        }
    }

    /// Treat variable placeholders as plain strings.
    pub fn without_capture(mut self) -> Self {
        self.capture = false;
        self
    }

    /// Compare two decoded documents.
    ///
    /// Returns the captured bindings on success. `scope` is only read, to
    /// tell unresolved placeholders from literal strings.
    pub fn compare(
        &self,
        scope: &VarStore,
        expected: &Value,
        received: &Value,
    ) -> std::result::Result<Captures, Mismatch> {
        let mut captures = Captures::new();

        if self.walk(scope, expected, received, &mut captures) {
            return Ok(captures);
        }

        let rendered = diff::render(self, scope, &captures, expected, received);
        Err(Mismatch::diff(rendered))
    }

    /// Substitute known variables into `expected`, compare it with
    /// `received` and bind captured placeholders into `scope`.
    ///
    /// Payloads that are not both JSON are compared byte for byte.
    pub fn assert_payload(
        &self,
        scope: &mut VarStore,
        expected: &str,
        received: &[u8],
    ) -> Result<()> {
        let expected = replace(scope, expected)?;

        if let Some((exp, rcv)) = decode_pair(&expected, received)? {
            let captures = self.compare(scope, &exp, &rcv).map_err(|m| {
                warn!("payload assertion failed");
                VarsError::Mismatch(m)
            })?;
            self.commit(scope, captures);
            return Ok(());
        }

        if expected.as_bytes() != received {
            return Err(VarsError::Mismatch(Mismatch::raw(
                expected,
                String::from_utf8_lossy(received),
            )));
        }

        Ok(())
    }

    pub(crate) fn commit(&self, scope: &mut VarStore, captures: Captures) {
        for (name, value) in captures {
            debug!(var = %name, value = %value, "captured variable");
            scope.set(name, value);
        }
    }

    /// Unresolved placeholder name at an expected leaf.
    fn placeholder<'v>(&self, scope: &VarStore, expected: &'v Value) -> Option<&'v str> {
        match expected {
            Value::String(s)
                if self.capture && is_var_name(s, self.prefix) && !scope.contains(s) =>
            {
                Some(s.as_str())
            }
            _ => None,
        }
    }

    fn is_ignored(&self, expected: &Value) -> bool {
        matches!(expected, Value::String(s) if *s == self.ignore_diff_marker)
    }

    fn walk(
        &self,
        scope: &VarStore,
        expected: &Value,
        received: &Value,
        captures: &mut Captures,
    ) -> bool {
        if self.is_ignored(expected) {
            return true;
        }

        if let Some(name) = self.placeholder(scope, expected) {
            return match captures.get(name) {
                Some(bound) => json_equal(bound, received),
                None => {
                    captures.insert(name.to_string(), received.clone());
                    true
                }
            };
        }

        match (expected, received) {
            (Value::Object(exp), Value::Object(rcv)) => {
                let mut ok = true;
                for (key, e) in exp {
                    ok &= match rcv.get(key) {
                        Some(r) => self.walk(scope, e, r, captures),
                        None => false,
                    };
                }
                if !self.ignore_added_fields && rcv.keys().any(|k| !exp.contains_key(k)) {
                    ok = false;
                }
                ok
            }
            (Value::Array(exp), Value::Array(rcv)) => {
                let mut ok = exp.len() == rcv.len();
                for (e, r) in exp.iter().zip(rcv) {
                    ok &= self.walk(scope, e, r, captures);
                }
                ok
            }
            (Value::Object(_) | Value::Array(_), _) => false,
            _ => json_equal(expected, received),
        }
    }

    /// Leaf-level match used by the renderer, with captures frozen.
    fn leaf_matches(
        &self,
        scope: &VarStore,
        captures: &Captures,
        expected: &Value,
        received: &Value,
    ) -> bool {
        if self.is_ignored(expected) {
            return true;
        }
        if let Some(name) = self.placeholder(scope, expected) {
            return captures
                .get(name)
                .is_some_and(|bound| json_equal(bound, received));
        }
        json_equal(expected, received)
    }

    pub(crate) fn ignores_added_fields(&self) -> bool {
        self.ignore_added_fields
    }
}

/// Decode both sides when both are JSON.
///
/// `expected` has already been through [`replace`], which downgrades relaxed
/// JSON; `received` is downgraded here.
fn decode_pair(expected: &str, received: &[u8]) -> Result<Option<(Value, Value)>> {
    let Ok(exp) = serde_json::from_str::<Value>(expected) else {
        return Ok(None);
    };

    let Ok(text) = std::str::from_utf8(received) else {
        return Ok(None);
    };

    let rcv = match serde_json::from_str::<Value>(text) {
        Ok(rcv) => rcv,
        Err(_) => match relaxed::downgrade(text)? {
            Some(strict) => serde_json::from_str(&strict).map_err(|e| VarsError::decode(text, e))?,
            None => return Ok(None),
        },
    };

    Ok(Some((exp, rcv)))
}

/// Deep equality with numbers compared by value.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| json_equal(v, w))
        }
        _ => a == b,
    }
}
