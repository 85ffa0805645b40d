//! Variable substitution
//!
//! Rewrites a template by substituting every stored variable reference.
//!
//! Two passes run over the (downgraded) text:
//!
//! 1. `"$name"` including its quotes becomes the JSON encoding of the value,
//!    so a number stays a number: `{"bar":"$foo"}` → `{"bar":123}`.
//! 2. Remaining bare `$name` occurrences become the value rendered as raw
//!    text (quotes stripped for strings), which allows embedding:
//!    `"ooo::$foo"` → `"ooo::321"`.
//!
//! The second pass substitutes longer names first so that `$foobar` is never
//! rewritten through its prefix `$foo`.

use std::cmp::Reverse;

use tracing::trace;

use crate::error::{Result, VarsError};
use crate::relaxed;
use crate::store::VarStore;

/// Substitute all variables known to `scope` into `body`.
///
/// Relaxed JSON input is downgraded to compact strict JSON first; anything
/// else is substituted as plain text.
pub fn replace(scope: &VarStore, body: &str) -> Result<String> {
    let mut body = match relaxed::downgrade(body)? {
        Some(strict) => strict,
        None => body.to_string(),
    };

    if scope.is_empty() {
        return Ok(body);
    }

    let mut encoded = Vec::with_capacity(scope.len());
    for (name, value) in scope.iter() {
        let json = serde_json::to_string(value).map_err(|e| {
            VarsError::template(format!("failed to marshal var {name} ({value}): {e}"))
        })?;

        body = body.replace(&format!("\"{name}\""), &json);
        encoded.push((name.as_str(), json));
    }

    // Longest names first, ties by name for a stable result.
    encoded.sort_by_key(|(name, _)| (Reverse(name.len()), *name));

    for (name, json) in &encoded {
        let raw = json
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(json.as_str());

        body = body.replace(name, raw);
    }

    trace!(vars = encoded.len(), "substituted variables");

    Ok(body)
}

/// Substitute variables into every cell of a string table, in place.
pub fn replace_table(scope: &VarStore, rows: &mut [Vec<String>]) -> Result<()> {
    for row in rows.iter_mut() {
        for cell in row.iter_mut() {
            *cell = replace(scope, cell)?;
        }
    }

    Ok(())
}
