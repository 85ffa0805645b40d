//! Step operations
//!
//! The operations a scenario runner binds to step phrases. Each one works on
//! the scenario scope; the table variants take rows of string cells as they
//! come out of a feature file.
//!
//! | step phrase | operation |
//! |---|---|
//! | variable `$x` is set to `<expr>` | [`Scenario::resolve_and_store`] |
//! | variable `$x` equals to `<expr>` | [`Scenario::assert_equal`] |
//! | variable `$x` is undefined | [`Scenario::assert_undefined`] |
//! | variables are set to values | [`Scenario::set_values`] |
//! | variables are set once per feature | [`Scenario::set_values_once_per_feature`] |
//! | variables are set once globally | [`Scenario::set_values_once_globally`] |
//! | variables are equal to values | [`Scenario::assert_all_equal`] |
//! | variable `$x` matches JSON paths | [`Scenario::assert_variable_paths`] |

use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::compare::Comparer;
use crate::error::{Result, VarsError};
use crate::expr::Resolver;
use crate::infer::infer;
use crate::jsonpath::JsonPath;
use crate::relaxed;
use crate::replace;
use crate::scopes::{Scenario, SharedLayer};
use crate::store::VarName;

impl Scenario {
    /// Resolve `expr` and bind the result to `name`.
    pub fn resolve_and_store(&mut self, name: &str, expr: &str) -> Result<()> {
        let name = self.parse_name(name)?;
        let value = Resolver::new(self.suite.registry()).resolve(&mut self.vars, expr)?;
        self.vars.set(name.as_str(), value);
        Ok(())
    }

    /// Compare the stored value of `name` with `expr`, exactly.
    ///
    /// Placeholders in `expr` are plain strings here, nothing is captured.
    pub fn assert_equal(&self, name: &str, expr: &str) -> Result<()> {
        let name = self.parse_name(name)?;
        let stored = self
            .vars
            .get(name.as_str())
            .ok_or_else(|| VarsError::NotFound(name.to_string()))?;

        let expected = self.expected_value(expr)?;

        Comparer::new(self.suite.config(), false)
            .without_capture()
            .compare(&self.vars, &expected, stored)
            .map(|_| ())
            .map_err(|m| {
                warn!(var = %name, "variable assertion failed");
                VarsError::Mismatch(m.with_context(format!("variable {name}")))
            })
    }

    /// Fail when `name` is already bound, reporting its value.
    pub fn assert_undefined(&self, name: &str) -> Result<()> {
        let name = self.parse_name(name)?;
        match self.vars.get(name.as_str()) {
            Some(value) => Err(VarsError::AlreadyDefined {
                name: name.to_string(),
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Match `received` against the `expected` template, capturing
    /// unresolved placeholders into the scenario scope.
    pub fn assert_payload(
        &mut self,
        expected: &str,
        received: &[u8],
        ignore_added_fields: bool,
    ) -> Result<()> {
        Comparer::new(self.suite.config(), ignore_added_fields).assert_payload(
            &mut self.vars,
            expected,
            received,
        )
    }

    /// [`Scenario::assert_payload`] with the template read from a file.
    pub fn assert_payload_file(
        &mut self,
        path: impl AsRef<Path>,
        received: &[u8],
        ignore_added_fields: bool,
    ) -> Result<()> {
        let expected = self.read_template(path.as_ref())?;
        self.assert_payload(&expected, received, ignore_added_fields)
    }

    pub fn replace(&self, body: &str) -> Result<String> {
        replace::replace(&self.vars, body)
    }

    pub fn replace_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let body = self.read_template(path.as_ref())?;
        self.replace(&body)
    }

    pub fn replace_table(&self, rows: &mut [Vec<String>]) -> Result<()> {
        replace::replace_table(&self.vars, rows)
    }

    /// Match values selected from `received` by json path.
    ///
    /// Each row is `(path, expected expression)`. Rows are asserted in order
    /// and a row's captures are visible to the rows after it.
    pub fn assert_paths(
        &mut self,
        received: &[u8],
        rows: &[Vec<String>],
        ignore_added_fields: bool,
    ) -> Result<()> {
        let document = decode_document(received)?;
        let cmp = Comparer::new(self.suite.config(), ignore_added_fields);

        for (path, expr) in two_columns(rows)? {
            let path = JsonPath::parse(path)?;
            let actual = path.select(&document)?;
            let expected = self.expected_value(expr)?;

            let captures = cmp.compare(&self.vars, &expected, &actual).map_err(|m| {
                warn!(path = path.as_str(), "json path assertion failed");
                VarsError::Mismatch(m.with_context(format!("jsonpath {}", path.as_str())))
            })?;
            cmp.commit(&mut self.vars, captures);
        }

        Ok(())
    }

    /// Run [`Scenario::assert_paths`] against a stored variable, tolerating
    /// added fields.
    pub fn assert_variable_paths(&mut self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        let name = self.parse_name(name)?;
        let stored = self
            .vars
            .get(name.as_str())
            .ok_or_else(|| VarsError::NotFound(name.to_string()))?;

        let encoded = serde_json::to_vec(stored).map_err(|e| {
            VarsError::template(format!("failed to marshal variable {name}: {e}"))
        })?;

        self.assert_paths(&encoded, rows, true)
    }

    /// Apply [`Scenario::resolve_and_store`] to each `(name, expr)` row.
    pub fn set_values(&mut self, rows: &[Vec<String>]) -> Result<()> {
        for (name, expr) in two_columns(rows)? {
            self.resolve_and_store(name, expr)?;
        }
        Ok(())
    }

    /// Like [`Scenario::set_values`], but each expression is evaluated at
    /// most once per feature. Later scenarios of the feature reuse the value.
    pub fn set_values_once_per_feature(&mut self, rows: &[Vec<String>]) -> Result<()> {
        let rows = self.named_rows(rows)?;
        self.set_values_once(SharedLayer::Feature, &rows)
    }

    /// Like [`Scenario::set_values`], but each expression is evaluated at
    /// most once per suite. The value is visible to every later scenario.
    pub fn set_values_once_globally(&mut self, rows: &[Vec<String>]) -> Result<()> {
        let rows = self.named_rows(rows)?;
        self.set_values_once(SharedLayer::Global, &rows)
    }

    /// Apply [`Scenario::assert_equal`] to each `(name, expr)` row.
    pub fn assert_all_equal(&self, rows: &[Vec<String>]) -> Result<()> {
        for (name, expr) in two_columns(rows)? {
            self.assert_equal(name, expr)?;
        }
        Ok(())
    }

    fn named_rows<'r>(&self, rows: &'r [Vec<String>]) -> Result<Vec<(VarName, &'r str)>> {
        two_columns(rows)?
            .into_iter()
            .map(|(name, expr)| Ok((self.parse_name(name)?, expr)))
            .collect()
    }

    /// Substituted expected text, decoded as JSON or inferred.
    fn expected_value(&self, expr: &str) -> Result<Value> {
        let text = replace::replace(&self.vars, expr)?;
        match serde_json::from_str(&text) {
            Ok(v) => Ok(v),
            Err(_) => infer(&text),
        }
    }

    fn read_template(&self, path: &Path) -> Result<String> {
        let path = self.suite.config().resolve_path(path);
        std::fs::read_to_string(&path).map_err(|source| VarsError::Io { path, source })
    }
}

fn two_columns(rows: &[Vec<String>]) -> Result<Vec<(&str, &str)>> {
    rows.iter()
        .map(|row| match row.as_slice() {
            [a, b] => Ok((a.as_str(), b.as_str())),
            other => Err(VarsError::InvalidTable(other.len())),
        })
        .collect()
}

/// Strict JSON, else relaxed JSON. Invalid UTF-8 is a decode error.
fn decode_document(received: &[u8]) -> Result<Value> {
    let err = match serde_json::from_slice(received) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    let Ok(text) = std::str::from_utf8(received) else {
        return Err(VarsError::decode(&String::from_utf8_lossy(received), err));
    };

    match relaxed::downgrade(text)? {
        Some(strict) => serde_json::from_str(&strict).map_err(|e| VarsError::decode(text, e)),
        None => Err(VarsError::decode(text, err)),
    }
}
