//! Line diff rendering for failed comparisons.
//!
//! Both documents are pretty-printed side by side with object keys sorted.
//! The first column marks each line: blank when both sides agree, `-` for
//! expected-only content and `+` for received-only content.
//!
//! ```text
//!  {
//!    "bar": 123,
//! +  "baz": true,
//! -  "foo": 321,
//! +  "foo": 313,
//!    "prefixed_foo": "ooo::321"
//!  }
//! ```

use serde_json::Value;

use super::{Captures, Comparer};
use crate::store::VarStore;

pub(super) fn render(
    cmp: &Comparer,
    scope: &VarStore,
    captures: &Captures,
    expected: &Value,
    received: &Value,
) -> String {
    let mut renderer = Renderer {
        cmp,
        scope,
        captures,
        lines: Vec::new(),
    };
    renderer.node(0, None, Some(expected), Some(received), false);
    renderer.lines.join("\n")
}

struct Renderer<'a> {
    cmp: &'a Comparer,
    scope: &'a VarStore,
    captures: &'a Captures,
    lines: Vec<String>,
}

impl Renderer<'_> {
    fn node(
        &mut self,
        depth: usize,
        key: Option<&str>,
        expected: Option<&Value>,
        received: Option<&Value>,
        comma: bool,
    ) {
        match (expected, received) {
            (Some(e), Some(r)) => self.pair(depth, key, e, r, comma),
            (Some(e), None) => self.value('-', depth, key, e, comma),
            (None, Some(r)) => self.value('+', depth, key, r, comma),
            (None, None) => {}
        }
    }

    fn pair(&mut self, depth: usize, key: Option<&str>, e: &Value, r: &Value, comma: bool) {
        let leaf = self.cmp.is_ignored(e) || self.cmp.placeholder(self.scope, e).is_some();
        let empty = match (e, r) {
            (Value::Object(eo), Value::Object(ro)) => eo.is_empty() && ro.is_empty(),
            (Value::Array(ea), Value::Array(ra)) => ea.is_empty() && ra.is_empty(),
            _ => false,
        };

        match (e, r) {
            (Value::Object(eo), Value::Object(ro)) if !leaf && !empty => {
                let mut keys: Vec<&String> = eo.keys().collect();
                if !self.cmp.ignores_added_fields() {
                    keys.extend(ro.keys().filter(|k| !eo.contains_key(k.as_str())));
                }
                keys.sort();

                self.open(depth, key, '{');
                let last = keys.len();
                for (i, k) in keys.into_iter().enumerate() {
                    self.node(depth + 1, Some(k), eo.get(k), ro.get(k), i + 1 < last);
                }
                self.close(depth, '}', comma);
            }
            (Value::Array(ea), Value::Array(ra)) if !leaf && !empty => {
                self.open(depth, key, '[');
                let n = ea.len().max(ra.len());
                for i in 0..n {
                    self.node(depth + 1, None, ea.get(i), ra.get(i), i + 1 < n);
                }
                self.close(depth, ']', comma);
            }
            _ if self.cmp.leaf_matches(self.scope, self.captures, e, r) => {
                self.value(' ', depth, key, r, comma)
            }
            _ => {
                self.value('-', depth, key, e, comma);
                self.value('+', depth, key, r, comma);
            }
        }
    }

    fn value(&mut self, marker: char, depth: usize, key: Option<&str>, v: &Value, comma: bool) {
        let pretty = serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string());
        let mut lines: Vec<String> = pretty.lines().map(str::to_string).collect();

        if let (Some(k), Some(first)) = (key, lines.first_mut()) {
            *first = format!("{}: {first}", quote(k));
        }
        if let (true, Some(last)) = (comma, lines.last_mut()) {
            last.push(',');
        }

        for line in lines {
            self.line(marker, depth, &line);
        }
    }

    fn open(&mut self, depth: usize, key: Option<&str>, bracket: char) {
        let text = match key {
            Some(k) => format!("{}: {bracket}", quote(k)),
            None => bracket.to_string(),
        };
        self.line(' ', depth, &text);
    }

    fn close(&mut self, depth: usize, bracket: char, comma: bool) {
        let text = if comma {
            format!("{bracket},")
        } else {
            bracket.to_string()
        };
        self.line(' ', depth, &text);
    }

    fn line(&mut self, marker: char, depth: usize, text: &str) {
        self.lines.push(format!("{marker}{}{text}", "  ".repeat(depth)));
    }
}

fn quote(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""))
}
