//! JSON path selection
//!
//! Supported subset:
//!
//! ```text
//! $                  root
//! .name  ['name']    object member
//! [2]  [-1]          array element, negative counts from the end
//! .*  [*]            every member or element
//! ```
//!
//! A path without wildcards selects a single value. A path with a wildcard
//! selects every match, returned as an array in document order.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use serde_json::Value;

use crate::error::{Result, VarsError};

type Res<'a, T> = IResult<&'a str, T>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(i64),
    Wildcard,
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let (_, segments) = path(raw.trim()).map_err(|_| VarsError::JsonPath {
            path: raw.to_string(),
            reason: "invalid path syntax".to_string(),
        })?;

        Ok(Self {
            raw: raw.trim().to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn is_multi(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    /// Select from `doc`.
    ///
    /// A missing member or out-of-range index is an error on a single-value
    /// path; under a wildcard it is skipped.
    pub fn select(&self, doc: &Value) -> Result<Value> {
        let multi = self.is_multi();
        let mut current = vec![doc];

        for segment in &self.segments {
            let mut next = Vec::new();

            for v in current {
                match (segment, v) {
                    (Segment::Key(k), Value::Object(map)) => match map.get(k) {
                        Some(found) => next.push(found),
                        None if multi => {}
                        None => return Err(self.error(format!("unknown key {k}"))),
                    },
                    (Segment::Index(i), Value::Array(items)) => {
                        match resolve_index(*i, items.len()) {
                            Some(idx) => next.push(&items[idx]),
                            None if multi => {}
                            None => return Err(self.error(format!("index {i} out of range"))),
                        }
                    }
                    (Segment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                    (Segment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                    _ if multi => {}
                    (Segment::Key(k), _) => {
                        return Err(self.error(format!("cannot select key {k} from {}", kind(v))))
                    }
                    (Segment::Index(i), _) => {
                        return Err(self.error(format!("cannot select index {i} from {}", kind(v))))
                    }
                    (Segment::Wildcard, _) => {}
                }
            }

            current = next;
        }

        if multi {
            return Ok(Value::Array(current.into_iter().cloned().collect()));
        }

        current
            .into_iter()
            .next()
            .cloned()
            .ok_or_else(|| self.error("no match".to_string()))
    }

    fn error(&self, reason: String) -> VarsError {
        VarsError::JsonPath {
            path: self.raw.clone(),
            reason,
        }
    }
}

fn resolve_index(i: i64, len: usize) -> Option<usize> {
    let idx = if i < 0 {
        len.checked_sub(usize::try_from(i.unsigned_abs()).ok()?)?
    } else {
        usize::try_from(i).ok()?
    };
    (idx < len).then_some(idx)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn path(input: &str) -> Res<'_, Vec<Segment>> {
    all_consuming(preceded(char('$'), many0(segment)))(input)
}

fn segment(input: &str) -> Res<'_, Segment> {
    alt((
        preceded(char('.'), alt((value(Segment::Wildcard, char('*')), member))),
        delimited(
            pair(char('['), multispace0),
            alt((value(Segment::Wildcard, char('*')), index, bracket_key)),
            pair(multispace0, char(']')),
        ),
    ))(input)
}

fn member(input: &str) -> Res<'_, Segment> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '$'),
        |s: &str| Segment::Key(s.to_string()),
    )(input)
}

fn index(input: &str) -> Res<'_, Segment> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>().map(Segment::Index)
    })(input)
}

fn bracket_key(input: &str) -> Res<'_, Segment> {
    map(alt((quoted('\''), quoted('"'))), Segment::Key)(input)
}

fn quoted<'a>(q: char) -> impl FnMut(&'a str) -> Res<'a, String> {
    move |input| {
        let stop: &str = if q == '\'' { "'\\" } else { "\"\\" };
        delimited(
            char(q),
            map(
                opt(escaped_transform(
                    is_not(stop),
                    '\\',
                    alt((
                        value("\\", tag("\\")),
                        value("'", tag("'")),
                        value("\"", tag("\"")),
                    )),
                )),
                Option::unwrap_or_default,
            ),
            char(q),
        )(input)
    }
}
