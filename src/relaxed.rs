//! Relaxed JSON downgrade
//!
//! Templates written in feature files tend to be hand-edited, so they may
//! carry comments (`//`, `/* */`), trailing commas, unquoted identifier keys
//! and single-quoted strings. This module recognises that superset with a
//! small nom parser and re-emits it as compact strict JSON. Number text and
//! key order are preserved exactly as written.
//!
//! ```text
//! { // created user
//!   id: "$id", 'name': 'O\'Brien', tags: [1, 2,], }
//!                     ↓
//! {"id":"$id","name":"O'Brien","tags":[1,2]}
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{char, digit0, digit1, multispace1, one_of, satisfy},
    combinator::{all_consuming, map, opt, recognize, value},
    error::{Error as NomError, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

use crate::error::{Result, VarsError};

type Res<'a, T> = IResult<&'a str, T>;

// ============================================================================
// Public API
// ============================================================================

/// True when `input` is a complete relaxed JSON document.
pub fn is_valid(input: &str) -> bool {
    document(input).is_ok()
}

/// Downgrade relaxed JSON to compact strict JSON.
///
/// Returns `Ok(None)` when `input` is not relaxed JSON at all; such text is
/// not a template document and callers leave it untouched.
pub fn downgrade(input: &str) -> Result<Option<String>> {
    let strict = match document(input) {
        Ok((_, strict)) => strict,
        Err(_) => return Ok(None),
    };

    serde_json::from_str::<serde::de::IgnoredAny>(&strict).map_err(|e| {
        VarsError::template(format!("failed to downgrade relaxed JSON to JSON: {e}"))
    })?;

    Ok(Some(strict))
}

// ============================================================================
// Internal Parsers
// ============================================================================

/// Nesting limit for objects and arrays, serde_json's recursion limit.
const MAX_DEPTH: usize = 128;

fn document(input: &str) -> Res<'_, String> {
    all_consuming(delimited(skip, json_value(0), skip))(input)
}

fn sym<'a>(c: char) -> impl FnMut(&'a str) -> Res<'a, char> {
    char(c)
}

/// Whitespace and comments.
fn skip(input: &str) -> Res<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), take_while(|c| c != '\n'))),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

fn json_value<'a>(depth: usize) -> impl FnMut(&'a str) -> Res<'a, String> {
    move |input| {
        alt((
            move |i: &'a str| object(i, depth),
            move |i: &'a str| array(i, depth),
            quoted,
            number,
            map(alt((tag("true"), tag("false"), tag("null"))), |s: &str| {
                s.to_string()
            }),
        ))(input)
    }
}

/// Open a nested container, failing hard past `MAX_DEPTH`.
fn open<'a>(bracket: char, depth: usize) -> impl FnMut(&'a str) -> Res<'a, ()> {
    move |input| {
        let (rest, _) = pair(sym(bracket), skip)(input)?;
        if depth >= MAX_DEPTH {
            return Err(nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge)));
        }
        Ok((rest, ()))
    }
}

fn object(input: &str, depth: usize) -> Res<'_, String> {
    let (mut input, _) = open('{', depth)(input)?;
    let mut members = Vec::new();

    loop {
        if let Ok((rest, _)) = sym('}')(input) {
            return Ok((rest, format!("{{{}}}", members.join(","))));
        }

        let (rest, key) = terminated(object_key, skip)(input)?;
        let (rest, _) = terminated(sym(':'), skip)(rest)?;
        let (rest, val) = terminated(json_value(depth + 1), skip)(rest)?;
        members.push(format!("{key}:{val}"));

        match sym(',')(rest) {
            Ok((rest, _)) => input = skip(rest)?.0,
            Err(_) => {
                let (rest, _) = sym('}')(rest)?;
                return Ok((rest, format!("{{{}}}", members.join(","))));
            }
        }
    }
}

fn array(input: &str, depth: usize) -> Res<'_, String> {
    let (mut input, _) = open('[', depth)(input)?;
    let mut items = Vec::new();

    loop {
        if let Ok((rest, _)) = sym(']')(input) {
            return Ok((rest, format!("[{}]", items.join(","))));
        }

        let (rest, item) = terminated(json_value(depth + 1), skip)(input)?;
        items.push(item);

        match sym(',')(rest) {
            Ok((rest, _)) => input = skip(rest)?.0,
            Err(_) => {
                let (rest, _) = sym(']')(rest)?;
                return Ok((rest, format!("[{}]", items.join(","))));
            }
        }
    }
}

fn object_key(input: &str) -> Res<'_, String> {
    alt((quoted, map(identifier, |id| format!("\"{id}\""))))(input)
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

/// Double or single quoted string, always emitted double quoted.
fn quoted(input: &str) -> Res<'_, String> {
    let (rest, quote) = one_of("\"'")(input)?;
    let mut out = String::from("\"");
    let mut chars = rest.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '\'')) => out.push('\''),
                // Line continuation
                Some((_, '\n')) => {}
                Some((_, escaped)) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => break,
            },
            c if c == quote => {
                out.push('"');
                return Ok((&rest[idx + c.len_utf8()..], out));
            }
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }

    Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)))
}

fn number(input: &str) -> Res<'_, String> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((tag("0"), recognize(pair(one_of("123456789"), digit0)))),
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    Ok((rest, text.trim_start_matches('+').to_string()))
}
