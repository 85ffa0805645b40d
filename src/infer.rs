//! Literal type inference
//!
//! Turns raw step text into a typed value. Checked in order, first match
//! wins:
//!
//! 1. empty string stays an empty string
//! 2. `true` / `false` become booleans
//! 3. `null` becomes null
//! 4. a leading `"` is decoded as a JSON string
//! 5. a leading `[` or `{` is decoded as arbitrary JSON
//! 6. base-10 `i64`
//! 7. `f64` (finite only)
//! 8. anything else is returned as the original string
//!
//! Integers are tried before floats so digit-only ids stay exact.

use serde_json::{Number, Value};

use crate::error::{Result, VarsError};

pub fn infer(s: &str) -> Result<Value> {
    match s {
        "" => return Ok(Value::String(String::new())),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }

    if s.starts_with('"') {
        let decoded: String = serde_json::from_str(s).map_err(|e| VarsError::decode(s, e))?;
        return Ok(Value::String(decoded));
    }

    if s.starts_with('[') || s.starts_with('{') {
        return serde_json::from_str(s).map_err(|e| VarsError::decode(s, e));
    }

    if let Ok(i) = s.parse::<i64>() {
        return Ok(Value::Number(i.into()));
    }

    if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
        return Ok(Value::Number(n));
    }

    Ok(Value::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_scalars() {
        let cases = [
            ("", json!("")),
            ("123", json!(123)),
            ("-7", json!(-7)),
            ("123.45", json!(123.45)),
            ("true", json!(true)),
            ("false", json!(false)),
            ("null", Value::Null),
            (r#""bla\nbla""#, json!("bla\nbla")),
            ("hello world", json!("hello world")),
        ];

        for (input, expected) in cases {
            assert_eq!(infer(input).unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_infer_composites() {
        assert_eq!(infer(r#"{"foo":"bar"}"#).unwrap(), json!({"foo": "bar"}));
        assert_eq!(
            infer(r#"["abc", 1, false, null]"#).unwrap(),
            json!(["abc", 1, false, null])
        );
    }

    #[test]
    fn test_digits_stay_integers() {
        let v = infer("9007199254740993").unwrap();
        assert_eq!(v.as_i64(), Some(9_007_199_254_740_993));
    }

    #[test]
    fn test_non_finite_float_is_text() {
        assert_eq!(infer("NaN").unwrap(), json!("NaN"));
        assert_eq!(infer("inf").unwrap(), json!("inf"));
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        assert!(matches!(
            infer(r#""bla\nbl..."#),
            Err(VarsError::Decode { .. })
        ));
        assert!(matches!(
            infer(r#"{"foo":"ba...."#),
            Err(VarsError::Decode { .. })
        ));
    }
}
