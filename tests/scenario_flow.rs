//! End-to-end scenario flows: set, substitute, assert, capture.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{init_tracing, register_user_factories, table};
use scenario_vars::{Scenario, VarsError, VarsSuite};

fn scenario() -> Scenario {
    init_tracing();

    let mut suite = VarsSuite::default().with_builtin_generators();
    suite.add_generator("new-id", || Ok(json!(1337)));
    register_user_factories(&mut suite);

    Arc::new(suite).start_scenario("users.feature")
}

#[test]
fn nested_factory_calls() {
    let mut sc = scenario();

    sc.resolve_and_store("$registered", r#"addDuration(now(), "-10h")"#)
        .unwrap();
    assert_eq!(
        sc.vars().get("$registered"),
        Some(&json!("2023-05-22T09:38:00Z"))
    );

    sc.resolve_and_store(
        "$user",
        r#"newUserID("John Doe", addDuration(now(), "-10h"))"#,
    )
    .unwrap();
    assert_eq!(sc.vars().get("$user"), Some(&json!(12321)));
    assert_eq!(sc.vars().get("$last_user_name"), Some(&json!("John Doe")));
    assert_eq!(
        sc.vars().get("$last_user_registered_at"),
        Some(&json!("2023-05-22T09:38:00Z"))
    );
}

#[test]
fn factory_argument_failure_names_index() {
    let mut sc = scenario();

    let err = sc
        .resolve_and_store("$user", r#"newUserID("John Doe", addDuration(now(), "soon"))"#)
        .unwrap_err();

    assert!(matches!(
        err,
        VarsError::FactoryArgument { ref factory, index: 1, .. } if factory == "newUserID"
    ));
    assert!(sc.vars().get("$user").is_none());
    assert!(sc.vars().get("$last_user_name").is_none());
}

#[test]
fn builtin_generators() {
    let mut sc = scenario();

    sc.set_values(&table(&[("$code", "gen:alphanum-8"), ("$ref", "gen:uuid")]))
        .unwrap();

    let code = sc.vars().get("$code").and_then(|v| v.as_str()).unwrap();
    assert_eq!(code.len(), 8);
    assert!(sc.vars().get("$ref").and_then(|v| v.as_str()).is_some());
}

#[test]
fn substitute_then_capture() {
    let mut sc = scenario();
    sc.resolve_and_store("$foo", "321").unwrap();

    let request = sc
        .replace(
            r#"{
                // relaxed template
                foo: "$foo",
                bar: 123,
                prefixed_foo: 'ooo::$foo',
            }"#,
        )
        .unwrap();
    assert_eq!(request, r#"{"foo":321,"bar":123,"prefixed_foo":"ooo::321"}"#);

    sc.assert_payload(
        r#"{"id":"$id","foo":"$foo","created":"<ignore-diff>"}"#,
        br#"{"id":"a-1","foo":321,"created":"2023-05-22","extra":[]}"#,
        true,
    )
    .unwrap();
    assert_eq!(sc.vars().get("$id"), Some(&json!("a-1")));

    sc.assert_payload(r#"{"id":"$id"}"#, br#"{"id":"a-1"}"#, false)
        .unwrap();
    assert!(sc
        .assert_payload(r#"{"id":"$id"}"#, br#"{"id":"a-2"}"#, false)
        .is_err());
}

#[test]
fn mismatch_diff_is_key_sorted() {
    let mut sc = scenario();
    sc.resolve_and_store("$foo", "321").unwrap();

    let err = sc
        .assert_payload(
            r#"{"foo":"$foo","bar":123,"prefixed_foo":"ooo::$foo"}"#,
            br#"{"foo":313,"bar":123,"baz":true,"prefixed_foo":"ooo::321"}"#,
            false,
        )
        .unwrap_err();

    let expected = r#"not equal:
 {
   "bar": 123,
+  "baz": true,
-  "foo": 321,
+  "foo": 313,
   "prefixed_foo": "ooo::321"
 }"#;

    assert_eq!(err.to_string(), expected);
}

#[test]
fn replace_table_cells() {
    let mut sc = scenario();
    sc.set_values(&table(&[
        ("$foo", "12"),
        ("$bar", "true"),
        ("$baz", r#""$foo""#),
    ]))
    .unwrap();

    let mut rows = vec![
        vec!["foo".to_string(), "bar".to_string(), "baz".to_string()],
        vec!["$foo_123".to_string(), "$bar".to_string(), "1/$baz".to_string()],
    ];
    sc.replace_table(&mut rows).unwrap();

    assert_eq!(rows[1], vec!["12_123", "true", "1/12"]);
}

#[test]
fn undefined_then_defined() {
    let mut sc = scenario();

    sc.assert_undefined("$foo").unwrap();
    sc.resolve_and_store("$foo", "abcdef").unwrap();

    let err = sc.assert_undefined("$foo").unwrap_err();
    assert_eq!(err.to_string(), r#"variable $foo is defined with value "abcdef""#);
    sc.assert_equal("$foo", r#""abcdef""#).unwrap();
}
