//! Property tests for substitution and resolution.

use proptest::prelude::*;
use serde_json::{json, Value};

use scenario_vars::{replace, Registry, Resolver, VarStore};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-4000i32..4000).prop_map(|n| json!(f64::from(n) / 4.0)),
        "[a-zA-Z0-9 _.:/-]{0,16}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn stored_value_round_trips(v in value()) {
        let registry = Registry::new();
        let mut scope = VarStore::new();
        scope.set("$v", v.clone());

        let resolved = Resolver::new(&registry).resolve(&mut scope, "\"$v\"").unwrap();

        prop_assert_eq!(resolved, v);
    }

    #[test]
    fn longest_name_substituted_first(name in "[a-z]{1,8}", suffix in "[a-z0-9_]{1,8}") {
        let mut scope = VarStore::new();
        scope.set(format!("${name}"), json!(1));
        scope.set(format!("${name}{suffix}"), json!(2));

        let out = replace(&scope, &format!("${name}{suffix}")).unwrap();

        prop_assert_eq!(out, "2");
    }

    #[test]
    fn text_without_variables_is_unchanged(text in "note: [a-z ,.]{0,24}") {
        let mut scope = VarStore::new();
        scope.set("$foo", json!(1));

        let out = replace(&scope, &text).unwrap();

        prop_assert_eq!(out, text);
    }
}
