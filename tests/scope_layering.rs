//! Global and feature scopes shared by concurrently running scenarios.

mod common;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};

use common::{init_tracing, table};
use scenario_vars::VarsSuite;

const FEATURES: [&str; 2] = ["Feature1.feature", "Feature2.feature"];
const CONCURRENCY: usize = 10;

struct Counters {
    feature_seq: Arc<AtomicI64>,
    global_seq: Arc<AtomicI64>,
}

fn suite() -> (Arc<VarsSuite>, Counters) {
    init_tracing();

    let counters = Counters {
        feature_seq: Arc::new(AtomicI64::new(0)),
        global_seq: Arc::new(AtomicI64::new(0)),
    };

    let mut suite = VarsSuite::default();

    let seq = Arc::clone(&counters.feature_seq);
    suite.add_generator("featureSeq", move || {
        Ok(json!(seq.fetch_add(1, Ordering::SeqCst) + 1))
    });

    let seq = Arc::clone(&counters.global_seq);
    suite.add_generator("globalSeq", move || {
        Ok(json!(seq.fetch_add(1, Ordering::SeqCst) + 1))
    });

    (Arc::new(suite), counters)
}

#[test]
fn once_per_feature_and_once_globally_under_concurrency() {
    let (suite, counters) = suite();

    let handles: Vec<_> = (0..CONCURRENCY * FEATURES.len())
        .map(|i| {
            let suite = Arc::clone(&suite);
            let feature = FEATURES[i % FEATURES.len()];

            thread::spawn(move || {
                let mut sc = suite.start_scenario(feature);
                sc.set_values_once_globally(&table(&[("$gid", "gen:globalSeq")]))
                    .unwrap();
                sc.set_values_once_per_feature(&table(&[("$fid", "gen:featureSeq")]))
                    .unwrap();
                sc.set_values(&table(&[("$local", "gen:featureSeq")]))
                    .unwrap();

                (
                    feature,
                    sc.vars().get("$gid").cloned(),
                    sc.vars().get("$fid").cloned(),
                )
            })
        })
        .collect();

    let results: Vec<(&str, Option<Value>, Option<Value>)> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(counters.global_seq.load(Ordering::SeqCst), 1);

    for feature in FEATURES {
        let seen: Vec<&Value> = results
            .iter()
            .filter(|(f, _, _)| *f == feature)
            .filter_map(|(_, _, fid)| fid.as_ref())
            .collect();

        assert_eq!(seen.len(), CONCURRENCY);
        assert!(seen.iter().all(|v| *v == seen[0]), "{feature}: {seen:?}");
    }

    assert!(results.iter().all(|(_, gid, _)| *gid == Some(json!(1))));

    // Two feature values plus one unshared value per scenario.
    assert_eq!(
        counters.feature_seq.load(Ordering::SeqCst),
        (FEATURES.len() + CONCURRENCY * FEATURES.len()) as i64
    );
}

#[test]
fn shared_values_seed_later_scenarios() {
    let (suite, _) = suite();

    let mut first = suite.start_scenario(FEATURES[0]);
    first
        .set_values_once_globally(&table(&[("$gid", "gen:globalSeq")]))
        .unwrap();
    first
        .set_values_once_per_feature(&table(&[("$fid", "gen:featureSeq")]))
        .unwrap();
    first.resolve_and_store("$local", "1").unwrap();

    let same_feature = suite.start_scenario(FEATURES[0]);
    assert_eq!(same_feature.vars().get("$gid"), Some(&json!(1)));
    assert_eq!(same_feature.vars().get("$fid"), Some(&json!(1)));
    assert!(same_feature.vars().get("$local").is_none());

    let other_feature = suite.start_scenario(FEATURES[1]);
    assert_eq!(other_feature.vars().get("$gid"), Some(&json!(1)));
    assert!(other_feature.vars().get("$fid").is_none());
}

#[test]
fn scenario_values_feed_shared_expressions() {
    let (suite, _) = suite();

    let mut sc = suite.start_scenario(FEATURES[0]);
    sc.resolve_and_store("$base", r#""tenant""#).unwrap();
    sc.set_values_once_per_feature(&table(&[("$name", r#""$base-1""#)]))
        .unwrap();

    assert_eq!(sc.vars().get("$name"), Some(&json!("tenant-1")));
    assert_eq!(
        suite.feature_vars(FEATURES[0]).unwrap().get("$name"),
        Some(&json!("tenant-1"))
    );
}
