//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Value};

use scenario_vars::VarsSuite;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const NOW: &str = "2023-05-22T19:38:00Z";

pub fn table(rows: &[(&str, &str)]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|(a, b)| vec![a.to_string(), b.to_string()])
        .collect()
}

/// Register `now()`, `addDuration(base, duration)` and
/// `newUserID(name, registeredAt)`.
pub fn register_user_factories(suite: &mut VarsSuite) {
    suite.add_factory("now", |_, _| Ok(json!(NOW)));

    suite.add_factory("addDuration", |_, args| {
        let [base, duration] = args.as_slice() else {
            bail!("two arguments expected, {} received", args.len());
        };
        let base = parse_time(base)?;
        let duration = parse_duration(duration)?;

        Ok(json!((base + duration).to_rfc3339_opts(SecondsFormat::Secs, true)))
    });

    suite.add_factory("newUserID", |scope, args| {
        let [name, registered_at] = args.as_slice() else {
            bail!("two arguments expected, {} received", args.len());
        };
        let name = name.as_str().context("name must be a string")?;
        parse_time(registered_at)?;

        scope.set("$last_user_name", json!(name));
        scope.set("$last_user_registered_at", registered_at.clone());

        Ok(json!(12321))
    });
}

fn parse_time(v: &Value) -> anyhow::Result<DateTime<Utc>> {
    let s = v.as_str().ok_or_else(|| anyhow!("time must be a string, got {v}"))?;
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("parsing time {s}"))?
        .with_timezone(&Utc))
}

/// `-10h`, `30m`, `+5s`.
fn parse_duration(v: &Value) -> anyhow::Result<Duration> {
    let s = v.as_str().ok_or_else(|| anyhow!("duration must be a string, got {v}"))?;
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let (amount, unit) = rest.split_at(rest.len().saturating_sub(1));
    let amount: i64 = amount.parse().with_context(|| format!("parsing duration {s}"))?;

    let d = match unit {
        "h" => Duration::hours(amount),
        "m" => Duration::minutes(amount),
        "s" => Duration::seconds(amount),
        other => bail!("unknown duration unit {other:?} in {s}"),
    };
    Ok(d * sign)
}
