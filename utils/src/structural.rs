//! Deep structural comparison of JSON values.
//!
//! Objects are compared by key set, not key order. Arrays are compared
//! element by element. Each mismatch is reported once, at the deepest path
//! where the two sides diverge.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

/// One point where `actual` and `expected` disagree.
///
/// A side is `None` when the path exists only in the other value.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub path: String,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |value: &Option<Value>| match value {
            Some(v) => v.to_string(),
            None => "<missing>".to_string(),
        };
        write!(
            f,
            "{}: expected {}, got {}",
            self.path,
            side(&self.expected),
            side(&self.actual)
        )
    }
}

/// Compute every difference between `actual` and `expected`.
///
/// An empty result means the values are deeply equal.
#[must_use]
pub fn structural_diff(actual: &Value, expected: &Value) -> Vec<Difference> {
    let mut out = Vec::new();
    walk("$", actual, expected, &mut out);
    out
}

fn walk(path: &str, actual: &Value, expected: &Value, out: &mut Vec<Difference>) {
    match (actual, expected) {
        (Value::Object(a), Value::Object(e)) => {
            let keys: BTreeSet<&String> = a.keys().chain(e.keys()).collect();
            for key in keys {
                let child = format!("{path}.{key}");
                match (a.get(key), e.get(key)) {
                    (Some(av), Some(ev)) => walk(&child, av, ev, out),
                    (av, ev) => out.push(Difference {
                        path: child,
                        expected: ev.cloned(),
                        actual: av.cloned(),
                    }),
                }
            }
        }
        (Value::Array(a), Value::Array(e)) => {
            for i in 0..a.len().max(e.len()) {
                let child = format!("{path}[{i}]");
                match (a.get(i), e.get(i)) {
                    (Some(av), Some(ev)) => walk(&child, av, ev, out),
                    (av, ev) => out.push(Difference {
                        path: child,
                        expected: ev.cloned(),
                        actual: av.cloned(),
                    }),
                }
            }
        }
        _ if actual == expected => {}
        _ => out.push(Difference {
            path: path.to_string(),
            expected: Some(expected.clone()),
            actual: Some(actual.clone()),
        }),
    }
}

/// Pretty-print with object keys sorted.
///
/// `serde_json::Map` keeps keys sorted unless the `preserve_order` feature
/// is enabled somewhere in the build, so objects are rebuilt in key order
/// to keep the output stable either way.
#[must_use]
pub fn to_sorted_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(&sorted(value)).unwrap_or_else(|_| value.to_string())
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
