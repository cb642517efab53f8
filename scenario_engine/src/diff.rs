//! Semantic comparison of expected and observed text.
//!
//! When both sides parse as JSON they are compared structurally, so scenario
//! authors need not reproduce key order or whitespace. Anything else is
//! compared literally.

use std::collections::BTreeSet;

use serde_json::Value;

/// Compares `want` against `got`.
///
/// Returns `None` when they are equal, or a `(-want +got)` report describing
/// every difference otherwise.
///
/// # Examples
///
/// ```
/// use scenario_engine::semantic_diff;
///
/// assert!(semantic_diff(r#"{"a": 1, "b": 2}"#, r#"{"b":2,"a":1}"#).is_none());
/// assert!(semantic_diff("abc", "abd").is_some());
/// ```
#[must_use]
pub fn semantic_diff(want: &str, got: &str) -> Option<String> {
    match (
        serde_json::from_str::<Value>(want),
        serde_json::from_str::<Value>(got),
    ) {
        (Ok(want_json), Ok(got_json)) => {
            let mut lines = Vec::new();
            diff_values("$", &want_json, &got_json, &mut lines);
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => (want != got).then(|| format!("-\t{want:?}\n+\t{got:?}")),
    }
}

fn diff_values(path: &str, want: &Value, got: &Value, out: &mut Vec<String>) {
    match (want, got) {
        (Value::Object(want_map), Value::Object(got_map)) => {
            let keys: BTreeSet<&String> = want_map.keys().chain(got_map.keys()).collect();
            for key in keys {
                let child = format!("{path}.{key}");
                match (want_map.get(key), got_map.get(key)) {
                    (Some(w), Some(g)) => diff_values(&child, w, g, out),
                    (Some(w), None) => out.push(format!("{child}:\n-\t{w}")),
                    (None, Some(g)) => out.push(format!("{child}:\n+\t{g}")),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(want_items), Value::Array(got_items)) => {
            let len = want_items.len().max(got_items.len());
            for index in 0..len {
                let child = format!("{path}[{index}]");
                match (want_items.get(index), got_items.get(index)) {
                    (Some(w), Some(g)) => diff_values(&child, w, g, out),
                    (Some(w), None) => out.push(format!("{child}:\n-\t{w}")),
                    (None, Some(g)) => out.push(format!("{child}:\n+\t{g}")),
                    (None, None) => {}
                }
            }
        }
        (Value::Number(w), Value::Number(g)) => {
            if !numbers_equal(w, g) {
                out.push(leaf_report(path, want, got));
            }
        }
        _ => {
            if want != got {
                out.push(leaf_report(path, want, got));
            }
        }
    }
}

fn numbers_equal(want: &serde_json::Number, got: &serde_json::Number) -> bool {
    if let (Some(w), Some(g)) = (want.as_i64(), got.as_i64()) {
        return w == g;
    }
    if let (Some(w), Some(g)) = (want.as_u64(), got.as_u64()) {
        return w == g;
    }
    match (want.as_f64(), got.as_f64()) {
        (Some(w), Some(g)) => w.total_cmp(&g).is_eq(),
        _ => false,
    }
}

fn leaf_report(path: &str, want: &Value, got: &Value) -> String {
    format!("{path}:\n-\t{want}\n+\t{got}")
}
