//! Semantic JSON comparison with path-annotated differences.

use crate::model::JsonMatchType;
use serde_json::Value;

/// Compare an expected JSON document against an actual one.
///
/// Returns an empty list when they match. Object key order and number
/// formatting never matter; `Strict` additionally rejects unexpected fields
/// and compares arrays in order.
pub fn compare(expected: &Value, actual: &Value, match_type: JsonMatchType) -> Vec<String> {
    let mut differences = Vec::new();
    compare_at(expected, actual, match_type, "", &mut differences);
    differences
}

pub fn matches(expected: &Value, actual: &Value, match_type: JsonMatchType) -> bool {
    compare(expected, actual, match_type).is_empty()
}

fn compare_at(
    expected: &Value,
    actual: &Value,
    match_type: JsonMatchType,
    path: &str,
    differences: &mut Vec<String>,
) {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            for (key, expected_value) in expected {
                let child = format!("{}/{}", path, key);
                match actual.get(key) {
                    Some(actual_value) => {
                        compare_at(expected_value, actual_value, match_type, &child, differences)
                    }
                    None => differences.push(format!("Path '{}' missing", child)),
                }
            }
            if match_type == JsonMatchType::Strict {
                for key in actual.keys().filter(|k| !expected.contains_key(*k)) {
                    differences.push(format!("Path '{}/{}' unexpected", path, key));
                }
            }
        }
        (Value::Array(expected), Value::Array(actual)) => {
            if expected.len() != actual.len() {
                differences.push(format!(
                    "Path '{}' expected {} elements but was {}",
                    display(path),
                    expected.len(),
                    actual.len()
                ));
                return;
            }
            match match_type {
                JsonMatchType::Strict => {
                    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
                        compare_at(e, a, match_type, &format!("{}/{}", path, i), differences);
                    }
                }
                JsonMatchType::OnlyMatchingFields => {
                    let compatible: Vec<Vec<bool>> = expected
                        .iter()
                        .map(|e| actual.iter().map(|a| compare(e, a, match_type).is_empty()).collect())
                        .collect();
                    let assigned = assign_elements(&compatible, actual.len());
                    for (i, e) in expected.iter().enumerate() {
                        if !assigned.contains(&Some(i)) {
                            differences.push(format!(
                                "Path '{}/{}' no matching element for <{}>",
                                path, i, e
                            ));
                        }
                    }
                }
            }
        }
        (Value::Number(e), Value::Number(a)) => {
            let equal = match (e.as_f64(), a.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => e == a,
            };
            if !equal {
                differences.push(mismatch(path, expected, actual));
            }
        }
        _ => {
            if expected != actual {
                differences.push(mismatch(path, expected, actual));
            }
        }
    }
}

/// Maximum matching of expected elements onto actual ones (augmenting paths).
///
/// Returns, per actual element, the index of the expected element assigned to it.
fn assign_elements(compatible: &[Vec<bool>], actual_len: usize) -> Vec<Option<usize>> {
    let mut owner = vec![None; actual_len];
    for i in 0..compatible.len() {
        let mut visited = vec![false; actual_len];
        augment(i, compatible, &mut owner, &mut visited);
    }
    owner
}

fn augment(
    i: usize,
    compatible: &[Vec<bool>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for j in 0..owner.len() {
        if !compatible[i][j] || visited[j] {
            continue;
        }
        visited[j] = true;
        let free = match owner[j] {
            None => true,
            Some(other) => augment(other, compatible, owner, visited),
        };
        if free {
            owner[j] = Some(i);
            return true;
        }
    }
    false
}

fn mismatch(path: &str, expected: &Value, actual: &Value) -> String {
    format!(
        "Path '{}' expected <{}> but was <{}>",
        display(path),
        expected,
        actual
    )
}

fn display(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
