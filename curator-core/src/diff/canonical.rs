//! Canonical forms for diffable values.
//!
//! Two snapshots that differ only by the order of an unordered collection,
//! the key order of a map, or the order of credited people must compare
//! equal after canonicalization.

use std::cmp::Ordering;

use curator_model::FieldKind;
use serde_json::{Map, Value};

/// Normalize one field value. `null` and empty collections collapse to
/// `None` so that absence has a single representation.
pub fn canonicalize(kind: FieldKind, value: Option<Value>) -> Option<Value> {
    let value = value?;
    let canonical = match (kind, value) {
        (_, Value::Null) => return None,
        (FieldKind::UnorderedSet, Value::Array(mut values)) => {
            values.sort_by(compare_values);
            Value::Array(values)
        }
        (FieldKind::PeopleList, Value::Array(mut people)) => {
            people.sort_by(compare_people);
            Value::Array(people)
        }
        (FieldKind::KeyedMap, Value::Object(map)) => Value::Object(sorted_map(map)),
        (_, other) => other,
    };

    match &canonical {
        Value::Array(values) if values.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(canonical),
    }
}

fn sorted_map(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|left, right| left.0.cmp(&right.0));
    entries.into_iter().collect()
}

fn text_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn compare_people(left: &Value, right: &Value) -> Ordering {
    text_field(left, "name")
        .cmp(text_field(right, "name"))
        .then_with(|| text_field(left, "kind").cmp(text_field(right, "kind")))
        .then_with(|| text_field(left, "role").cmp(text_field(right, "role")))
}

/// Total order over JSON scalars, used to sort set members.
fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.total_cmp(&b)
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => rank(left)
            .cmp(&rank(right))
            .then_with(|| left.to_string().cmp(&right.to_string())),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Structural equality. Arrays compare element-wise in order, objects by key
/// set, numbers by value regardless of integer or float representation.
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| b.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => false,
    }
}

/// `None` and `Some(null)` are the same absence.
pub fn optional_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None | Some(Value::Null), None | Some(Value::Null)) => true,
        (Some(a), Some(b)) => deep_equal(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sets_sort_and_empty_sets_vanish() {
        let sorted = canonicalize(
            FieldKind::UnorderedSet,
            Some(json!(["Drama", "Action", "Crime"])),
        );
        assert_eq!(sorted, Some(json!(["Action", "Crime", "Drama"])));
        assert_eq!(canonicalize(FieldKind::UnorderedSet, Some(json!([]))), None);
        assert_eq!(canonicalize(FieldKind::Scalar, Some(Value::Null)), None);
    }

    #[test]
    fn people_sort_by_name_then_kind() {
        let people = canonicalize(
            FieldKind::PeopleList,
            Some(json!([
                {"name": "Bryan Cranston", "kind": "Actor", "role": "Walter White"},
                {"name": "Aaron Paul", "kind": "Actor"},
                {"name": "Bryan Cranston", "kind": "Director"}
            ])),
        )
        .unwrap();
        let names: Vec<_> = people
            .as_array()
            .unwrap()
            .iter()
            .map(|p| (text_field(p, "name"), text_field(p, "kind")))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Aaron Paul", "Actor"),
                ("Bryan Cranston", "Actor"),
                ("Bryan Cranston", "Director")
            ]
        );
    }

    #[test]
    fn deep_equal_handles_numbers_and_nesting() {
        assert!(deep_equal(&json!(7), &json!(7.0)));
        assert!(deep_equal(&json!({"a": [1, {"b": "c"}]}), &json!({"a": [1, {"b": "c"}]})));
        assert!(!deep_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!deep_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!deep_equal(&Value::Null, &json!("")));
    }

    #[test]
    fn null_and_missing_are_equal() {
        assert!(optional_equal(None, Some(&Value::Null)));
        assert!(!optional_equal(None, Some(&json!(0))));
    }
}
