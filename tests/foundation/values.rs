//! Integration tests for Value types
//!
//! Tests equality, hashing, identifier handling and display.

use std::collections::HashSet;

use concord_foundation::{Array, Id, Value, record};

// =============================================================================
// Equality
// =============================================================================

#[test]
fn id_and_string_are_distinct_values() {
    let id = Value::from(Id::new("u1"));
    let text = Value::from("u1");
    assert_ne!(id, text);
    assert_eq!(id.as_id_str(), text.as_id_str());
}

#[test]
fn as_id_str_rejects_other_types() {
    assert_eq!(Value::Int(1).as_id_str(), None);
    assert_eq!(Value::Null.as_id_str(), None);
}

#[test]
fn float_equality_is_bitwise() {
    assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    assert_ne!(Value::Float(0.0), Value::Float(-0.0));
}

#[test]
fn int_and_float_compare_but_are_not_equal() {
    assert_ne!(Value::Int(1), Value::Float(1.0));
    assert!(Value::Int(1) < Value::Float(1.5));
}

#[test]
fn values_hash_consistently() {
    let set: HashSet<Value> = [
        Value::from("a"),
        Value::from("a"),
        Value::from(Id::new("a")),
        Value::from(vec![1, 2]),
        Value::from(vec![1, 2]),
    ]
    .into_iter()
    .collect();
    assert_eq!(set.len(), 3);
}

// =============================================================================
// Identifiers
// =============================================================================

#[test]
fn generated_ids_are_unique() {
    let ids: HashSet<Id> = (0..100).map(|_| Id::generate()).collect();
    assert_eq!(ids.len(), 100);
}

// =============================================================================
// Display
// =============================================================================

#[test]
fn display_nested_values() {
    let list: Array = [Value::from("bob"), Value::Bool(true)].into_iter().collect();
    assert_eq!(format!("{}", Value::Array(list)), "[bob, true]");

    let record = Value::Record(record! { user: Id::new("u1") });
    assert!(format!("{record}").contains("u1"));
}
