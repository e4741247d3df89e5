//! Tests for lattice unification.

use super::*;

fn int_or_default(default: i64) -> Value {
    Disjunction::from_alternatives(vec![
        Alternative {
            value: Value::kind_of(Kind::INT),
            default: false,
        },
        Alternative {
            value: Value::Int(default),
            default: true,
        },
    ])
}

#[test]
fn test_top_is_identity() {
    assert_eq!(unify(&Value::top(), &Value::Int(3)), Value::Int(3));
    assert_eq!(unify(&Value::string("a"), &Value::top()), Value::string("a"));
}

#[test]
fn test_conflicting_atoms() {
    let result = unify(&Value::Int(1), &Value::Int(2));
    assert!(result.is_bottom());
    assert_eq!(
        result.conflict().unwrap().message,
        "conflicting values 1 and 2"
    );
}

#[test]
fn test_kind_and_bound() {
    let at_least_five = Value::bound(BoundOp::Ge, Value::Int(5));
    let int_at_least_five = unify(&Value::kind_of(Kind::INT), &at_least_five);
    assert_eq!(int_at_least_five.to_string(), "int & >=5");

    assert_eq!(unify(&int_at_least_five, &Value::Int(7)), Value::Int(7));
    assert!(unify(&int_at_least_five, &Value::Int(4)).is_bottom());
    assert!(unify(&int_at_least_five, &Value::Float(5.5)).is_bottom());
    assert!(unify(&at_least_five, &Value::string("x")).is_bottom());
}

#[test]
fn test_not_null_admits_structs() {
    let not_null = Value::bound(BoundOp::Ne, Value::Null);
    let s = Value::structure([("a", Value::Int(1))]);
    assert_eq!(unify(&not_null, &s), s);
    assert!(unify(&not_null, &Value::Null).is_bottom());
}

#[test]
fn test_default_is_dropped_by_concrete_value() {
    let value = unify(&int_or_default(1), &Value::Int(4));
    assert_eq!(value, Value::Int(4));
}

#[test]
fn test_default_survives_kind() {
    let value = unify(&int_or_default(1), &Value::kind_of(Kind::INT));
    assert!(!value.is_concrete());
    assert_eq!(value.defaulted(), Some(Value::Int(1)));
    assert_eq!(value.to_string(), "int | *1");
}

#[test]
fn test_ambiguous_defaults_have_no_default() {
    let value = Disjunction::from_alternatives(vec![
        Alternative {
            value: Value::Int(1),
            default: true,
        },
        Alternative {
            value: Value::Int(2),
            default: true,
        },
    ]);
    assert_eq!(value.defaulted(), None);
}

#[test]
fn test_empty_disjunction_is_bottom() {
    let value = unify(&int_or_default(1), &Value::string("x"));
    assert!(value.is_bottom());
}

#[test]
fn test_struct_conflict_path() {
    let a = Value::structure([("x", Value::Int(1)), ("y", Value::Int(2))]);
    let b = Value::structure([("y", Value::Int(3))]);
    let conflict = unify(&a, &b).conflict().cloned().unwrap();
    assert_eq!(conflict.path.to_string(), "y");
}

#[test]
fn test_open_list_against_closed_list() {
    let pattern = Value::open_list(
        vec![Value::top(), Value::string("b")],
        Value::top(),
    );
    let list = Value::list(vec![
        Value::string("a"),
        Value::string("b"),
        Value::string("c"),
    ]);
    assert_eq!(unify(&pattern, &list), list);

    let wrong = Value::list(vec![Value::string("a"), Value::string("x")]);
    let conflict = unify(&pattern, &wrong).conflict().cloned().unwrap();
    assert_eq!(conflict.path.to_string(), "[1]");
}

#[test]
fn test_closed_list_lengths() {
    let four = Value::list(vec![Value::kind_of(Kind::STRING); 4]);
    let three = Value::list(vec![Value::string("a"); 3]);
    let result = unify(&four, &three);
    assert_eq!(
        result.conflict().unwrap().message,
        "incompatible list lengths (4 and 3)"
    );
}

#[test]
fn test_int_float_equality() {
    assert_eq!(unify(&Value::Int(2), &Value::Float(2.0)), Value::Float(2.0));
    assert!(unify(&Value::Int(2), &Value::Float(2.5)).is_bottom());
}

#[test]
fn test_concreteness() {
    assert!(Value::list(vec![Value::Int(1)]).is_concrete());
    assert!(!Value::open_list(vec![], Value::top()).is_concrete());
    assert!(!Value::structure([("a", Value::top())]).is_concrete());
}

#[cfg(feature = "serde")]
#[test]
fn test_serialize_concrete() {
    let value = Value::structure([
        ("a", Value::Int(1)),
        ("b", Value::list(vec![Value::string("x")])),
    ]);
    assert_eq!(
        serde_json::to_string(&value).unwrap(),
        r#"{"a":1,"b":["x"]}"#
    );
    assert!(serde_json::to_string(&Value::top()).is_err());
}
