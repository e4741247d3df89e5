//! Integration tests for `#[derive(Bind)]`.
//!
//! These tests verify that the derive compiles for the supported field
//! attributes and produces correct implementations.

use std::collections::HashMap;

use cinch::{Bind, HostType, Value};

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Shift {
    #[bind(constraint = ">=0")]
    pub id: i64,

    #[bind(rename = "employee", optional)]
    pub employee_name: String,

    #[bind(constraint = "start + 8", optional)]
    pub end: Option<u32>,

    pub start: u32,

    #[bind(skip)]
    pub note: String,
}

#[derive(Bind, Debug, PartialEq)]
pub struct Wrapper<T> {
    pub value: T,
    pub tags: HashMap<String, T>,
}

#[derive(Bind, Debug, PartialEq)]
pub struct Keywords {
    pub r#type: String,
}

#[derive(Bind)]
pub struct Empty {}

fn shift() -> Shift {
    Shift {
        id: 7,
        employee_name: "Alice".to_string(),
        end: None,
        start: 9,
        note: "morning".to_string(),
    }
}

#[test]
fn test_host_type_lists_bound_fields() {
    let HostType::Struct(ty) = Shift::host_type() else {
        panic!("expected a struct host type");
    };
    assert_eq!(ty.name, "Shift");

    let fields = ty.fields();
    let names: Vec<&str> = fields.iter().map(|f| f.name).collect();
    assert_eq!(names, ["id", "employee", "end", "start"]);

    assert_eq!(fields[0].constraint, Some(">=0"));
    assert!(!fields[0].optional);
    assert!(fields[1].optional);
    assert_eq!(fields[2].constraint, Some("start + 8"));
    assert!(matches!(fields[2].host_type(), HostType::Pointer(_)));
    assert_eq!(fields[3].constraint, None);
}

#[test]
fn test_zero_and_is_zero() {
    let zero = Shift::zero();
    assert!(zero.is_zero());
    assert_eq!(zero.note, "");
    assert!(!shift().is_zero());

    // Skipped fields do not count.
    let mut noted = Shift::zero();
    noted.note = "x".to_string();
    assert!(noted.is_zero());

    assert!(Empty::zero().is_zero());
}

#[test]
fn test_encode_uses_labels_and_skips_unset() {
    let encoded = shift().encode().unwrap().unwrap();
    assert_eq!(
        encoded.to_string(),
        r#"{id: 7, employee: "Alice", start: 9}"#
    );

    let mut unnamed = shift();
    unnamed.employee_name.clear();
    unnamed.end = Some(17);
    assert_eq!(
        unnamed.encode().unwrap().unwrap().to_string(),
        "{id: 7, end: 17, start: 9}"
    );

    assert_eq!(Empty {}.encode().unwrap(), Some(Value::structure(Vec::<(&str, Value)>::new())));
}

#[test]
fn test_decode_writes_present_fields_only() {
    let mut value = shift();
    let resolved = Value::structure([("end", Value::Int(17)), ("employee", Value::string("Bob"))]);
    value.decode(&resolved).unwrap();

    assert_eq!(value.end, Some(17));
    assert_eq!(value.employee_name, "Bob");
    assert_eq!(value.id, 7);
    assert_eq!(value.note, "morning");
}

#[test]
fn test_decode_errors_name_the_field() {
    let mut value = shift();
    let err = value
        .decode(&Value::structure([("start", Value::string("nine"))]))
        .unwrap_err();
    assert_eq!(err.to_string(), r#"start: expected int, found "nine""#);

    assert!(value.decode(&Value::Int(1)).is_err());
}

#[test]
fn test_generic_struct() {
    let mut tags = HashMap::new();
    tags.insert("k".to_string(), 2i64);
    let wrapper = Wrapper { value: 1i64, tags };
    assert_eq!(
        wrapper.encode().unwrap().unwrap().to_string(),
        "{value: 1, tags: {k: 2}}"
    );

    let HostType::Struct(ty) = Wrapper::<String>::host_type() else {
        panic!("expected a struct host type");
    };
    assert_eq!(ty.name, "Wrapper");
    assert_ne!(ty.type_id, match Wrapper::<i64>::host_type() {
        HostType::Struct(other) => other.type_id,
        _ => panic!("expected a struct host type"),
    });
}

#[test]
fn test_raw_identifiers_are_unescaped() {
    let value = Keywords {
        r#type: "shift".to_string(),
    };
    assert_eq!(
        value.encode().unwrap().unwrap().to_string(),
        r#"{type: "shift"}"#
    );
}
