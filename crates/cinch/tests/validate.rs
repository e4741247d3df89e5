//! Integration tests for `Context::validate` and `Context::constrain`.

mod common;

use std::sync::mpsc;
use std::sync::Arc;

use cinch::prelude::*;
use cinch::{BinderConfig, IssueKind, NilValidation, SchemaError};

use common::{init_tracing, Listed, Mapped, Sum, SumPtr, MIRRORED_KEYS};

fn paths(err: &BindError) -> Vec<String> {
    err.diagnostics()
        .map(|d| d.paths().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn test_consistent_sum_validates() {
    init_tracing();
    let ctx = Context::new();
    assert!(ctx.validate(&Sum::new(1, 4, 5)).is_ok());
    assert!(ctx.validate(&SumPtr { a: Some(1), b: Some(4), c: Some(5) }).is_ok());
}

#[test]
fn test_sum_mismatch_fails() {
    let ctx = Context::new();
    let err = ctx.validate(&Sum::new(1, 4, 6)).unwrap_err();
    let BindError::Validation(diagnostics) = &err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert!(!diagnostics.is_empty());
    assert!(diagnostics
        .issues()
        .iter()
        .all(|issue| issue.kind == IssueKind::Conflict));
}

#[test]
fn test_sum_below_bound_names_the_field() {
    let ctx = Context::new();
    let err = ctx.validate(&Sum::new(1, 3, 4)).unwrap_err();
    assert!(matches!(err, BindError::Validation(_)));
    assert_eq!(paths(&err), ["c"]);
    assert!(err.to_string().starts_with("validation failed: c: "));
}

#[test]
fn test_pointer_zero_is_concrete() {
    let ctx = Context::new();
    // Some(0) is a value, not an unset field.
    assert!(ctx.validate(&SumPtr { a: Some(0), b: Some(5), c: Some(5) }).is_ok());
    assert!(ctx.validate(&SumPtr { a: Some(0), b: Some(4), c: Some(5) }).is_err());
}

#[test]
fn test_incomplete_value_policy() {
    let underdetermined = Sum::new(1, 0, 0);

    let ctx = Context::new();
    let err = ctx.validate(&underdetermined).unwrap_err();
    let kinds: Vec<IssueKind> = err
        .diagnostics()
        .unwrap()
        .issues()
        .iter()
        .map(|issue| issue.kind)
        .collect();
    assert!(kinds.iter().all(|kind| *kind == IssueKind::Incomplete));

    let lenient = Context::with_config(CinchConfig::new().with_require_concrete(false));
    assert!(lenient.validate(&underdetermined).is_ok());
    // Conflicts still fail.
    assert!(lenient.validate(&Sum::new(1, 4, 6)).is_err());
}

#[test]
fn test_nil_validation_policy() {
    let nil: Option<Sum> = None;

    let ctx = Context::new();
    assert_eq!(ctx.config().binder, BinderConfig::default());
    assert!(ctx.validate(&nil).is_ok());

    let strict = Context::with_config(CinchConfig::new().with_nil_validation(NilValidation::Reject));
    let err = strict.validate(&nil).unwrap_err();
    assert!(matches!(err, BindError::Validation(_)));
    assert_eq!(paths(&err), ["(root)"]);

    // A present value is checked normally under either policy.
    assert!(strict.validate(&Some(Sum::new(1, 4, 5))).is_ok());
    assert!(ctx.validate(&Some(Sum::new(1, 4, 6))).is_err());
}

#[test]
fn test_extra_constraints_apply_to_the_type() {
    let mut ctx = Context::new();
    let sample = Sum::new(1, 4, 5);
    ctx.constrain(&sample, "{c: <=10}").unwrap();
    assert_eq!(ctx.constraint_count::<Sum>(), 1);

    assert!(ctx.validate(&Sum::new(1, 9, 10)).is_ok());
    let err = ctx.validate(&Sum::new(5, 6, 11)).unwrap_err();
    assert_eq!(paths(&err), ["c"]);

    // Option<Sum> shares the constraints of Sum.
    assert_eq!(ctx.constraint_count::<Option<Sum>>(), 1);
    assert!(ctx.validate(&Some(Sum::new(5, 6, 11))).is_err());

    // Other contexts are unaffected.
    assert!(Context::new().validate(&Sum::new(5, 6, 11)).is_ok());
}

#[test]
fn test_constraint_syntax_errors() {
    let mut ctx = Context::new();

    let err = ctx.constrain_type::<Sum>("{c: <=}").unwrap_err();
    assert!(matches!(
        err,
        BindError::ConstraintSyntax { ref type_name, .. } if type_name == "Sum"
    ));

    let err = ctx.constrain_type::<Sum>("{z: 1}").unwrap_err();
    assert!(matches!(err, BindError::ConstraintSyntax { .. }));

    let err = ctx.constrain_type::<Sum>("{c: d + 1}").unwrap_err();
    assert!(matches!(err, BindError::ConstraintSyntax { .. }));

    assert_eq!(ctx.constraint_count::<Sum>(), 0);
}

#[derive(Bind)]
struct BadTag {
    #[bind(constraint = "x +")]
    x: i64,
}

#[derive(Bind)]
struct WithChannel {
    id: i64,
    events: mpsc::Sender<String>,
}

#[test]
fn test_schema_errors_are_fatal() {
    let mut ctx = Context::new();
    let bad = BadTag { x: 1 };
    let err = ctx.validate(&bad).unwrap_err();
    assert!(matches!(
        err,
        BindError::Schema(SchemaError::Constraint { ref field, .. }) if field == "x"
    ));
    assert!(matches!(
        ctx.constrain(&bad, "{x: 1}"),
        Err(BindError::Schema(_))
    ));

    let (events, _rx) = mpsc::channel();
    let mut value = WithChannel { id: 1, events };
    assert!(matches!(
        ctx.validate(&value),
        Err(BindError::Schema(SchemaError::Unsupported { kind: "channel", .. }))
    ));
    assert!(matches!(
        ctx.complete(&mut value),
        Err(BindError::Schema(_))
    ));
    assert_eq!(value.id, 1);
}

#[test]
fn test_list_constraints() {
    let mut ctx = Context::new();
    ctx.constrain_type::<Vec<String>>(r#"[_, "b", ...]"#).unwrap();

    let abc: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    assert!(ctx.validate(&abc).is_ok());
    assert!(ctx.validate(&vec!["b".to_string()]).is_err());

    ctx.constrain_type::<Vec<String>>("4 * [string]").unwrap();
    let err = ctx.validate(&abc).unwrap_err();
    assert_eq!(
        err.diagnostics().unwrap().issues()[0].message,
        "incompatible list lengths (4 and 3)"
    );
}

#[test]
fn test_scalar_constraints() {
    let mut ctx = Context::new();
    ctx.constrain_type::<i64>(">=0 & <=10").unwrap();
    assert!(ctx.validate(&5i64).is_ok());
    assert!(ctx.validate(&11i64).is_err());

    // Integer widths become bounds.
    ctx.constrain_type::<u8>("300").unwrap();
    assert!(ctx.validate(&0u8).is_err());
}

#[test]
fn test_map_keys_are_never_synthesized() {
    let mut ctx = Context::new();
    ctx.constrain_type::<Mapped>(MIRRORED_KEYS).unwrap();

    assert!(ctx
        .validate(&Mapped::new(&[("foo", Some(1)), ("bar", Some(1))]))
        .is_ok());

    let err = ctx.validate(&Mapped::new(&[("foo", Some(1))])).unwrap_err();
    assert_eq!(paths(&err), ["m.bar"]);

    assert!(ctx.validate(&Mapped::new(&[])).is_err());
}

#[test]
fn test_shared_schema_cache() {
    let cache = Arc::new(SchemaCache::new());
    let first = Context::new().with_cache(Arc::clone(&cache));
    let second = Context::new().with_cache(Arc::clone(&cache));

    assert!(first.validate(&Sum::new(1, 4, 5)).is_ok());
    assert!(second.validate(&Sum::new(2, 3, 5)).is_ok());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_unset_elements_without_constraints_validate() {
    let ctx = Context::new();
    assert!(ctx.validate(&Listed { v: vec![Some(1), None] }).is_ok());
    assert!(ctx.validate(&Mapped::new(&[("foo", None)])).is_ok());
    assert!(ctx.validate(&Mapped::new(&[("foo", Some(1)), ("bar", None)])).is_ok());
}

#[test]
fn test_constrained_unset_element_is_incomplete() {
    let mut ctx = Context::new();
    ctx.constrain_type::<Listed>("{v: [_, int]}").unwrap();

    let err = ctx.validate(&Listed { v: vec![Some(1), None] }).unwrap_err();
    assert_eq!(paths(&err), ["v[1]"]);
    assert!(ctx.validate(&Listed { v: vec![Some(1), Some(2)] }).is_ok());
}
