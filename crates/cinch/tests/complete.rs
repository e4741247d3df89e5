//! Integration tests for `Context::complete`.

mod common;

use std::collections::HashMap;

use cinch::prelude::*;
use cinch::IssueKind;

use common::{
    init_tracing, Inner, Listed, Mapped, Narrow, Outer, Scaled, Sum, SumPtr, Updated, MIRRORED_KEYS,
};

#[test]
fn test_solves_missing_operand() {
    init_tracing();
    let ctx = Context::new();

    let mut sum = Sum::new(0, 4, 8);
    ctx.complete(&mut sum).unwrap();
    assert_eq!(sum, Sum::new(4, 4, 8));

    let mut sum = Sum::new(1, 4, 0);
    ctx.complete(&mut sum).unwrap();
    assert_eq!(sum, Sum::new(1, 4, 5));
}

#[test]
fn test_underdetermined_value_is_untouched() {
    let ctx = Context::new();
    let mut sum = Sum::new(1, 0, 0);
    let err = ctx.complete(&mut sum).unwrap_err();

    let BindError::Completion(diagnostics) = &err else {
        panic!("expected a completion error, got {err:?}");
    };
    assert!(diagnostics
        .issues()
        .iter()
        .all(|issue| issue.kind == IssueKind::Incomplete));
    assert_eq!(sum, Sum::new(1, 0, 0));
}

#[test]
fn test_conflicting_value_is_untouched() {
    let ctx = Context::new();
    let mut sum = Sum::new(1, 3, 0);
    assert!(matches!(
        ctx.complete(&mut sum),
        Err(BindError::Completion(_))
    ));
    assert_eq!(sum, Sum::new(1, 3, 0));
}

#[test]
fn test_allocates_nil_pointers() {
    let ctx = Context::new();
    let mut sum = SumPtr {
        a: None,
        b: Some(4),
        c: Some(8),
    };
    ctx.complete(&mut sum).unwrap();
    assert_eq!(sum.a, Some(4));

    let mut sum = SumPtr {
        a: Some(1),
        b: None,
        c: None,
    };
    assert!(ctx.complete(&mut sum).is_err());
    assert_eq!(sum.b, None);
}

#[test]
fn test_writes_through_existing_pointer() {
    let ctx = Context::new();
    let mut boxed = Some(Box::new(Sum::new(0, 4, 8)));
    let before: *const Sum = &**boxed.as_ref().unwrap();

    ctx.complete(&mut boxed).unwrap();

    let after: *const Sum = &**boxed.as_ref().unwrap();
    assert_eq!(before, after);
    assert_eq!(*boxed.unwrap(), Sum::new(4, 4, 8));
}

#[test]
fn test_nil_value_cannot_be_completed() {
    let ctx = Context::new();
    let mut nil: Option<Sum> = None;
    let err = ctx.complete(&mut nil).unwrap_err();
    assert!(matches!(err, BindError::Completion(_)));
    assert_eq!(nil, None);
}

#[test]
fn test_list_defaults() {
    let ctx = Context::new();
    let mut updated = Updated {
        a: Some(vec![None, None, None]),
        b: None,
        m: None,
    };
    ctx.complete(&mut updated).unwrap();

    assert_eq!(updated.a, Some(vec![Some(1), Some(1), Some(1)]));
    assert_eq!(updated.b, Some(vec![1, 1, 1]));
    assert_eq!(updated.m, None);
}

#[test]
fn test_host_elements_override_defaults() {
    let ctx = Context::new();
    let mut updated = Updated {
        a: Some(vec![None, Some(7)]),
        b: Some(vec![2, 0, 3]),
        m: None,
    };
    ctx.complete(&mut updated).unwrap();

    assert_eq!(updated.a, Some(vec![Some(1), Some(7)]));
    assert_eq!(updated.b, Some(vec![2, 0, 3]));
}

#[test]
fn test_list_length_conflict_is_untouched() {
    let ctx = Context::new();
    let mut updated = Updated {
        a: None,
        b: Some(vec![1, 2]),
        m: None,
    };
    let before = updated.clone();
    assert!(ctx.complete(&mut updated).is_err());
    assert_eq!(updated, before);
}

#[test]
fn test_map_values_are_updated_in_place() {
    let mut ctx = Context::new();
    ctx.constrain_type::<Mapped>(MIRRORED_KEYS).unwrap();

    let mut mapped = Mapped::new(&[("foo", Some(1)), ("bar", None)]);
    ctx.complete(&mut mapped).unwrap();
    assert_eq!(mapped, Mapped::new(&[("foo", Some(1)), ("bar", Some(1))]));
}

#[test]
fn test_map_keys_are_never_inserted() {
    let mut ctx = Context::new();
    ctx.constrain_type::<Mapped>(MIRRORED_KEYS).unwrap();

    let mut mapped = Mapped::new(&[("foo", Some(1))]);
    let err = ctx.complete(&mut mapped).unwrap_err();
    let paths: Vec<String> = err
        .diagnostics()
        .unwrap()
        .paths()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(paths, ["m.bar"]);
    assert_eq!(mapped.m.len(), 1);

    let mut empty = Mapped::new(&[]);
    assert!(ctx.complete(&mut empty).is_err());
    assert!(empty.m.is_empty());
}

#[test]
fn test_defaults_yield_to_host_values() {
    let ctx = Context::new();

    let mut scaled = Scaled {
        factor: 0,
        base: 5,
        scaled: 0,
    };
    ctx.complete(&mut scaled).unwrap();
    assert_eq!((scaled.factor, scaled.scaled), (3, 15));

    let mut scaled = Scaled {
        factor: 2,
        base: 5,
        scaled: 0,
    };
    ctx.complete(&mut scaled).unwrap();
    assert_eq!((scaled.factor, scaled.scaled), (2, 10));
}

#[test]
fn test_nested_struct_allocation() {
    let ctx = Context::new();
    let mut outer = Outer {
        inner: None,
        plain: None,
    };
    ctx.complete(&mut outer).unwrap();
    assert_eq!(outer.inner, Some(Inner { p: 5, q: 10 }));
    // Nothing determines `plain`, so it stays absent.
    assert_eq!(outer.plain, None);

    let mut outer = Outer {
        inner: None,
        plain: Some(Inner { p: 2, q: 0 }),
    };
    // q = p * 2 conflicts with the explicit zero.
    assert!(ctx.complete(&mut outer).is_err());
    assert_eq!(outer.inner, None);
}

#[test]
fn test_extra_constraint_determines_field() {
    let mut ctx = Context::new();
    ctx.constrain_type::<Scaled>("{base: 4}").unwrap();

    let mut scaled = Scaled {
        factor: 0,
        base: 4,
        scaled: 0,
    };
    ctx.complete(&mut scaled).unwrap();
    assert_eq!(scaled.scaled, 12);

    let mut scaled = Scaled {
        factor: 0,
        base: 5,
        scaled: 0,
    };
    assert!(ctx.complete(&mut scaled).is_err());
    assert_eq!(scaled.scaled, 0);
}

#[test]
fn test_completes_map_of_structs() {
    let ctx = Context::new();
    let mut inners: HashMap<String, Inner> = HashMap::new();
    inners.insert("x".to_string(), Inner { p: 3, q: 6 });
    inners.insert("y".to_string(), Inner { p: 1, q: 2 });
    ctx.complete(&mut inners).unwrap();
    assert_eq!(inners.len(), 2);
    assert_eq!(inners["x"], Inner { p: 3, q: 6 });
}

#[test]
fn test_unset_elements_without_constraints_stay_unset() {
    let ctx = Context::new();

    let mut listed = Listed { v: vec![Some(1), None] };
    ctx.complete(&mut listed).unwrap();
    assert_eq!(listed.v, [Some(1), None]);

    let mut mapped = Mapped::new(&[("foo", None), ("bar", Some(2))]);
    ctx.complete(&mut mapped).unwrap();
    assert_eq!(mapped, Mapped::new(&[("foo", None), ("bar", Some(2))]));
}

#[test]
fn test_float_out_of_host_range_is_untouched() {
    let ctx = Context::new();

    let mut narrow = Narrow { y: 0.0, x: 1.5 };
    ctx.complete(&mut narrow).unwrap();
    assert_eq!(narrow.y, 2.5);

    let mut narrow = Narrow { y: 0.0, x: 1e300 };
    let before = narrow.clone();
    let err = ctx.complete(&mut narrow).unwrap_err();
    let BindError::Completion(diagnostics) = &err else {
        panic!("expected a completion error, got {err:?}");
    };
    let paths: Vec<String> = diagnostics.paths().map(|p| p.to_string()).collect();
    assert_eq!(paths, ["y"]);
    assert_eq!(narrow, before);
}
