//! Unification of lattice values.

use crate::path::Segment;
use crate::value::{
    atoms_equal, Alternative, Constraint, Disjunction, ListValue, StructValue, Value,
};

/// Computes the greatest lower bound of two values.
///
/// The result is bottom when the values are inconsistent. Unification is
/// commutative and idempotent; defaults survive only where both sides
/// agree on them.
pub fn unify(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Bottom(_), _) => a.clone(),
        (_, Value::Bottom(_)) => b.clone(),
        (Value::Constraint(c), _) if c.is_top() => b.clone(),
        (_, Value::Constraint(c)) if c.is_top() => a.clone(),
        (Value::Disjunction(d), other) | (other, Value::Disjunction(d)) => {
            unify_disjunction(d, other)
        }
        (Value::Constraint(x), Value::Constraint(y)) => merge_constraints(x, y),
        (Value::Constraint(c), v) | (v, Value::Constraint(c)) => apply_constraint(c, v),
        (Value::Struct(x), Value::Struct(y)) => unify_structs(x, y),
        (Value::List(x), Value::List(y)) => unify_lists(x, y),
        (x, y) if x.is_atom() && y.is_atom() => unify_atoms(x, y),
        (x, y) => Value::bottom(format!(
            "conflicting values {} and {} (mismatched types {} and {})",
            x,
            y,
            x.kind(),
            y.kind()
        )),
    }
}

/// Unifies every value in `values`, starting from top.
pub fn unify_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Value {
    values
        .into_iter()
        .fold(Value::top(), |acc, value| unify(&acc, value))
}

fn unify_atoms(x: &Value, y: &Value) -> Value {
    if !atoms_equal(x, y) {
        return Value::bottom(format!("conflicting values {} and {}", x, y));
    }
    // An int equal to a float resolves to the float.
    match (x, y) {
        (Value::Int(_), Value::Float(_)) => y.clone(),
        _ => x.clone(),
    }
}

fn merge_constraints(x: &Constraint, y: &Constraint) -> Value {
    let kinds = x.kinds.intersect(y.kinds);
    if kinds.is_empty() {
        return Value::bottom(format!(
            "conflicting values {} and {} (mismatched types {} and {})",
            x, y, x.kinds, y.kinds
        ));
    }
    let mut bounds = x.bounds.clone();
    for bound in &y.bounds {
        if !bounds.contains(bound) {
            bounds.push(bound.clone());
        }
    }
    Value::Constraint(Constraint { kinds, bounds })
}

fn apply_constraint(constraint: &Constraint, value: &Value) -> Value {
    match constraint.admits(value) {
        Ok(()) => value.clone(),
        Err(message) => Value::bottom(message),
    }
}

fn unify_disjunction(d: &Disjunction, other: &Value) -> Value {
    let self_defaults = d.has_defaults();
    let (other_alts, other_defaults): (Vec<(&Value, bool)>, bool) = match other {
        Value::Disjunction(o) => (
            o.alternatives()
                .iter()
                .map(|alt| (&alt.value, alt.default))
                .collect(),
            o.has_defaults(),
        ),
        v => (vec![(v, false)], false),
    };

    let mut alternatives = Vec::new();
    for alt in d.alternatives() {
        for (value, default) in &other_alts {
            let unified = unify(&alt.value, value);
            let default = (self_defaults || other_defaults)
                && (alt.default || !self_defaults)
                && (*default || !other_defaults);
            alternatives.push(Alternative {
                value: unified,
                default,
            });
        }
    }
    Disjunction::from_alternatives(alternatives)
}

fn unify_structs(x: &StructValue, y: &StructValue) -> Value {
    let mut fields = x.fields.clone();
    for (name, value) in &y.fields {
        let unified = match fields.get(name) {
            Some(existing) => unify(existing, value),
            None => value.clone(),
        };
        if let Value::Bottom(conflict) = unified {
            return Value::Bottom(conflict.under(Segment::Field(name.clone())));
        }
        fields.insert(name.clone(), unified);
    }
    Value::Struct(StructValue { fields })
}

fn unify_lists(x: &ListValue, y: &ListValue) -> Value {
    let len = match (x.is_open(), y.is_open()) {
        (false, false) if x.elems.len() != y.elems.len() => {
            return Value::bottom(format!(
                "incompatible list lengths ({} and {})",
                x.elems.len(),
                y.elems.len()
            ))
        }
        (false, _) if y.elems.len() > x.elems.len() => {
            return Value::bottom(format!(
                "incompatible list lengths ({} and at least {})",
                x.elems.len(),
                y.elems.len()
            ))
        }
        (_, false) if x.elems.len() > y.elems.len() => {
            return Value::bottom(format!(
                "incompatible list lengths (at least {} and {})",
                x.elems.len(),
                y.elems.len()
            ))
        }
        _ => x.elems.len().max(y.elems.len()),
    };

    let mut elems = Vec::with_capacity(len);
    for idx in 0..len {
        let unified = match (x.elem(idx), y.elem(idx)) {
            (Some(a), Some(b)) => unify(a, b),
            (Some(a), None) | (None, Some(a)) => a.clone(),
            (None, None) => Value::top(),
        };
        if let Value::Bottom(conflict) = unified {
            return Value::Bottom(conflict.under(Segment::Index(idx)));
        }
        elems.push(unified);
    }

    let tail = match (&x.tail, &y.tail) {
        (Some(a), Some(b)) => Some(Box::new(unify(a, b))),
        _ => None,
    };
    Value::List(ListValue { elems, tail })
}
