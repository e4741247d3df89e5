//! The constraint value lattice.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use crate::error::Conflict;
use crate::kind::Kind;

/// A value in the constraint lattice.
///
/// Atoms (`Null`, `Bool`, `Int`, `Float`, `String`) are concrete. A
/// `Constraint` admits a set of atoms described by kinds and bounds; the
/// unconstrained constraint is top (`_`). `Bottom` is the empty value and
/// records why it is empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Constraint(Constraint),
    Disjunction(Disjunction),
    Struct(StructValue),
    List(ListValue),
    Bottom(Conflict),
}

/// Kinds plus bounds, e.g. `int & >=5`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub kinds: Kind,
    pub bounds: Vec<Bound>,
}

/// A unary bound such as `>=5` or `!=null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub op: BoundOp,
    pub limit: Box<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
}

/// Two or more alternatives, some of which may be marked default.
#[derive(Debug, Clone, PartialEq)]
pub struct Disjunction {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub value: Value,
    pub default: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructValue {
    pub fields: IndexMap<String, Value>,
}

/// A list; `tail` is the element constraint of an open list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListValue {
    pub elems: Vec<Value>,
    pub tail: Option<Box<Value>>,
}

impl Value {
    pub fn top() -> Self {
        Value::Constraint(Constraint::top())
    }

    pub fn kind_of(kinds: Kind) -> Self {
        if kinds.is_empty() {
            return Value::bottom("empty kind");
        }
        Value::Constraint(Constraint {
            kinds,
            bounds: Vec::new(),
        })
    }

    pub fn bottom(message: impl Into<String>) -> Self {
        Value::Bottom(Conflict::new(message))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Creates a bound constraint. The kinds it admits follow from the limit:
    /// numeric limits admit numbers, string limits admit strings and `!=`
    /// admits everything but the limit.
    pub fn bound(op: BoundOp, limit: Value) -> Self {
        let kinds = match (op, &limit) {
            (BoundOp::Ne, _) => Kind::TOP,
            (_, Value::Int(_)) | (_, Value::Float(_)) => Kind::NUMBER,
            (_, Value::String(_)) => Kind::STRING,
            _ => {
                return Value::bottom(format!(
                    "invalid bound {}{}: limit must be a number or string",
                    op, limit
                ))
            }
        };
        Value::Constraint(Constraint {
            kinds,
            bounds: vec![Bound {
                op,
                limit: Box::new(limit),
            }],
        })
    }

    pub fn list(elems: Vec<Value>) -> Self {
        Value::List(ListValue { elems, tail: None })
    }

    pub fn open_list(elems: Vec<Value>, tail: Value) -> Self {
        Value::List(ListValue {
            elems,
            tail: Some(Box::new(tail)),
        })
    }

    pub fn structure<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Struct(StructValue {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// The kinds this value may still take.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::NULL,
            Value::Bool(_) => Kind::BOOL,
            Value::Int(_) => Kind::INT,
            Value::Float(_) => Kind::FLOAT,
            Value::String(_) => Kind::STRING,
            Value::Constraint(c) => c.kinds,
            Value::Disjunction(d) => d
                .alternatives
                .iter()
                .fold(Kind::NONE, |acc, alt| acc | alt.value.kind()),
            Value::Struct(_) => Kind::STRUCT,
            Value::List(_) => Kind::LIST,
            Value::Bottom(_) => Kind::NONE,
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Value::Constraint(c) if c.is_top())
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Value::Bottom(_))
    }

    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Struct(_) | Value::List(_))
    }

    /// Returns true if this value has exactly one resolution.
    pub fn is_concrete(&self) -> bool {
        match self {
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::String(_) => true,
            Value::Struct(s) => s.fields.values().all(Value::is_concrete),
            Value::List(l) => l.tail.is_none() && l.elems.iter().all(Value::is_concrete),
            Value::Constraint(_) | Value::Disjunction(_) | Value::Bottom(_) => false,
        }
    }

    /// Resolves defaults: a disjunction with exactly one default becomes that
    /// default, recursively through structs and closed lists.
    ///
    /// Returns `None` if nothing changed.
    pub fn defaulted(&self) -> Option<Value> {
        match self {
            Value::Disjunction(d) => {
                let chosen = d.default_alternative()?;
                Some(chosen.defaulted().unwrap_or_else(|| chosen.clone()))
            }
            Value::Struct(s) => {
                let mut changed = false;
                let fields = s
                    .fields
                    .iter()
                    .map(|(name, value)| {
                        let value = match value.defaulted() {
                            Some(v) => {
                                changed = true;
                                v
                            }
                            None => value.clone(),
                        };
                        (name.clone(), value)
                    })
                    .collect();
                changed.then_some(Value::Struct(StructValue { fields }))
            }
            Value::List(l) if l.tail.is_none() => {
                let mut changed = false;
                let elems = l
                    .elems
                    .iter()
                    .map(|value| match value.defaulted() {
                        Some(v) => {
                            changed = true;
                            v
                        }
                        None => value.clone(),
                    })
                    .collect();
                changed.then_some(Value::List(ListValue { elems, tail: None }))
            }
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            Value::Bottom(c) => Some(c),
            _ => None,
        }
    }
}

impl Constraint {
    pub fn top() -> Self {
        Self {
            kinds: Kind::TOP,
            bounds: Vec::new(),
        }
    }

    pub fn is_top(&self) -> bool {
        self.kinds.is_top() && self.bounds.is_empty()
    }

    /// Checks a concrete value against the kinds and bounds.
    pub fn admits(&self, value: &Value) -> Result<(), String> {
        let kind = value.kind();
        let kind_ok = self.kinds.overlaps(kind)
            || (kind == Kind::INT && self.kinds.overlaps(Kind::FLOAT));
        if !kind_ok {
            return Err(format!(
                "conflicting values {} and {} (mismatched types {} and {})",
                value, self, kind, self.kinds
            ));
        }
        for bound in &self.bounds {
            if !bound.admits(value) {
                return Err(format!("invalid value {} (out of bound {})", value, bound));
            }
        }
        Ok(())
    }
}

impl Bound {
    pub fn admits(&self, value: &Value) -> bool {
        let ord = compare_atoms(value, &self.limit);
        match self.op {
            BoundOp::Ne => !atoms_equal(value, &self.limit),
            BoundOp::Lt => ord.is_some_and(Ordering::is_lt),
            BoundOp::Le => ord.is_some_and(Ordering::is_le),
            BoundOp::Gt => ord.is_some_and(Ordering::is_gt),
            BoundOp::Ge => ord.is_some_and(Ordering::is_ge),
        }
    }
}

impl Disjunction {
    /// Builds a disjunction, dropping bottom alternatives and merging
    /// duplicates. Collapses to a single value or bottom where possible.
    pub fn from_alternatives(alternatives: Vec<Alternative>) -> Value {
        let mut merged: Vec<Alternative> = Vec::with_capacity(alternatives.len());
        let mut last_conflict = None;
        for alt in alternatives {
            // Nested disjunctions are flattened.
            if let Value::Disjunction(inner) = alt.value {
                let inner_has_defaults = inner.has_defaults();
                for nested in inner.alternatives {
                    let default = alt.default && (nested.default || !inner_has_defaults);
                    push_alternative(&mut merged, nested.value, default);
                }
                continue;
            }
            if let Value::Bottom(conflict) = alt.value {
                last_conflict = Some(conflict);
                continue;
            }
            push_alternative(&mut merged, alt.value, alt.default);
        }
        match merged.len() {
            0 => match last_conflict {
                Some(conflict) => Value::Bottom(Conflict::new(format!(
                    "empty disjunction: {}",
                    conflict.message
                ))),
                None => Value::bottom("empty disjunction"),
            },
            1 => merged.pop().map(|alt| alt.value).unwrap_or_else(Value::top),
            _ => Value::Disjunction(Disjunction {
                alternatives: merged,
            }),
        }
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    pub fn has_defaults(&self) -> bool {
        self.alternatives.iter().any(|alt| alt.default)
    }

    /// The default alternative, if exactly one is marked.
    pub fn default_alternative(&self) -> Option<&Value> {
        let mut defaults = self.alternatives.iter().filter(|alt| alt.default);
        let first = defaults.next()?;
        match defaults.next() {
            Some(_) => None,
            None => Some(&first.value),
        }
    }
}

fn push_alternative(merged: &mut Vec<Alternative>, value: Value, default: bool) {
    if let Some(existing) = merged.iter_mut().find(|alt| alt.value == value) {
        existing.default |= default;
    } else {
        merged.push(Alternative { value, default });
    }
}

impl ListValue {
    pub fn is_open(&self) -> bool {
        self.tail.is_some()
    }

    /// The constraint for element `idx`, or `None` if the list cannot have it.
    pub fn elem(&self, idx: usize) -> Option<&Value> {
        self.elems
            .get(idx)
            .or_else(|| self.tail.as_deref())
    }
}

/// Equality between atoms; ints and floats compare numerically.
pub fn atoms_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Float(_), Value::Float(_))
        | (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_)) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// Ordering between numbers or between strings.
pub fn compare_atoms(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        _ => None,
    }
}

impl fmt::Display for BoundOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoundOp::Lt => "<",
            BoundOp::Le => "<=",
            BoundOp::Gt => ">",
            BoundOp::Ge => ">=",
            BoundOp::Ne => "!=",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.limit)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let implied = self.bounds.iter().all(|b| b.op != BoundOp::Ne)
            && !self.bounds.is_empty()
            && (self.kinds == Kind::NUMBER || self.kinds == Kind::STRING);
        let mut parts = Vec::new();
        if !implied && (!self.kinds.is_top() || self.bounds.is_empty()) {
            parts.push(self.kinds.to_string());
        }
        parts.extend(self.bounds.iter().map(|b| b.to_string()));
        write!(f, "{}", parts.join(" & "))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Constraint(c) => write!(f, "{}", c),
            Value::Disjunction(d) => {
                for (i, alt) in d.alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    if alt.default {
                        write!(f, "*")?;
                    }
                    write!(f, "{}", alt.value)?;
                }
                Ok(())
            }
            Value::Struct(s) => {
                write!(f, "{{")?;
                for (i, (name, value)) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::List(l) => {
                write!(f, "[")?;
                for (i, value) in l.elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                if let Some(tail) = &l.tail {
                    if !l.elems.is_empty() {
                        write!(f, ", ")?;
                    }
                    if tail.is_top() {
                        write!(f, "...")?;
                    } else {
                        write!(f, "...{}", tail)?;
                    }
                }
                write!(f, "]")
            }
            Value::Bottom(c) => write!(f, "_|_ ({})", c.message),
        }
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::ser::{Error, SerializeMap, SerializeSeq};
    use serde::{Serialize, Serializer};

    use super::Value;

    /// Serializes concrete values as plain data. Non-concrete values fail.
    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Null => serializer.serialize_unit(),
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Int(i) => serializer.serialize_i64(*i),
                Value::Float(x) => serializer.serialize_f64(*x),
                Value::String(s) => serializer.serialize_str(s),
                Value::Struct(s) => {
                    let mut map = serializer.serialize_map(Some(s.fields.len()))?;
                    for (name, value) in &s.fields {
                        map.serialize_entry(name, value)?;
                    }
                    map.end()
                }
                Value::List(l) if l.tail.is_none() => {
                    let mut seq = serializer.serialize_seq(Some(l.elems.len()))?;
                    for value in &l.elems {
                        seq.serialize_element(value)?;
                    }
                    seq.end()
                }
                other => Err(S::Error::custom(format!(
                    "cannot serialize non-concrete value {}",
                    other
                ))),
            }
        }
    }
}
