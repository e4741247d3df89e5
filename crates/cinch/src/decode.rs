//! Writing unified values back into host memory.
//!
//! Write-back runs in two passes: [`conform`] checks that a unified value
//! fits the host type without touching memory, then `Bind::decode` writes
//! it. A value that passes the first pass cannot fail the second.

use cinch_core::{Path, Segment, StructValue, Value};
use cinch_engine::Issue;

use crate::bind::Bind;
use crate::error::DecodeError;
use crate::host::{HostType, ScalarKind};

/// Decodes a struct value field by field.
///
/// Used by `#[derive(Bind)]`. Fields missing from the value are left
/// untouched.
#[derive(Debug, Clone, Copy)]
pub struct StructDecoder<'a> {
    value: &'a StructValue,
}

impl<'a> StructDecoder<'a> {
    pub fn new(value: &'a Value) -> Result<Self, DecodeError> {
        match value {
            Value::Struct(value) => Ok(Self { value }),
            other => Err(DecodeError::mismatch("struct", other)),
        }
    }

    pub fn field<T: Bind>(&self, label: &'static str, slot: &mut T) -> Result<(), DecodeError> {
        match self.value.fields.get(label) {
            Some(value) => slot.decode(value).map_err(|e| e.under(label)),
            None => Ok(()),
        }
    }
}

/// Checks that `value` can be decoded into a host of type `host`.
pub fn conform(host: &HostType, value: &Value) -> Result<(), DecodeError> {
    match (host, value) {
        (HostType::Scalar(ScalarKind::Bool), Value::Bool(_)) => Ok(()),
        (HostType::Scalar(ScalarKind::Int { min, max }), Value::Int(v)) => {
            if (*min..=*max).contains(&i128::from(*v)) {
                Ok(())
            } else {
                Err(DecodeError::new(format!(
                    "{} is out of range [{}, {}]",
                    v, min, max
                )))
            }
        }
        (HostType::Scalar(ScalarKind::Float { bits }), Value::Int(_) | Value::Float(_)) => {
            let fits = match (value.as_f64(), *bits) {
                (Some(v), 32) => (v as f32).is_finite(),
                (Some(v), _) => v.is_finite(),
                (None, _) => false,
            };
            if fits {
                Ok(())
            } else {
                Err(DecodeError::new(format!(
                    "{} does not fit in a {}-bit float",
                    value, bits
                )))
            }
        }
        (HostType::Scalar(ScalarKind::String), Value::String(_)) => Ok(()),
        (HostType::Pointer(_), Value::Null) => Ok(()),
        (HostType::Pointer(inner), value) => conform(&inner(), value),
        (HostType::Sequence(elem), Value::List(list)) if !list.is_open() => {
            let elem = elem();
            for (idx, value) in list.elems.iter().enumerate() {
                conform(&elem, value).map_err(|e| e.under(idx))?;
            }
            Ok(())
        }
        (HostType::Mapping(elem), Value::Struct(map)) => {
            let elem = elem();
            for (key, value) in &map.fields {
                conform(&elem, value).map_err(|e| e.under(key.as_str()))?;
            }
            Ok(())
        }
        (HostType::Struct(ty), Value::Struct(s)) => {
            for field in ty.fields() {
                if let Some(value) = s.fields.get(field.name) {
                    conform(&field.host_type(), value).map_err(|e| e.under(field.name))?;
                }
            }
            Ok(())
        }
        (HostType::Unsupported(kind), _) => Err(DecodeError::new(format!(
            "{} values cannot be decoded",
            kind
        ))),
        (host, value) => Err(DecodeError::mismatch(host.kind_name(), value)),
    }
}

/// Reports map keys of `resolved` that the encoded host value did not have.
///
/// Map constraints relate the keys a host map already has; a key that only
/// a constraint names leaves the result incomplete.
pub fn foreign_keys(host: &HostType, encoded: Option<&Value>, resolved: &Value) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut path = Path::root();
    walk_keys(host, encoded, resolved, &mut path, &mut issues);
    issues
}

fn walk_keys(
    host: &HostType,
    encoded: Option<&Value>,
    resolved: &Value,
    path: &mut Path,
    issues: &mut Vec<Issue>,
) {
    match (host, resolved) {
        (HostType::Pointer(inner), _) => walk_keys(&inner(), encoded, resolved, path, issues),
        (HostType::Sequence(elem), Value::List(list)) => {
            let elem = elem();
            let known = encoded.and_then(Value::as_list);
            for (idx, value) in list.elems.iter().enumerate() {
                path.push(Segment::Index(idx));
                let encoded = known.and_then(|l| l.elems.get(idx));
                walk_keys(&elem, encoded, value, path, issues);
                path.pop();
            }
        }
        (HostType::Mapping(elem), Value::Struct(map)) => {
            let elem = elem();
            let known = encoded.and_then(Value::as_struct);
            for (key, value) in &map.fields {
                path.push(Segment::Field(key.clone()));
                match known.and_then(|m| m.fields.get(key)) {
                    Some(encoded) => walk_keys(&elem, Some(encoded), value, path, issues),
                    None => issues.push(Issue::incomplete(
                        path.clone(),
                        "map key not present in host value",
                    )),
                }
                path.pop();
            }
        }
        (HostType::Struct(ty), Value::Struct(s)) => {
            let known = encoded.and_then(Value::as_struct);
            for field in ty.fields() {
                let Some(value) = s.fields.get(field.name) else {
                    continue;
                };
                path.push(Segment::from(field.name));
                let encoded = known.and_then(|k| k.fields.get(field.name));
                walk_keys(&field.host_type(), encoded, value, path, issues);
                path.pop();
            }
        }
        _ => {}
    }
}
