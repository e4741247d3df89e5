//! The `Bind` trait and its implementations for standard types.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::mpsc;

use num_traits::{FromPrimitive, ToPrimitive};

use cinch_core::Value;

use crate::error::{DecodeError, EncodeError};
use crate::host::{HostType, ScalarKind};

/// A host type that can be bound to constraints.
///
/// Usually derived with `#[derive(Bind)]`; implementations exist for
/// integers, floats, `bool`, `String`, `Option`, `Box`, `Vec` and string
/// keyed maps.
///
/// # Example
///
/// ```
/// use cinch::{Bind, Value};
///
/// #[derive(Bind)]
/// struct Range {
///     #[bind(constraint = "<=hi")]
///     lo: i64,
///     hi: i64,
/// }
///
/// let range = Range { lo: 1, hi: 3 };
/// assert_eq!(range.encode().unwrap().unwrap().to_string(), "{lo: 1, hi: 3}");
/// assert!(Range::zero().is_zero());
/// ```
pub trait Bind: Sized + 'static {
    /// Describes the shape of this type.
    fn host_type() -> HostType;

    /// Identity used to look up extra constraints.
    ///
    /// Wrappers that only add indirection report the key of the wrapped
    /// type, so constraints on `T` apply to `Option<T>` and `Box<T>` too.
    fn type_key() -> TypeId {
        TypeId::of::<Self>()
    }

    /// The zero value, used when write-back has to allocate.
    fn zero() -> Self;

    fn is_zero(&self) -> bool;

    /// Returns true for an absent pointer.
    fn is_nil(&self) -> bool {
        false
    }

    /// Encodes this value; `None` means unset.
    fn encode(&self) -> Result<Option<Value>, EncodeError>;

    /// Writes a concrete value into `self`.
    fn decode(&mut self, value: &Value) -> Result<(), DecodeError>;
}

macro_rules! impl_bind_int {
    ($($t:ty),*) => {$(
        impl Bind for $t {
            fn host_type() -> HostType {
                HostType::Scalar(ScalarKind::Int {
                    min: <$t>::MIN as i128,
                    max: <$t>::MAX as i128,
                })
            }

            fn zero() -> Self {
                0
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }

            fn encode(&self) -> Result<Option<Value>, EncodeError> {
                self.to_i64()
                    .map(|v| Some(Value::Int(v)))
                    .ok_or_else(|| {
                        EncodeError::new(format!("{} does not fit in a 64-bit integer", self))
                    })
            }

            fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
                let Value::Int(v) = value else {
                    return Err(DecodeError::mismatch("int", value));
                };
                *self = <$t>::from_i64(*v).ok_or_else(|| {
                    DecodeError::new(format!("{} is out of range for {}", v, stringify!($t)))
                })?;
                Ok(())
            }
        }
    )*};
}

impl_bind_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_bind_float {
    ($($t:ty => $bits:expr),*) => {$(
        impl Bind for $t {
            fn host_type() -> HostType {
                HostType::Scalar(ScalarKind::Float { bits: $bits })
            }

            fn zero() -> Self {
                0.0
            }

            fn is_zero(&self) -> bool {
                *self == 0.0
            }

            fn encode(&self) -> Result<Option<Value>, EncodeError> {
                match self.to_f64() {
                    Some(v) if v.is_finite() => Ok(Some(Value::Float(v))),
                    _ => Err(EncodeError::new(format!("{} is not a finite number", self))),
                }
            }

            fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
                let v = match value {
                    Value::Int(_) | Value::Float(_) => value.as_f64(),
                    _ => None,
                };
                *self = v
                    .and_then(<$t>::from_f64)
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| DecodeError::mismatch("number", value))?;
                Ok(())
            }
        }
    )*};
}

impl_bind_float!(f32 => 32, f64 => 64);

impl Bind for bool {
    fn host_type() -> HostType {
        HostType::Scalar(ScalarKind::Bool)
    }

    fn zero() -> Self {
        false
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn encode(&self) -> Result<Option<Value>, EncodeError> {
        Ok(Some(Value::Bool(*self)))
    }

    fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
        *self = value
            .as_bool()
            .ok_or_else(|| DecodeError::mismatch("bool", value))?;
        Ok(())
    }
}

impl Bind for String {
    fn host_type() -> HostType {
        HostType::Scalar(ScalarKind::String)
    }

    fn zero() -> Self {
        String::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn encode(&self) -> Result<Option<Value>, EncodeError> {
        Ok(Some(Value::String(self.clone())))
    }

    fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
        let s = value
            .as_str()
            .ok_or_else(|| DecodeError::mismatch("string", value))?;
        if self.as_str() != s {
            *self = s.to_string();
        }
        Ok(())
    }
}

impl<T: Bind> Bind for Option<T> {
    fn host_type() -> HostType {
        HostType::Pointer(T::host_type)
    }

    fn type_key() -> TypeId {
        T::type_key()
    }

    fn zero() -> Self {
        None
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn is_nil(&self) -> bool {
        self.is_none()
    }

    fn encode(&self) -> Result<Option<Value>, EncodeError> {
        match self {
            Some(inner) => inner.encode(),
            None => Ok(None),
        }
    }

    /// `null` clears the pointer; any other value is written through the
    /// existing pointee, allocating one if there is none.
    fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
        if matches!(value, Value::Null) {
            *self = None;
            return Ok(());
        }
        match self {
            Some(inner) => inner.decode(value),
            None => {
                let mut inner = T::zero();
                inner.decode(value)?;
                *self = Some(inner);
                Ok(())
            }
        }
    }
}

impl<T: Bind> Bind for Box<T> {
    fn host_type() -> HostType {
        T::host_type()
    }

    fn type_key() -> TypeId {
        T::type_key()
    }

    fn zero() -> Self {
        Box::new(T::zero())
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn is_nil(&self) -> bool {
        (**self).is_nil()
    }

    fn encode(&self) -> Result<Option<Value>, EncodeError> {
        (**self).encode()
    }

    fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
        (**self).decode(value)
    }
}

impl<T: Bind> Bind for Vec<T> {
    fn host_type() -> HostType {
        HostType::Sequence(T::host_type)
    }

    fn zero() -> Self {
        Vec::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    /// Unset elements encode as top so that element constraints and
    /// defaults can fill them.
    fn encode(&self) -> Result<Option<Value>, EncodeError> {
        let mut elems = Vec::with_capacity(self.len());
        for (idx, elem) in self.iter().enumerate() {
            let encoded = elem.encode().map_err(|e| e.under(idx))?;
            elems.push(encoded.unwrap_or_else(Value::top));
        }
        Ok(Some(Value::list(elems)))
    }

    fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
        let list = value
            .as_list()
            .ok_or_else(|| DecodeError::mismatch("list", value))?;
        self.truncate(list.elems.len());
        for (idx, elem) in list.elems.iter().enumerate() {
            match self.get_mut(idx) {
                Some(slot) => slot.decode(elem).map_err(|e| e.under(idx))?,
                None => {
                    let mut slot = T::zero();
                    slot.decode(elem).map_err(|e| e.under(idx))?;
                    self.push(slot);
                }
            }
        }
        Ok(())
    }
}

/// Encodes map entries in key order so that results do not depend on the
/// iteration order of the host map.
fn encode_entries<'a, T: Bind>(
    entries: impl Iterator<Item = (&'a String, &'a T)>,
) -> Result<Option<Value>, EncodeError> {
    let mut fields: Vec<(&String, Value)> = Vec::new();
    for (key, value) in entries {
        let encoded = value.encode().map_err(|e| e.under(key.as_str()))?;
        fields.push((key, encoded.unwrap_or_else(Value::top)));
    }
    fields.sort_by(|a, b| a.0.cmp(b.0));
    Ok(Some(Value::structure(
        fields.into_iter().map(|(k, v)| (k.clone(), v)),
    )))
}

/// Updates entries whose keys are already present; never inserts.
fn decode_entries<'a, T: Bind>(
    entries: impl Iterator<Item = (&'a String, &'a mut T)>,
    value: &Value,
) -> Result<(), DecodeError> {
    let map = value
        .as_struct()
        .ok_or_else(|| DecodeError::mismatch("map", value))?;
    for (key, slot) in entries {
        if let Some(resolved) = map.fields.get(key) {
            slot.decode(resolved).map_err(|e| e.under(key.as_str()))?;
        }
    }
    Ok(())
}

impl<T: Bind, S: BuildHasher + Default + 'static> Bind for HashMap<String, T, S> {
    fn host_type() -> HostType {
        HostType::Mapping(T::host_type)
    }

    fn zero() -> Self {
        HashMap::default()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn encode(&self) -> Result<Option<Value>, EncodeError> {
        encode_entries(self.iter())
    }

    fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
        decode_entries(self.iter_mut(), value)
    }
}

impl<T: Bind> Bind for BTreeMap<String, T> {
    fn host_type() -> HostType {
        HostType::Mapping(T::host_type)
    }

    fn zero() -> Self {
        BTreeMap::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn encode(&self) -> Result<Option<Value>, EncodeError> {
        encode_entries(self.iter())
    }

    fn decode(&mut self, value: &Value) -> Result<(), DecodeError> {
        decode_entries(self.iter_mut(), value)
    }
}

macro_rules! impl_bind_channel {
    ($($t:ident => $end:tt),*) => {$(
        impl<T: 'static> Bind for mpsc::$t<T> {
            fn host_type() -> HostType {
                HostType::Unsupported("channel")
            }

            fn zero() -> Self {
                mpsc::channel().$end
            }

            fn is_zero(&self) -> bool {
                false
            }

            fn encode(&self) -> Result<Option<Value>, EncodeError> {
                Err(EncodeError::Unsupported("channel"))
            }

            fn decode(&mut self, _value: &Value) -> Result<(), DecodeError> {
                Err(DecodeError::new("channel values cannot be decoded"))
            }
        }
    )*};
}

impl_bind_channel!(Sender => 0, Receiver => 1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_range_checks() {
        let mut x: u8 = 0;
        assert!(x.decode(&Value::Int(255)).is_ok());
        assert_eq!(x, 255);
        let err = x.decode(&Value::Int(256)).unwrap_err();
        assert_eq!(err.message, "256 is out of range for u8");
        assert_eq!(x, 255);

        assert!(u64::MAX.encode().is_err());
    }

    #[test]
    fn test_option_writes_through_existing_pointee() {
        let mut boxed: Option<Box<i64>> = Some(Box::new(1));
        let before: *const i64 = boxed.as_deref().unwrap();
        boxed.decode(&Value::Int(9)).unwrap();
        let after: *const i64 = boxed.as_deref().unwrap();
        assert_eq!(before, after);
        assert_eq!(boxed.as_deref(), Some(&9));

        let mut empty: Option<i64> = None;
        empty.decode(&Value::Int(3)).unwrap();
        assert_eq!(empty, Some(3));
        empty.decode(&Value::Null).unwrap();
        assert_eq!(empty, None);
    }

    #[test]
    fn test_vec_encodes_unset_elements_as_top() {
        let xs = vec![Some(1i64), None];
        assert_eq!(
            xs.encode().unwrap(),
            Some(Value::list(vec![Value::Int(1), Value::top()]))
        );
        let nil: Option<Vec<i64>> = None;
        assert_eq!(nil.encode().unwrap(), None);
        assert_eq!(
            Vec::<i64>::new().encode().unwrap(),
            Some(Value::list(Vec::new()))
        );
    }

    #[test]
    fn test_vec_decode_resizes() {
        let mut xs: Vec<Option<i64>> = Vec::new();
        xs.decode(&Value::list(vec![Value::Int(1), Value::Null]))
            .unwrap();
        assert_eq!(xs, [Some(1), None]);
    }

    #[test]
    fn test_map_decode_never_inserts() {
        let mut map: HashMap<String, i64> = HashMap::new();
        map.insert("foo".to_string(), 0);
        let value = Value::structure([("foo", Value::Int(1)), ("bar", Value::Int(1))]);
        map.decode(&value).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["foo"], 1);
    }

    #[test]
    fn test_map_encoding_is_ordered() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), 2i64);
        map.insert("a".to_string(), 1i64);
        let hashed: HashMap<String, i64> = map.clone().into_iter().collect();
        assert_eq!(map.encode().unwrap(), hashed.encode().unwrap());
        assert_eq!(map.encode().unwrap().unwrap().to_string(), "{a: 1, b: 2}");
    }

    #[test]
    fn test_type_key_strips_wrappers() {
        assert_eq!(<Option<Box<i64>>>::type_key(), TypeId::of::<i64>());
        assert_eq!(<Vec<i64>>::type_key(), TypeId::of::<Vec<i64>>());
    }

    #[test]
    fn test_float_accepts_int_results() {
        let mut x = 0.5f64;
        x.decode(&Value::Int(2)).unwrap();
        assert_eq!(x, 2.0);
        assert!(f64::NAN.encode().is_err());
    }

    #[test]
    fn test_float_decode_rejects_overflow() {
        let mut x = 1.0f32;
        assert!(x.decode(&Value::Float(1e300)).is_err());
        assert_eq!(x, 1.0);
    }
}
