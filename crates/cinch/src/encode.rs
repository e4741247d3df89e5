//! Encoding host values into constraint values.

use cinch_core::Value;

use crate::bind::Bind;
use crate::error::EncodeError;

/// Builds the encoding of a struct field by field.
///
/// Used by `#[derive(Bind)]`. Unset fields are left out so that schema
/// defaults can supply them.
#[derive(Debug, Default)]
pub struct StructEncoder {
    fields: Vec<(&'static str, Value)>,
}

impl StructEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes one field. An optional field holding its zero value is
    /// unset, as is a nil pointer.
    pub fn field<T: Bind>(
        &mut self,
        label: &'static str,
        value: &T,
        optional: bool,
    ) -> Result<(), EncodeError> {
        if optional && value.is_zero() {
            return Ok(());
        }
        if let Some(encoded) = value.encode().map_err(|e| e.under(label))? {
            self.fields.push((label, encoded));
        }
        Ok(())
    }

    pub fn finish(self) -> Value {
        Value::structure(self.fields)
    }
}
