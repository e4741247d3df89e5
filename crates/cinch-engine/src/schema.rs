//! Structural schemas derived from host types.

use std::fmt;
use std::sync::Arc;

use cinch_core::{Kind, Value};

use crate::expr::Expr;

/// The structural shape of a host type, with field tags attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// No structural constraint.
    Any,

    /// A scalar kind, possibly narrowed by bounds (e.g. `int & >=0 & <=255`).
    Scalar(Value),

    /// The inner schema or `null`.
    Nullable(Arc<Schema>),

    /// A list whose elements all satisfy the element schema.
    List(Arc<Schema>),

    /// A struct with string keys whose values satisfy the element schema.
    Map(Arc<Schema>),

    /// A closed struct.
    Struct(Arc<StructSchema>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub schema: Schema,
    pub constraint: Option<Arc<Expr>>,
    pub optional: bool,
}

impl Schema {
    pub fn scalar(kinds: Kind) -> Self {
        Schema::Scalar(Value::kind_of(kinds))
    }

    pub fn nullable(inner: Schema) -> Self {
        Schema::Nullable(Arc::new(inner))
    }

    pub fn list(elem: Schema) -> Self {
        Schema::List(Arc::new(elem))
    }

    pub fn map(elem: Schema) -> Self {
        Schema::Map(Arc::new(elem))
    }

    pub fn structure(schema: StructSchema) -> Self {
        Schema::Struct(Arc::new(schema))
    }

    /// The struct schema, looking through nullability.
    pub fn as_struct(&self) -> Option<&StructSchema> {
        match self {
            Schema::Struct(s) => Some(s),
            Schema::Nullable(inner) => inner.as_struct(),
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Schema::Nullable(_))
    }
}

impl StructSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            constraint: None,
            optional: false,
        }
    }

    pub fn with_constraint(mut self, expr: Expr) -> Self {
        self.constraint = Some(Arc::new(expr));
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Any => write!(f, "_"),
            Schema::Scalar(value) => write!(f, "{}", value),
            Schema::Nullable(inner) => write!(f, "null | {}", inner),
            Schema::List(elem) => write!(f, "[...{}]", elem),
            Schema::Map(elem) => write!(f, "{{[string]: {}}}", elem),
            Schema::Struct(s) => {
                write!(f, "{} {{", s.name)?;
                for (i, field) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    let marker = if field.optional { "?" } else { "" };
                    write!(f, " {}{}: {}", field.name, marker, field.schema)?;
                }
                write!(f, " }}")
            }
        }
    }
}
