//! Runtime descriptions of host types.

use std::any::TypeId;
use std::fmt;

/// The shape of a host type, as seen by the binder.
///
/// Nested types are described lazily through function pointers so that a
/// type can be described without walking its children.
#[derive(Clone, Copy)]
pub enum HostType {
    Scalar(ScalarKind),

    /// A value that may be absent (`Option<T>`).
    Pointer(fn() -> HostType),

    /// An ordered sequence (`Vec<T>`).
    Sequence(fn() -> HostType),

    /// A mapping from string keys (`HashMap<String, T>`).
    Mapping(fn() -> HostType),

    Struct(StructType),

    /// A type with no constraint representation, e.g. a channel.
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    /// An integer type with its inclusive range.
    Int { min: i128, max: i128 },
    /// A float type with its width in bits.
    Float { bits: u32 },
    String,
}

/// Describes a struct type at runtime.
#[derive(Clone, Copy)]
pub struct StructType {
    /// Name of the struct type.
    pub name: &'static str,
    /// TypeId of the struct type.
    pub type_id: TypeId,
    fields: fn() -> Vec<HostField>,
}

impl StructType {
    pub fn new<T: 'static>(name: &'static str, fields: fn() -> Vec<HostField>) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            fields,
        }
    }

    /// The bound fields, in declaration order.
    pub fn fields(&self) -> Vec<HostField> {
        (self.fields)()
    }
}

/// A bound struct field.
#[derive(Clone, Copy)]
pub struct HostField {
    /// Label used in constraints.
    pub name: &'static str,
    pub ty: fn() -> HostType,
    /// Constraint text over sibling fields, if any.
    pub constraint: Option<&'static str>,
    pub optional: bool,
}

impl HostField {
    pub fn new(name: &'static str, ty: fn() -> HostType) -> Self {
        Self {
            name,
            ty,
            constraint: None,
            optional: false,
        }
    }

    pub fn with_constraint(mut self, constraint: &'static str) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn host_type(&self) -> HostType {
        (self.ty)()
    }
}

impl HostType {
    /// Short name of the kind, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostType::Scalar(ScalarKind::Bool) => "bool",
            HostType::Scalar(ScalarKind::Int { .. }) => "int",
            HostType::Scalar(ScalarKind::Float { .. }) => "float",
            HostType::Scalar(ScalarKind::String) => "string",
            HostType::Pointer(_) => "pointer",
            HostType::Sequence(_) => "sequence",
            HostType::Mapping(_) => "mapping",
            HostType::Struct(_) => "struct",
            HostType::Unsupported(kind) => kind,
        }
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Scalar(kind) => f.debug_tuple("Scalar").field(kind).finish(),
            HostType::Pointer(inner) => f.debug_tuple("Pointer").field(&inner()).finish(),
            HostType::Sequence(elem) => f.debug_tuple("Sequence").field(&elem()).finish(),
            HostType::Mapping(elem) => f.debug_tuple("Mapping").field(&elem()).finish(),
            HostType::Struct(s) => f.debug_tuple("Struct").field(&s.name).finish(),
            HostType::Unsupported(kind) => f.debug_tuple("Unsupported").field(kind).finish(),
        }
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructType")
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Debug for HostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostField")
            .field("name", &self.name)
            .field("constraint", &self.constraint)
            .field("optional", &self.optional)
            .finish()
    }
}
