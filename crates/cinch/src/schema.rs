//! Schema derivation and the per-type schema cache.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::sync::Arc;

use tracing::{debug, warn};

use cinch_core::{unify, BoundOp, Kind, Value};
use cinch_engine::{compile, FieldSchema, Namespace, Placement, Schema, StructSchema};

use crate::bind::Bind;
use crate::error::SchemaError;
use crate::host::{HostType, ScalarKind, StructType};

/// The schema derived from a host type.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    name: String,
    host: HostType,
    schema: Schema,
    namespace: Namespace,
}

impl TypeSchema {
    /// Derives the schema of `T`.
    ///
    /// # Errors
    ///
    /// Fails if a field constraint does not compile, if a field has a kind
    /// that cannot be bound, or if the type contains itself.
    pub fn derive<T: Bind>() -> Result<Self, SchemaError> {
        let host = T::host_type();
        let name = match peel(host) {
            HostType::Struct(ty) => ty.name.to_string(),
            _ => type_name::<T>().to_string(),
        };
        let schema = Deriver::default().derive(host, &name)?;
        let namespace = match peel(host) {
            HostType::Struct(ty) => Namespace::closed(ty.fields().iter().map(|f| f.name)),
            _ => Namespace::empty(),
        };
        Ok(Self {
            name,
            host,
            schema,
            namespace,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &HostType {
        &self.host
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Field names that extra constraints may refer to.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

/// Looks through pointers.
fn peel(host: HostType) -> HostType {
    match host {
        HostType::Pointer(inner) => peel(inner()),
        other => other,
    }
}

#[derive(Default)]
struct Deriver {
    stack: Vec<TypeId>,
}

impl Deriver {
    fn derive(&mut self, host: HostType, location: &str) -> Result<Schema, SchemaError> {
        let schema = match host {
            HostType::Scalar(ScalarKind::Bool) => Schema::scalar(Kind::BOOL),
            HostType::Scalar(ScalarKind::Int { min, max }) => int_schema(min, max),
            HostType::Scalar(ScalarKind::Float { .. }) => Schema::scalar(Kind::FLOAT),
            HostType::Scalar(ScalarKind::String) => Schema::scalar(Kind::STRING),
            HostType::Pointer(inner) => Schema::nullable(self.derive(inner(), location)?),
            HostType::Sequence(elem) => Schema::list(self.derive(elem(), location)?),
            HostType::Mapping(elem) => Schema::map(self.derive(elem(), location)?),
            HostType::Struct(ty) => self.derive_struct(ty)?,
            HostType::Unsupported(kind) => {
                return Err(SchemaError::Unsupported {
                    location: location.to_string(),
                    kind,
                })
            }
        };
        Ok(schema)
    }

    fn derive_struct(&mut self, ty: StructType) -> Result<Schema, SchemaError> {
        if self.stack.contains(&ty.type_id) {
            return Err(SchemaError::Recursive {
                type_name: ty.name.to_string(),
            });
        }
        self.stack.push(ty.type_id);

        let fields = ty.fields();
        let namespace = Namespace::closed(fields.iter().map(|f| f.name));
        let mut schema = StructSchema::new(ty.name);
        for field in &fields {
            let location = format!("{}.{}", ty.name, field.name);
            let mut field_schema =
                FieldSchema::new(field.name, self.derive(field.host_type(), &location)?)
                    .with_optional(field.optional);
            if let Some(text) = field.constraint {
                let expr = compile(text, &namespace, Placement::Field).map_err(|source| {
                    SchemaError::Constraint {
                        type_name: ty.name.to_string(),
                        field: field.name.to_string(),
                        source,
                    }
                })?;
                field_schema = field_schema.with_constraint(expr);
            }
            schema = schema.with_field(field_schema);
        }

        self.stack.pop();
        Ok(Schema::structure(schema))
    }
}

/// `int`, narrowed to the host range where it is smaller than 64 bits.
fn int_schema(min: i128, max: i128) -> Schema {
    let mut value = Value::kind_of(Kind::INT);
    if let Ok(min) = i64::try_from(min) {
        if min > i64::MIN {
            value = unify(&value, &Value::bound(BoundOp::Ge, Value::Int(min)));
        }
    }
    if let Ok(max) = i64::try_from(max) {
        if max < i64::MAX {
            value = unify(&value, &Value::bound(BoundOp::Le, Value::Int(max)));
        }
    }
    Schema::Scalar(value)
}

/// Memoizes derived schemas per host type.
///
/// Derivation is pure, so two threads deriving the same type at once
/// produce equivalent schemas; the first one stored wins. Failures are
/// cached too.
///
/// # Example
///
/// ```
/// use cinch::{Bind, SchemaCache};
///
/// #[derive(Bind)]
/// struct Point {
///     x: i64,
///     #[bind(constraint = "x + 1")]
///     y: i64,
/// }
///
/// let cache = SchemaCache::new();
/// let first = cache.schema::<Point>().unwrap();
/// let second = cache.schema::<Point>().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: RwLock<HashMap<TypeId, Result<Arc<TypeSchema>, SchemaError>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the schema of `T`, deriving it on first use.
    pub fn schema<T: Bind>(&self) -> Result<Arc<TypeSchema>, SchemaError> {
        let key = TypeId::of::<T>();
        {
            let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = schemas.get(&key) {
                return entry.clone();
            }
        }

        let derived = TypeSchema::derive::<T>().map(Arc::new);
        match &derived {
            Ok(schema) => debug!(
                type_name = schema.name(),
                schema = %schema.schema(),
                "schema derived"
            ),
            Err(e) => warn!(type_name = type_name::<T>(), error = %e, "schema derivation failed"),
        }

        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        schemas.entry(key).or_insert(derived).clone()
    }

    /// Number of types derived so far, including failed derivations.
    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
