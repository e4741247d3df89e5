//! The binder: extra constraints, validation and completion.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use cinch_config::{CinchConfig, NilValidation};
use cinch_core::{Path, Value};
use cinch_engine::{compile, BoundResult, Classification, Expr, Issue, Placement};

use crate::bind::Bind;
use crate::decode::{conform, foreign_keys};
use crate::error::{BindError, Diagnostics, Result};
use crate::schema::{SchemaCache, TypeSchema};

/// Holds extra constraints per type and runs validation and completion.
///
/// A `Context` only reads snapshots of the values passed to it; it keeps no
/// references into them between calls.
///
/// # Example
///
/// ```
/// use cinch::{Bind, Context};
///
/// #[derive(Bind, Debug, PartialEq)]
/// struct Sum {
///     #[bind(constraint = "c - b", optional)]
///     a: i64,
///     #[bind(constraint = "c - a", optional)]
///     b: i64,
///     #[bind(constraint = "a + b & >=5", optional)]
///     c: i64,
/// }
///
/// let ctx = Context::new();
/// assert!(ctx.validate(&Sum { a: 1, b: 4, c: 5 }).is_ok());
/// assert!(ctx.validate(&Sum { a: 1, b: 4, c: 6 }).is_err());
///
/// let mut sum = Sum { a: 0, b: 4, c: 8 };
/// ctx.complete(&mut sum).unwrap();
/// assert_eq!(sum, Sum { a: 4, b: 4, c: 8 });
/// ```
#[derive(Debug, Default)]
pub struct Context {
    config: CinchConfig,
    cache: Arc<SchemaCache>,
    constraints: HashMap<TypeId, Vec<Arc<Expr>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CinchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Shares a schema cache with other contexts.
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &CinchConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Attaches a constraint to the type of `value`.
    ///
    /// The constraint applies to every later `validate` and `complete` of
    /// that type, not just to `value`.
    pub fn constrain<T: Bind>(&mut self, _value: &T, expr: &str) -> Result<()> {
        self.constrain_type::<T>(expr)
    }

    /// Attaches a constraint to `T`.
    ///
    /// Struct literals at the top of `expr` may refer to the fields of `T`
    /// by name.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if `T` has no schema and `ConstraintSyntax` if
    /// `expr` does not compile.
    pub fn constrain_type<T: Bind>(&mut self, expr: &str) -> Result<()> {
        let schema = self.cache.schema::<T>()?;
        let compiled = compile(expr, schema.namespace(), Placement::Root).map_err(|source| {
            BindError::ConstraintSyntax {
                type_name: schema.name().to_string(),
                source,
            }
        })?;
        let constraints = self.constraints.entry(T::type_key()).or_default();
        constraints.push(Arc::new(compiled));
        debug!(
            type_name = schema.name(),
            constraint = expr,
            total = constraints.len(),
            "constraint added"
        );
        Ok(())
    }

    /// Number of extra constraints attached to `T`.
    pub fn constraint_count<T: Bind>(&self) -> usize {
        self.constraints.get(&T::type_key()).map_or(0, Vec::len)
    }

    /// Unifies `value` with its schema and constraints without judging the
    /// outcome.
    pub fn evaluate<T: Bind>(&self, value: &T) -> Result<BoundResult> {
        let schema = self.cache.schema::<T>()?;
        let encoded = value.encode()?;
        Ok(self.unify::<T>(&schema, encoded))
    }

    /// Checks `value` against its constraints. Never modifies `value`.
    ///
    /// A nil value passes or fails according to
    /// `binder.nil_validation`; an incomplete result fails unless
    /// `binder.require_concrete` is off.
    pub fn validate<T: Bind>(&self, value: &T) -> Result<()> {
        let schema = self.cache.schema::<T>()?;
        if value.is_nil() {
            return match self.config.binder.nil_validation {
                NilValidation::Vacuous => {
                    debug!(type_name = schema.name(), "nil value passes validation");
                    Ok(())
                }
                NilValidation::Reject => Err(BindError::Validation(Diagnostics::new(vec![
                    Issue::incomplete(Path::root(), "value is nil"),
                ]))),
            };
        }

        let encoded = value.encode()?;
        let result = self.unify::<T>(&schema, encoded);
        let passed = match result.classification() {
            Classification::Concrete => true,
            Classification::Incomplete => !self.config.binder.require_concrete,
            Classification::Conflicting => false,
        };
        debug!(
            type_name = schema.name(),
            classification = ?result.classification(),
            issues = result.issues().len(),
            "validate"
        );
        if passed {
            Ok(())
        } else {
            Err(BindError::Validation(Diagnostics::new(result.into_issues())))
        }
    }

    /// Fills in the parts of `value` its constraints determine.
    ///
    /// `value` is modified only if this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns `Completion` if `value` is nil, the result is conflicting or
    /// incomplete, or the result does not fit the host type.
    pub fn complete<T: Bind>(&self, value: &mut T) -> Result<()> {
        let schema = self.cache.schema::<T>()?;
        if value.is_nil() {
            return Err(BindError::Completion(Diagnostics::new(vec![
                Issue::incomplete(Path::root(), "cannot complete a nil value"),
            ])));
        }

        let encoded = value.encode()?;
        let result = self.unify::<T>(&schema, encoded);
        debug!(
            type_name = schema.name(),
            classification = ?result.classification(),
            issues = result.issues().len(),
            "complete"
        );
        if !result.is_concrete() {
            return Err(BindError::Completion(Diagnostics::new(result.into_issues())));
        }
        let Some(resolved) = result.into_value() else {
            return Ok(());
        };

        // Results that do not fit the host fail before anything is written.
        conform(schema.host(), &resolved).map_err(|e| {
            BindError::Completion(Diagnostics::new(vec![Issue::conflict(e.path, e.message)]))
        })?;
        value
            .decode(&resolved)
            .map_err(|e| BindError::Internal(e.to_string()))
    }

    fn unify<T: Bind>(&self, schema: &TypeSchema, encoded: Option<Value>) -> BoundResult {
        let constraints = self
            .constraints
            .get(&T::type_key())
            .map_or(&[][..], Vec::as_slice);
        trace!(
            type_name = schema.name(),
            constraints = constraints.len(),
            "unifying"
        );
        let result = cinch_engine::unify(
            schema.schema(),
            constraints,
            encoded.clone(),
            &self.config.engine,
        );
        if !result.is_concrete() {
            return result;
        }
        let issues = match result.value() {
            Some(resolved) => foreign_keys(schema.host(), encoded.as_ref(), resolved),
            None => Vec::new(),
        };
        if issues.is_empty() {
            result
        } else {
            BoundResult::incomplete(result.into_value(), issues)
        }
    }
}
