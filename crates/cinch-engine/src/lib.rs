//! cinch engine - constraint expressions and unification.
//!
//! This crate turns constraint text into resolved expressions and evaluates
//! them together with a structural [`Schema`] and host data:
//! - [`compile`] parses and resolves constraint text
//! - [`Evaluator`] runs the fixpoint over schema, constraints and data
//! - [`BoundResult`] classifies the outcome as concrete, conflicting or
//!   incomplete

pub mod compile;
pub mod error;
pub mod eval;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod result;
pub mod schema;

use std::sync::Arc;

use tracing::trace;

use cinch_config::EngineConfig;
use cinch_core::Value;

pub use compile::{compile, resolve, Namespace, Placement};
pub use error::{CompileError, SyntaxError};
pub use eval::Evaluator;
pub use expr::{BinaryOp, Builtin, Disjunct, Expr, FieldDecl, UnaryOp};
pub use parser::parse;
pub use result::{BoundResult, Classification, Issue, IssueKind};
pub use schema::{FieldSchema, Schema, StructSchema};

/// Unifies a schema, root-placed constraints and optional host data.
///
/// `value` is `None` when there is no host data to contribute.
pub fn unify(
    schema: &Schema,
    constraints: &[Arc<Expr>],
    value: Option<Value>,
    config: &EngineConfig,
) -> BoundResult {
    trace!(
        schema = %schema,
        constraints = constraints.len(),
        has_value = value.is_some(),
        "unify"
    );
    let mut evaluator = Evaluator::new(*config);
    evaluator.add_schema(schema);
    for constraint in constraints {
        evaluator.add_constraint(Arc::clone(constraint));
    }
    if let Some(value) = value {
        evaluator.add_value(value);
    }
    evaluator.evaluate()
}
