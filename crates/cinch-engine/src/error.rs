//! Error types for parsing and name resolution.

use thiserror::Error;

/// A syntax error at a byte offset of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at offset {offset}: {message}")]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Errors turning constraint text into a resolved expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("reference {0:?} not found")]
    Unresolved(String),

    #[error("field {0:?} is not declared")]
    UnknownField(String),

    #[error("unknown function {0:?}")]
    UnknownBuiltin(String),

    #[error("function {name} takes {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },
}
