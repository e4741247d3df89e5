//! Error types for binding.

use std::fmt;

use thiserror::Error;

use cinch_core::Path;
use cinch_engine::{CompileError, Issue};

/// Main error type for `Context` operations.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    /// The host type cannot be turned into a schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An extra constraint passed to `constrain` does not compile.
    #[error("invalid constraint for {type_name}: {source}")]
    ConstraintSyntax {
        type_name: String,
        #[source]
        source: CompileError,
    },

    /// The value cannot be encoded for the requested operation.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The value does not satisfy its constraints.
    #[error("validation failed: {0}")]
    Validation(Diagnostics),

    /// The value cannot be completed to a unique concrete value.
    #[error("completion failed: {0}")]
    Completion(Diagnostics),

    /// A concrete result could not be written back. Indicates an engine
    /// defect, not a caller error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BindError {
    /// The diagnostics of a validation or completion failure.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            BindError::Validation(d) | BindError::Completion(d) => Some(d),
            _ => None,
        }
    }
}

/// Failure to derive a schema from a host type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{location}: {kind} values cannot be bound")]
    Unsupported {
        location: String,
        kind: &'static str,
    },

    #[error("invalid constraint on {type_name}.{field}: {source}")]
    Constraint {
        type_name: String,
        field: String,
        #[source]
        source: CompileError,
    },

    #[error("{type_name} is recursive")]
    Recursive { type_name: String },
}

/// Failure to encode a host value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{path}: {message}")]
    Value { path: Path, message: String },

    #[error("{0}")]
    Unsupported(&'static str),
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        EncodeError::Value {
            path: Path::root(),
            message: message.into(),
        }
    }

    /// Prefixes the error path with a field label or list index.
    pub fn under(self, segment: impl Into<cinch_core::Segment>) -> Self {
        match self {
            EncodeError::Value { mut path, message } => {
                path.prepend(segment.into());
                EncodeError::Value { path, message }
            }
            other => other,
        }
    }
}

/// Failure to write a unified value back into host memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct DecodeError {
    pub path: Path,
    pub message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Path::root(),
            message: message.into(),
        }
    }

    pub fn mismatch(expected: &str, found: &cinch_core::Value) -> Self {
        Self::new(format!("expected {}, found {}", expected, found))
    }

    pub fn under(mut self, segment: impl Into<cinch_core::Segment>) -> Self {
        self.path.prepend(segment.into());
        self
    }
}

/// The issues that made an operation fail.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Paths of all issues, in the order they were reported.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.issues.iter().map(|issue| &issue.path)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "no diagnostics");
        }
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, BindError>;
