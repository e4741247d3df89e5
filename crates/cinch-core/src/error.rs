//! Error types for the value lattice.

use thiserror::Error;

use crate::path::{Path, Segment};

/// The reason a value is bottom, and where it happened.
///
/// Paths are relative to the value that carries the conflict; callers that
/// embed a conflicting value elsewhere extend the path with [`Conflict::at`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {message}")]
pub struct Conflict {
    pub path: Path,
    pub message: String,
}

impl Conflict {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Path::root(),
            message: message.into(),
        }
    }

    /// Prefixes the conflict path with `prefix`.
    pub fn at(mut self, prefix: &Path) -> Self {
        self.path = self.path.within(prefix);
        self
    }

    /// Prefixes the conflict path with a single segment.
    pub fn under(mut self, segment: Segment) -> Self {
        self.path.prepend(segment);
        self
    }
}
