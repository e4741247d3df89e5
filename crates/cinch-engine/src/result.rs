//! Outcome of an evaluation.

use std::fmt;

use cinch_core::{Path, Value};

/// How an evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Every present node has exactly one value.
    Concrete,
    /// Some node is bottom.
    Conflicting,
    /// No conflicts, but some node has more than one possible value.
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Conflict,
    Incomplete,
}

/// A conflict or an incomplete value at a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub path: Path,
    pub message: String,
    pub kind: IssueKind,
}

impl Issue {
    pub fn conflict(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            kind: IssueKind::Conflict,
        }
    }

    pub fn incomplete(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            kind: IssueKind::Incomplete,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The unified value and its classification.
///
/// For `Concrete` results `value` holds the manifested value; absent
/// optional nodes are left out. `Incomplete` results carry the partial
/// value for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundResult {
    classification: Classification,
    value: Option<Value>,
    issues: Vec<Issue>,
}

impl BoundResult {
    pub fn concrete(value: Option<Value>) -> Self {
        Self {
            classification: Classification::Concrete,
            value,
            issues: Vec::new(),
        }
    }

    pub fn conflicting(issues: Vec<Issue>) -> Self {
        Self {
            classification: Classification::Conflicting,
            value: None,
            issues,
        }
    }

    pub fn incomplete(value: Option<Value>, issues: Vec<Issue>) -> Self {
        Self {
            classification: Classification::Incomplete,
            value,
            issues,
        }
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_concrete(&self) -> bool {
        self.classification == Classification::Concrete
    }

    /// The manifested value; `None` for conflicts and for an absent root.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}
