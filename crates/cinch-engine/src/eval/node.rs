//! Evaluation graph nodes.

use std::sync::Arc;

use indexmap::IndexMap;

use cinch_core::{Segment, Value};

use crate::expr::Expr;
use crate::schema::Schema;

pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

/// Where a conjunct came from.
///
/// Only host data and extra constraints make a node explicit; schema
/// conjuncts (including field tags) never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Schema,
    Constraint,
    Value,
}

#[derive(Debug, Clone)]
pub(crate) enum Source {
    /// An expression whose depth-0 references resolve in `env`.
    Expr {
        expr: Arc<Expr>,
        env: Option<NodeId>,
    },
    Value(Value),
    Schema(Schema),
}

#[derive(Debug, Clone)]
pub(crate) struct Conjunct {
    pub source: Source,
    pub origin: Origin,
}

impl Conjunct {
    pub fn new(source: Source, origin: Origin) -> Self {
        Self { source, origin }
    }

    pub fn expr(expr: &Expr, env: Option<NodeId>, origin: Origin) -> Self {
        Self::new(
            Source::Expr {
                expr: Arc::new(expr.clone()),
                env,
            },
            origin,
        )
    }
}

/// A conjunct recomputed on every fixpoint round.
#[derive(Debug, Clone)]
pub(crate) struct Leaf {
    pub conjunct: Conjunct,
    /// Set once a composite result has been expanded into children.
    pub resolved: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) enum Shape {
    #[default]
    Undetermined,
    Struct(StructShape),
    List(ListShape),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StructShape {
    pub fields: IndexMap<String, NodeId>,
    /// The declared field set of a closed struct.
    pub allowed: Option<Vec<String>>,
    /// Conjuncts applied to every field, present and future.
    pub patterns: Vec<Conjunct>,
    /// Set when a struct value or literal has supplied fields.
    pub settled: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ListShape {
    pub elems: Vec<NodeId>,
    pub closed_len: Option<usize>,
    /// Element conjuncts applying from a start index onwards.
    pub tails: Vec<(usize, Conjunct)>,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub segment: Option<Segment>,
    pub shape: Shape,
    pub leaves: Vec<Leaf>,
    pub value: Value,
    /// Some leaf could not be evaluated in the last round.
    pub pending: bool,
    pub optional: Option<bool>,
    pub nullable: bool,
    /// Host data or an extra constraint reached this node or a descendant.
    /// Unset host data (top) only marks the parent.
    pub explicit: bool,
    pub defaulted: bool,
    pub conflicts: Vec<String>,
}

impl Node {
    pub fn new(parent: Option<NodeId>, segment: Option<Segment>) -> Self {
        Self {
            parent,
            segment,
            shape: Shape::Undetermined,
            leaves: Vec::new(),
            value: Value::top(),
            pending: false,
            optional: None,
            nullable: false,
            explicit: false,
            defaulted: false,
            conflicts: Vec::new(),
        }
    }

    /// Returns true if the node is left out of the result when it is not
    /// concrete.
    pub fn may_be_absent(&self) -> bool {
        (self.nullable || self.optional == Some(true)) && !self.explicit && !self.pending
    }
}
