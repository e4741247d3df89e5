//! Fixpoint evaluation of schemas, constraints and host data.
//!
//! Every input is added as a conjunct to a node of an evaluation graph.
//! Struct and list literals, struct and list values and structural schemas
//! are expanded into child nodes as they are added; everything else stays
//! on the node as a leaf conjunct. Leaves are recomputed each round until
//! nothing changes. Defaults are applied only after that first fixpoint,
//! after which evaluation resumes.

mod manifest;
mod node;
mod ops;


use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{trace, warn};

use cinch_config::EngineConfig;
use cinch_core::{
    unify, Alternative, Disjunction, Kind, ListValue, Path, Segment, StructValue, Value,
};

use crate::expr::{Builtin, Expr};
use crate::schema::Schema;

use node::{Conjunct, Leaf, Node, NodeId, Origin, Shape, Source, ROOT};
use ops::{EvalResult, Incomplete};

/// Unifies a schema, extra constraints and host data into one value.
///
/// # Examples
///
/// ```
/// use cinch_config::EngineConfig;
/// use cinch_core::Value;
/// use cinch_engine::{compile, Evaluator, Namespace, Placement};
/// use std::sync::Arc;
///
/// let expr = compile("{a: int, b: a + 1}", &Namespace::empty(), Placement::Root).unwrap();
///
/// let mut evaluator = Evaluator::new(EngineConfig::default());
/// evaluator.add_constraint(Arc::new(expr));
/// evaluator.add_value(Value::structure([("a", Value::Int(2))]));
///
/// let result = evaluator.evaluate();
/// assert!(result.is_concrete());
/// assert_eq!(
///     result.value().unwrap().to_string(),
///     "{a: 2, b: 3}"
/// );
/// ```
#[derive(Debug)]
pub struct Evaluator {
    nodes: Vec<Node>,
    config: EngineConfig,
    defaults_enabled: bool,
    iterations: usize,
}

enum Located {
    Node(NodeId),
    Value(Value),
}

impl Evaluator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            nodes: vec![Node::new(None, None)],
            config,
            defaults_enabled: false,
            iterations: 0,
        }
    }

    pub fn add_schema(&mut self, schema: &Schema) {
        self.add(
            ROOT,
            Conjunct::new(Source::Schema(schema.clone()), Origin::Schema),
        );
    }

    /// Adds a compiled root-placed constraint.
    pub fn add_constraint(&mut self, expr: Arc<Expr>) {
        self.add(
            ROOT,
            Conjunct::new(Source::Expr { expr, env: None }, Origin::Constraint),
        );
    }

    pub fn add_value(&mut self, value: Value) {
        self.add(ROOT, Conjunct::new(Source::Value(value), Origin::Value));
    }

    /// Number of fixpoint rounds run so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn add(&mut self, id: NodeId, conjunct: Conjunct) {
        if conjunct.origin != Origin::Schema {
            // Unset host elements and map values keep their container but
            // may still resolve to absent.
            let unset = conjunct.origin == Origin::Value
                && matches!(&conjunct.source, Source::Value(v) if v.is_top());
            let target = if unset { self.nodes[id].parent } else { Some(id) };
            if let Some(target) = target {
                self.mark_explicit(target);
            }
        }
        let Conjunct { source, origin } = conjunct;
        match source {
            Source::Schema(schema) => self.add_schema_at(id, &schema),
            Source::Value(value) => self.add_value_at(id, value, origin),
            Source::Expr { expr, env } => self.add_expr_at(id, expr, env, origin),
        }
    }

    fn add_schema_at(&mut self, id: NodeId, schema: &Schema) {
        match schema {
            Schema::Any => {}
            Schema::Scalar(value) => {
                self.push_leaf(id, Source::Value(value.clone()), Origin::Schema);
            }
            Schema::Nullable(inner) => {
                self.nodes[id].nullable = true;
                match &**inner {
                    Schema::Scalar(value) => {
                        let value = Disjunction::from_alternatives(vec![
                            Alternative {
                                value: Value::Null,
                                default: false,
                            },
                            Alternative {
                                value: value.clone(),
                                default: false,
                            },
                        ]);
                        self.push_leaf(id, Source::Value(value), Origin::Schema);
                    }
                    other => self.add_schema_at(id, other),
                }
            }
            Schema::List(elem) => {
                if self.ensure_list(id) {
                    let tail = Conjunct::new(Source::Schema((**elem).clone()), Origin::Schema);
                    self.add_tail(id, 0, tail);
                }
            }
            Schema::Map(elem) => {
                if !self.ensure_struct(id) {
                    return;
                }
                let pattern = Conjunct::new(Source::Schema((**elem).clone()), Origin::Schema);
                let existing: Vec<NodeId> = match &mut self.nodes[id].shape {
                    Shape::Struct(s) => {
                        s.patterns.push(pattern.clone());
                        s.fields.values().copied().collect()
                    }
                    _ => Vec::new(),
                };
                for child in existing {
                    self.add(child, pattern.clone());
                }
            }
            Schema::Struct(schema) => {
                if !self.ensure_struct(id) {
                    return;
                }
                self.restrict_fields(id, schema.field_names().map(String::from).collect());
                for field in &schema.fields {
                    let Some(child) = self.field(id, &field.name) else {
                        continue;
                    };
                    self.merge_optional(child, field.optional);
                    self.add_schema_at(child, &field.schema);
                    if let Some(expr) = &field.constraint {
                        let tag = Source::Expr {
                            expr: Arc::clone(expr),
                            env: Some(id),
                        };
                        self.add(child, Conjunct::new(tag, Origin::Schema));
                    }
                }
            }
        }
    }

    fn add_value_at(&mut self, id: NodeId, value: Value, origin: Origin) {
        match value {
            Value::Struct(s) => {
                if !self.settle_struct(id) {
                    return;
                }
                for (name, value) in s.fields {
                    if let Some(child) = self.field(id, &name) {
                        self.add(child, Conjunct::new(Source::Value(value), origin));
                    }
                }
            }
            Value::List(l) => {
                if !self.ensure_list(id) {
                    return;
                }
                let len = l.elems.len();
                for (idx, value) in l.elems.into_iter().enumerate() {
                    if let Some(child) = self.elem(id, idx) {
                        self.add(child, Conjunct::new(Source::Value(value), origin));
                    }
                }
                match l.tail {
                    Some(tail) => {
                        self.add_tail(id, len, Conjunct::new(Source::Value(*tail), origin))
                    }
                    None => self.close(id, len),
                }
            }
            other => self.push_leaf(id, Source::Value(other), origin),
        }
    }

    fn add_expr_at(&mut self, id: NodeId, expr: Arc<Expr>, env: Option<NodeId>, origin: Origin) {
        match &*expr {
            Expr::Unify(lhs, rhs) => {
                self.add(id, Conjunct::expr(lhs, env, origin));
                self.add(id, Conjunct::expr(rhs, env, origin));
            }
            Expr::Struct(decls) => {
                if !self.settle_struct(id) {
                    return;
                }
                for decl in decls {
                    let Some(child) = self.field(id, &decl.label) else {
                        continue;
                    };
                    self.merge_optional(child, decl.optional);
                    // Optional declarations constrain without requiring.
                    let origin = if decl.optional { Origin::Schema } else { origin };
                    self.add(child, Conjunct::expr(&decl.value, Some(id), origin));
                }
            }
            Expr::List { elems, tail } => {
                if !self.ensure_list(id) {
                    return;
                }
                for (idx, elem) in elems.iter().enumerate() {
                    if let Some(child) = self.elem(id, idx) {
                        self.add(child, Conjunct::expr(elem, env, origin));
                    }
                }
                match tail {
                    Some(tail) => self.add_tail(id, elems.len(), Conjunct::expr(tail, env, origin)),
                    None => self.close(id, elems.len()),
                }
            }
            _ => self.push_leaf(id, Source::Expr { expr, env }, origin),
        }
    }

    fn push_leaf(&mut self, id: NodeId, source: Source, origin: Origin) {
        self.nodes[id].leaves.push(Leaf {
            conjunct: Conjunct::new(source, origin),
            resolved: false,
        });
    }

    fn push_node(&mut self, parent: NodeId, segment: Segment) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(Some(parent), Some(segment)));
        id
    }

    fn mark_explicit(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(id) = current {
            if self.nodes[id].explicit {
                break;
            }
            self.nodes[id].explicit = true;
            current = self.nodes[id].parent;
        }
    }

    fn merge_optional(&mut self, id: NodeId, optional: bool) {
        let node = &mut self.nodes[id];
        node.optional = Some(node.optional.map_or(optional, |o| o && optional));
    }

    fn ensure_struct(&mut self, id: NodeId) -> bool {
        let node = &mut self.nodes[id];
        match node.shape {
            Shape::Undetermined => {
                node.shape = Shape::Struct(Default::default());
                true
            }
            Shape::Struct(_) => true,
            Shape::List(_) => {
                node.conflicts
                    .push("conflicting values (mismatched types list and struct)".to_string());
                false
            }
        }
    }

    fn settle_struct(&mut self, id: NodeId) -> bool {
        if !self.ensure_struct(id) {
            return false;
        }
        if let Shape::Struct(s) = &mut self.nodes[id].shape {
            s.settled = true;
        }
        true
    }

    fn ensure_list(&mut self, id: NodeId) -> bool {
        let node = &mut self.nodes[id];
        match node.shape {
            Shape::Undetermined => {
                node.shape = Shape::List(Default::default());
                true
            }
            Shape::List(_) => true,
            Shape::Struct(_) => {
                node.conflicts
                    .push("conflicting values (mismatched types struct and list)".to_string());
                false
            }
        }
    }

    fn restrict_fields(&mut self, id: NodeId, names: Vec<String>) {
        let Shape::Struct(s) = &mut self.nodes[id].shape else {
            return;
        };
        let allowed: Vec<String> = match s.allowed.take() {
            Some(previous) => previous.into_iter().filter(|n| names.contains(n)).collect(),
            None => names,
        };
        let rejected: Vec<NodeId> = s
            .fields
            .iter()
            .filter(|(name, _)| !allowed.contains(name))
            .map(|(_, child)| *child)
            .collect();
        s.allowed = Some(allowed);
        for child in rejected {
            self.nodes[child].conflicts.push("field not allowed".to_string());
        }
    }

    /// Returns the child for `name`, creating it and applying patterns.
    fn field(&mut self, id: NodeId, name: &str) -> Option<NodeId> {
        if !self.ensure_struct(id) {
            return None;
        }
        let Shape::Struct(s) = &self.nodes[id].shape else {
            return None;
        };
        if let Some(child) = s.fields.get(name) {
            return Some(*child);
        }
        let allowed = s.allowed.as_ref().map_or(true, |a| a.iter().any(|n| n == name));
        let patterns = s.patterns.clone();

        let child = self.push_node(id, Segment::Field(name.to_string()));
        if let Shape::Struct(s) = &mut self.nodes[id].shape {
            s.fields.insert(name.to_string(), child);
        }
        if !allowed {
            self.nodes[child].conflicts.push("field not allowed".to_string());
        }
        for pattern in patterns {
            self.add(child, pattern);
        }
        Some(child)
    }

    /// Returns element `idx`, creating it and any missing predecessors.
    fn elem(&mut self, id: NodeId, idx: usize) -> Option<NodeId> {
        if !self.ensure_list(id) {
            return None;
        }
        let Shape::List(l) = &self.nodes[id].shape else {
            return None;
        };
        if let Some(child) = l.elems.get(idx) {
            return Some(*child);
        }
        if let Some(len) = l.closed_len {
            let message = format!("incompatible list lengths ({} and at least {})", len, idx + 1);
            self.nodes[id].conflicts.push(message);
        }

        loop {
            let (next, tails) = match &self.nodes[id].shape {
                Shape::List(l) => (l.elems.len(), l.tails.clone()),
                _ => return None,
            };
            let child = self.push_node(id, Segment::Index(next));
            if let Shape::List(l) = &mut self.nodes[id].shape {
                l.elems.push(child);
            }
            for (start, tail) in tails {
                if start <= next {
                    self.add(child, tail);
                }
            }
            if next == idx {
                return Some(child);
            }
        }
    }

    fn add_tail(&mut self, id: NodeId, start: usize, tail: Conjunct) {
        let Shape::List(l) = &mut self.nodes[id].shape else {
            return;
        };
        l.tails.push((start, tail.clone()));
        let targets: Vec<NodeId> = l.elems.iter().skip(start).copied().collect();
        for child in targets {
            self.add(child, tail.clone());
        }
    }

    fn close(&mut self, id: NodeId, len: usize) {
        let Shape::List(l) = &mut self.nodes[id].shape else {
            return;
        };
        let conflict = match l.closed_len {
            Some(closed) if closed != len => Some(format!(
                "incompatible list lengths ({} and {})",
                closed, len
            )),
            Some(_) => None,
            None if l.elems.len() > len => Some(format!(
                "incompatible list lengths ({} and at least {})",
                len,
                l.elems.len()
            )),
            None => {
                l.closed_len = Some(len);
                None
            }
        };
        if let Some(message) = conflict {
            self.nodes[id].conflicts.push(message);
        }
    }

    /// Runs rounds until no leaf changes or the iteration limit is hit.
    fn run_fixpoint(&mut self) {
        for _ in 0..self.config.max_iterations {
            self.iterations += 1;
            let mut changed = false;
            let mut id = 0;
            while id < self.nodes.len() {
                changed |= self.refresh(id);
                id += 1;
            }
            trace!(
                iteration = self.iterations,
                nodes = self.nodes.len(),
                changed,
                "fixpoint round"
            );
            if !changed {
                return;
            }
        }
        warn!(
            max_iterations = self.config.max_iterations,
            "fixpoint did not converge"
        );
    }

    /// Recomputes a node's leaf value. Returns true if anything changed.
    fn refresh(&mut self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        let mut value = match node.shape {
            Shape::Undetermined => Value::top(),
            Shape::Struct(_) => Value::kind_of(Kind::STRUCT),
            Shape::List(_) => Value::kind_of(Kind::LIST),
        };
        let mut pending = false;
        let mut expansions = Vec::new();

        for (idx, leaf) in node.leaves.iter().enumerate() {
            if leaf.resolved {
                continue;
            }
            match &leaf.conjunct.source {
                Source::Value(v) => value = unify(&value, v),
                Source::Expr { expr, env } => match self.eval(expr, *env, 0) {
                    Ok(result) if result.is_composite() => {
                        let result = if self.defaults_enabled {
                            result.defaulted().unwrap_or(result)
                        } else {
                            result
                        };
                        if result.is_concrete() {
                            expansions.push((idx, result));
                        } else {
                            pending = true;
                        }
                    }
                    Ok(result) => value = unify(&value, &result),
                    Err(Incomplete) => pending = true,
                },
                Source::Schema(_) => {}
            }
        }

        let changed =
            !expansions.is_empty() || node.value != value || node.pending != pending;
        let node = &mut self.nodes[id];
        node.value = value;
        node.pending = pending;

        for (idx, result) in expansions {
            let leaf = &mut self.nodes[id].leaves[idx];
            leaf.resolved = true;
            let origin = leaf.conjunct.origin;
            self.add(id, Conjunct::new(Source::Value(result), origin));
        }
        changed
    }

    /// Applies defaults to non-concrete nodes. Nodes whose own constraints
    /// are settled go first; pending nodes are defaulted only when nothing
    /// else is left.
    fn apply_defaults(&mut self) -> bool {
        self.defaults_enabled = true;

        let candidates: Vec<(NodeId, Value, bool)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.defaulted && !node.value.is_concrete())
            .filter_map(|(id, node)| node.value.defaulted().map(|d| (id, d, node.pending)))
            .collect();

        let settled: Vec<(NodeId, Value, bool)> = candidates
            .iter()
            .filter(|(_, _, pending)| !pending)
            .cloned()
            .collect();
        let chosen = if settled.is_empty() { candidates } else { settled };
        if chosen.is_empty() {
            return false;
        }

        for (id, value, _) in chosen {
            trace!(path = %self.path(id), default = %value, "applying default");
            self.nodes[id].defaulted = true;
            self.add(id, Conjunct::new(Source::Value(value), Origin::Schema));
        }
        true
    }

    fn eval(&self, expr: &Expr, env: Option<NodeId>, virtual_depth: usize) -> EvalResult {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Bound(op, limit) => {
                let limit = self.eval(limit, env, virtual_depth)?;
                if !limit.is_atom() {
                    return Err(Incomplete);
                }
                Ok(Value::bound(*op, limit))
            }
            Expr::Ident(name) | Expr::Call(name, _) => {
                Ok(Value::bottom(format!("reference {:?} not found", name)))
            }
            Expr::Ref { .. } | Expr::Select(..) | Expr::Index(..) => {
                match self.locate(expr, env, virtual_depth)? {
                    Located::Node(id) => self.node_value(id),
                    Located::Value(value) => Ok(value),
                }
            }
            Expr::Builtin(builtin, args) => self.eval_builtin(*builtin, args, env, virtual_depth),
            Expr::Unary(op, operand) => ops::unary(*op, &self.eval(operand, env, virtual_depth)?),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, env, virtual_depth)?;
                let rhs = self.eval(rhs, env, virtual_depth)?;
                ops::binary(*op, &lhs, &rhs)
            }
            Expr::Unify(lhs, rhs) => {
                let lhs = self.eval(lhs, env, virtual_depth)?;
                let rhs = self.eval(rhs, env, virtual_depth)?;
                Ok(unify(&lhs, &rhs))
            }
            Expr::Disjunction(disjuncts) => {
                let alternatives = disjuncts
                    .iter()
                    .map(|d| {
                        Ok(Alternative {
                            value: self.eval(&d.expr, env, virtual_depth)?,
                            default: d.default,
                        })
                    })
                    .collect::<Result<Vec<_>, Incomplete>>()?;
                Ok(Disjunction::from_alternatives(alternatives))
            }
            Expr::Default(inner) => self.eval(inner, env, virtual_depth),
            Expr::Struct(decls) => {
                let mut fields: IndexMap<String, Value> = IndexMap::new();
                for decl in decls.iter().filter(|d| !d.optional) {
                    let value = self.eval(&decl.value, env, virtual_depth + 1)?;
                    let merged = match fields.get(&decl.label) {
                        Some(existing) => unify(existing, &value),
                        None => value,
                    };
                    fields.insert(decl.label.clone(), merged);
                }
                Ok(Value::Struct(StructValue { fields }))
            }
            Expr::List { elems, tail } => {
                let elems = elems
                    .iter()
                    .map(|e| self.eval(e, env, virtual_depth))
                    .collect::<Result<Vec<_>, Incomplete>>()?;
                let tail = match tail {
                    Some(tail) => Some(Box::new(self.eval(tail, env, virtual_depth)?)),
                    None => None,
                };
                Ok(Value::List(ListValue { elems, tail }))
            }
        }
    }

    /// Resolves a reference, selector or index to a node where possible.
    fn locate(
        &self,
        expr: &Expr,
        env: Option<NodeId>,
        virtual_depth: usize,
    ) -> Result<Located, Incomplete> {
        match expr {
            Expr::Ref { depth, name } => {
                // References into literals evaluated as values cannot be resolved.
                if *depth < virtual_depth {
                    return Err(Incomplete);
                }
                let scope = env
                    .and_then(|env| self.scope(env, depth - virtual_depth))
                    .ok_or(Incomplete)?;
                self.struct_field(scope, name)
                    .map(Located::Node)
                    .ok_or(Incomplete)
            }
            Expr::Select(base, name) => match self.locate(base, env, virtual_depth)? {
                Located::Node(id) => match &self.nodes[id].shape {
                    Shape::Struct(s) => match s.fields.get(name) {
                        Some(child) => Ok(Located::Node(*child)),
                        None if s
                            .allowed
                            .as_ref()
                            .is_some_and(|a| !a.iter().any(|n| n == name)) =>
                        {
                            Ok(Located::Value(Value::bottom(format!(
                                "undefined field: {}",
                                name
                            ))))
                        }
                        None => Err(Incomplete),
                    },
                    Shape::List(_) => Ok(Located::Value(Value::bottom(format!(
                        "invalid selector {} on list",
                        name
                    )))),
                    Shape::Undetermined => {
                        let value = self.node_value(id)?;
                        select_value(value, name).map(Located::Value)
                    }
                },
                Located::Value(value) => select_value(value, name).map(Located::Value),
            },
            Expr::Index(base, index) => {
                let index = match self.eval(index, env, virtual_depth)? {
                    Value::Int(i) => i,
                    other if !other.is_concrete() => return Err(Incomplete),
                    other => {
                        return Ok(Located::Value(Value::bottom(format!(
                            "invalid index {}",
                            other
                        ))))
                    }
                };
                match self.locate(base, env, virtual_depth)? {
                    Located::Node(id) => match &self.nodes[id].shape {
                        Shape::List(l) => {
                            let found = usize::try_from(index)
                                .ok()
                                .and_then(|i| l.elems.get(i).copied());
                            match found {
                                Some(child) => Ok(Located::Node(child)),
                                None if index < 0
                                    || l.closed_len.is_some_and(|n| index as usize >= n) =>
                                {
                                    Ok(Located::Value(out_of_range(index)))
                                }
                                None => Err(Incomplete),
                            }
                        }
                        Shape::Struct(_) => Ok(Located::Value(Value::bottom(format!(
                            "invalid index {} on struct",
                            index
                        )))),
                        Shape::Undetermined => {
                            let value = self.node_value(id)?;
                            index_value(value, index).map(Located::Value)
                        }
                    },
                    Located::Value(value) => index_value(value, index).map(Located::Value),
                }
            }
            other => Ok(Located::Value(self.eval(other, env, virtual_depth)?)),
        }
    }

    /// Walks `steps` enclosing scopes out from `id`, skipping list nodes.
    fn scope(&self, mut id: NodeId, steps: usize) -> Option<NodeId> {
        for _ in 0..steps {
            id = self.nodes[id].parent?;
            while matches!(self.nodes[id].shape, Shape::List(_)) {
                id = self.nodes[id].parent?;
            }
        }
        Some(id)
    }

    fn struct_field(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[id].shape {
            Shape::Struct(s) => s.fields.get(name).copied(),
            _ => None,
        }
    }

    /// The current value of a node as seen by a reference.
    ///
    /// Bottom is reported as incomplete so that a conflict is reported once,
    /// where it happens.
    fn node_value(&self, id: NodeId) -> EvalResult {
        let node = &self.nodes[id];
        if node.value.is_bottom() {
            return Err(Incomplete);
        }
        match node.shape {
            Shape::Undetermined => Ok(node.value.clone()),
            _ => Ok(self.snapshot(id)),
        }
    }

    fn snapshot(&self, id: NodeId) -> Value {
        let node = &self.nodes[id];
        match &node.shape {
            Shape::Undetermined => node.value.clone(),
            Shape::Struct(s) => {
                if !s.settled && s.allowed.is_none() {
                    return Value::kind_of(Kind::STRUCT);
                }
                let mut fields = IndexMap::new();
                for (name, child) in &s.fields {
                    let value = self.snapshot(*child);
                    if !value.is_concrete() && self.nodes[*child].may_be_absent() {
                        continue;
                    }
                    fields.insert(name.clone(), value);
                }
                Value::Struct(StructValue { fields })
            }
            Shape::List(l) => Value::List(ListValue {
                elems: l.elems.iter().map(|child| self.snapshot(*child)).collect(),
                tail: match l.closed_len {
                    Some(_) => None,
                    None => Some(Box::new(Value::top())),
                },
            }),
        }
    }

    fn eval_builtin(
        &self,
        builtin: Builtin,
        args: &[Expr],
        env: Option<NodeId>,
        virtual_depth: usize,
    ) -> EvalResult {
        match builtin {
            Builtin::Len => {
                let [arg] = args else {
                    return Ok(Value::bottom("len takes one argument"));
                };
                let value = match self.locate(arg, env, virtual_depth)? {
                    Located::Node(id) => match &self.nodes[id].shape {
                        Shape::List(l) => {
                            return match l.closed_len {
                                Some(len) => Ok(Value::Int(len as i64)),
                                None => Err(Incomplete),
                            }
                        }
                        _ => self.node_value(id)?,
                    },
                    Located::Value(value) => value,
                };
                length(&value)
            }
            Builtin::Div | Builtin::Mod => {
                let [lhs, rhs] = args else {
                    return Ok(Value::bottom(format!("{} takes two arguments", builtin.name())));
                };
                let lhs = self.eval(lhs, env, virtual_depth)?;
                let rhs = self.eval(rhs, env, virtual_depth)?;
                ops::integer_division(builtin, &lhs, &rhs)
            }
        }
    }

    fn path(&self, mut id: NodeId) -> Path {
        let mut segments = Vec::new();
        while let Some(parent) = self.nodes[id].parent {
            if let Some(segment) = &self.nodes[id].segment {
                segments.push(segment.clone());
            }
            id = parent;
        }
        segments.into_iter().rev().collect()
    }
}

fn select_value(value: Value, name: &str) -> Result<Value, Incomplete> {
    match value {
        Value::Struct(mut s) => s.fields.swap_remove(name).ok_or(Incomplete),
        Value::Bottom(_) => Err(Incomplete),
        other if other.is_atom() || other.is_composite() => Ok(Value::bottom(format!(
            "invalid selector {} on {}",
            name,
            other.kind()
        ))),
        _ => Err(Incomplete),
    }
}

fn index_value(value: Value, index: i64) -> Result<Value, Incomplete> {
    match value {
        Value::List(l) => {
            let found = usize::try_from(index).ok().and_then(|i| l.elem(i).cloned());
            match found {
                Some(elem) => Ok(elem),
                None => Ok(out_of_range(index)),
            }
        }
        Value::Bottom(_) => Err(Incomplete),
        other if other.is_atom() || other.is_composite() => Ok(Value::bottom(format!(
            "invalid index {} on {}",
            index,
            other.kind()
        ))),
        _ => Err(Incomplete),
    }
}

fn out_of_range(index: i64) -> Value {
    Value::bottom(format!("index {} out of range", index))
}

fn length(value: &Value) -> EvalResult {
    match value {
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(l) if l.tail.is_none() => Ok(Value::Int(l.elems.len() as i64)),
        Value::Struct(s) => Ok(Value::Int(s.fields.len() as i64)),
        other if other.is_atom() => Ok(Value::bottom(format!("invalid argument {} to len", other))),
        _ => Err(Incomplete),
    }
}
