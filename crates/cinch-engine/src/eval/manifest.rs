//! Classification of an evaluated graph.

use indexmap::IndexMap;
use tracing::debug;

use cinch_core::{StructValue, Value};

use super::node::{NodeId, Shape, ROOT};
use super::Evaluator;
use crate::result::{BoundResult, Issue};

impl Evaluator {
    /// Runs evaluation to completion and classifies the result.
    pub fn evaluate(mut self) -> BoundResult {
        self.run_fixpoint();
        let mut default_rounds = 0;
        while default_rounds < self.config.max_default_rounds && self.apply_defaults() {
            default_rounds += 1;
            self.run_fixpoint();
        }

        let conflicts = self.conflicts();
        if !conflicts.is_empty() {
            debug!(
                iterations = self.iterations,
                default_rounds,
                conflicts = conflicts.len(),
                "evaluation conflicting"
            );
            return BoundResult::conflicting(conflicts);
        }

        let mut issues = Vec::new();
        let value = self.manifest(ROOT, &mut issues);
        debug!(
            iterations = self.iterations,
            default_rounds,
            nodes = self.nodes.len(),
            incomplete = issues.len(),
            "evaluation finished"
        );
        if issues.is_empty() {
            BoundResult::concrete(value)
        } else {
            BoundResult::incomplete(value, issues)
        }
    }

    fn conflicts(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            let path = self.path(id);
            if let Value::Bottom(conflict) = &node.value {
                let conflict = conflict.clone().at(&path);
                issues.push(Issue::conflict(conflict.path, conflict.message));
            }
            for message in &node.conflicts {
                issues.push(Issue::conflict(path.clone(), message.clone()));
            }
        }
        issues
    }

    /// Builds the value of a node, leaving out absent nodes.
    ///
    /// A nullable or optional node that no host data or extra constraint
    /// reached is absent when it is not concrete. Open lists and maps
    /// without data count as not concrete here.
    fn manifest(&self, id: NodeId, issues: &mut Vec<Issue>) -> Option<Value> {
        let node = &self.nodes[id];
        let mut local = Vec::new();
        let mut unsettled = false;

        if node.pending {
            local.push(Issue::incomplete(
                self.path(id),
                "constraint refers to an incomplete value",
            ));
        }

        let value = match &node.shape {
            Shape::Undetermined if node.value.is_concrete() => Some(node.value.clone()),
            Shape::Undetermined => {
                if !node.pending {
                    local.push(Issue::incomplete(
                        self.path(id),
                        format!("incomplete value {}", node.value),
                    ));
                }
                None
            }
            Shape::Struct(s) => {
                unsettled = !s.settled && s.allowed.is_none();
                let mut fields = IndexMap::new();
                for (name, child) in &s.fields {
                    if let Some(value) = self.manifest(*child, &mut local) {
                        fields.insert(name.clone(), value);
                    }
                }
                Some(Value::Struct(StructValue { fields }))
            }
            Shape::List(l) => {
                unsettled = l.closed_len.is_none();
                let elems = l
                    .elems
                    .iter()
                    .map(|child| self.manifest(*child, &mut local).unwrap_or(Value::Null))
                    .collect();
                Some(Value::list(elems))
            }
        };

        if id != ROOT && node.may_be_absent() && (unsettled || !local.is_empty()) {
            return None;
        }
        issues.append(&mut local);
        value
    }
}
