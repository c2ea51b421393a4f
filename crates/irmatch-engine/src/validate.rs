//! Consistency checks over the raw constraints of one IR rule, run before any
//! phase is resolved or any compiler output is looked at.

use std::collections::{BTreeMap, BTreeSet};

use miette::Diagnostic;
use thiserror::Error;

use irmatch_dsl::ast::RawConstraint;

use crate::bitvec::CountBitVector;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidationError {
    #[error(
        "Redundant constraints: node \"{node}\" has an equality constraint that already \
         fully specifies the expected count; additional constraints are not allowed \
         (offending constraint: `{constraint}`)"
    )]
    #[diagnostic(code(irmatch::declaration::redundant))]
    Redundant { node: String, constraint: String },

    #[error(
        "Incompatible constraints: node \"{node}\" has counts constraints that cannot be \
         satisfied (offending constraint: `{constraint}`)"
    )]
    #[diagnostic(code(irmatch::declaration::incompatible))]
    Incompatible { node: String, constraint: String },

    #[error(
        "Incompatible constraints: node \"{node}\" is in failOn but counts requires it to \
         appear (offending constraint: `{constraint}`)"
    )]
    #[diagnostic(code(irmatch::declaration::fail_on_contradiction))]
    FailOnContradiction { node: String, constraint: String },
}

impl ValidationError {
    pub fn node(&self) -> &str {
        match self {
            ValidationError::Redundant { node, .. }
            | ValidationError::Incompatible { node, .. }
            | ValidationError::FailOnContradiction { node, .. } => node,
        }
    }
}

/// Running state for one node identifier while folding over counts entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAccumulator {
    /// Some entry for this node pins the count with `=`.
    pub has_equality: bool,
    /// Counts still permitted by every entry seen so far.
    pub permitted: CountBitVector,
}

/// Validate all fail-on and counts constraints of one rule, regardless of
/// the phases they target.
///
/// Returns the per-node accumulators on success. Errors are raised for the
/// first offending counts entry in declaration order:
/// * a node with an equality may carry no further counts entry (and an
///   equality entry may not carry further relations);
/// * the intersection of a node's counts entries must permit some count;
/// * a node in fail-on must still permit zero occurrences.
pub fn validate_constraints(
    fail_on: &[RawConstraint],
    counts: &[RawConstraint],
) -> Result<BTreeMap<String, NodeAccumulator>, ValidationError> {
    let fail_on_nodes: BTreeSet<&str> = fail_on.iter().map(|c| c.node.as_str()).collect();

    counts.iter().try_fold(BTreeMap::new(), |mut nodes, constraint| {
        let node = constraint.node.as_str();
        let equality = constraint.is_equality();
        let vector = CountBitVector::from_relations(constraint.relations());

        let redundant = || ValidationError::Redundant {
            node: node.to_string(),
            constraint: constraint.to_string(),
        };
        if equality && constraint.relations().len() > 1 {
            return Err(redundant());
        }

        let merged = match nodes.get(node) {
            Some(NodeAccumulator { has_equality, .. }) if *has_equality || equality => {
                return Err(redundant());
            }
            Some(prev) => NodeAccumulator {
                has_equality: false,
                permitted: prev.permitted.intersect(vector),
            },
            None => NodeAccumulator {
                has_equality: equality,
                permitted: CountBitVector::ALL.intersect(vector),
            },
        };

        if merged.permitted.is_empty() {
            return Err(ValidationError::Incompatible {
                node: node.to_string(),
                constraint: constraint.to_string(),
            });
        }
        if fail_on_nodes.contains(node) && !merged.permitted.permits_zero() {
            return Err(ValidationError::FailOnContradiction {
                node: node.to_string(),
                constraint: constraint.to_string(),
            });
        }

        nodes.insert(node.to_string(), merged);
        Ok(nodes)
    })
}
