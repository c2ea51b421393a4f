//! Raw constraints bound to one concrete phase.

use std::fmt;

use irmatch_dsl::ast::{ConstraintKind, RawConstraint, Relation};
use irmatch_dsl::CompilePhase;

use crate::catalog::{NodeCatalog, NodePattern, ResolveError};

/// A fail-on or counts entry resolved to `phase`, with the pattern the node
/// identifier is searched by in that phase's dump.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// 1-based position in the declaring list.
    pub index: usize,
    pub node: String,
    pub phase: CompilePhase,
    pub pattern: NodePattern,
    /// Empty for fail-on entries.
    pub relations: Vec<Relation>,
}

impl Constraint {
    pub fn resolve(
        raw: &RawConstraint,
        index: usize,
        phase: CompilePhase,
        catalog: &dyn NodeCatalog,
    ) -> Result<Self, ResolveError> {
        let pattern = catalog.pattern(&raw.node, phase)?;
        let relations = match &raw.kind {
            ConstraintKind::FailOn => Vec::new(),
            ConstraintKind::Counts(relations) => relations.clone(),
        };
        Ok(Self {
            index,
            node: raw.node.clone(),
            phase,
            pattern,
            relations,
        })
    }

    /// Whether `observed` satisfies every relation.
    pub fn accepts(&self, observed: u64) -> bool {
        self.relations.iter().all(|r| r.holds(observed))
    }

    /// `=1`, `>=1,<=3`; fail-on entries expect `=0`.
    pub fn expected(&self) -> String {
        if self.relations.is_empty() {
            return "=0".to_string();
        }
        self.relations
            .iter()
            .map(Relation::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.phase, self.node)?;
        for relation in &self.relations {
            write!(f, " {relation}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NodeEntry, NodeRegistry};
    use irmatch_dsl::{parse_counts, OutputClass};

    #[test]
    fn resolves_counts_entry() {
        let registry =
            NodeRegistry::new([NodeEntry::new("LOAD").with_class(OutputClass::Ideal)]).unwrap();
        let raw = &parse_counts("LOAD >= 1 <= 3").unwrap()[0];
        let c = Constraint::resolve(raw, 1, CompilePhase::PrintIdeal, &registry).unwrap();
        assert_eq!(c.expected(), ">=1,<=3");
        assert_eq!(c.to_string(), "PRINT_IDEAL:LOAD >=1 <=3");
        assert!(c.accepts(2));
        assert!(!c.accepts(0));
        assert!(!c.accepts(4));
    }

    #[test]
    fn resolution_error_is_propagated() {
        let registry =
            NodeRegistry::new([NodeEntry::new("LOAD").with_class(OutputClass::Ideal)]).unwrap();
        let raw = &parse_counts("LOAD = 1").unwrap()[0];
        let err = Constraint::resolve(raw, 1, CompilePhase::FinalCode, &registry).unwrap_err();
        assert!(matches!(err, ResolveError::UndefinedInPhase { .. }));
    }
}
