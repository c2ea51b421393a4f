//! Partitioning of a rule's constraints into per-phase buckets.
//!
//! Rules targeting `DEFAULT` send each unprefixed entry to its node's
//! default phase under the current VM configuration. Rules naming explicit
//! phases send each unprefixed entry to every one of them. In both cases a
//! `PHASE:` prefix on an entry overrides where it goes.

use std::collections::{BTreeMap, BTreeSet};

use irmatch_dsl::ast::{RawConstraint, RawDeclaration};
use irmatch_dsl::CompilePhase;

use crate::catalog::{NodeCatalog, ResolveError, ResolveErrors, VmInfo};
use crate::constraint::Constraint;

/// Resolved constraints targeting one phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseBucket {
    pub fail_on: Vec<Constraint>,
    pub counts: Vec<Constraint>,
}

impl PhaseBucket {
    pub fn is_empty(&self) -> bool {
        self.fail_on.is_empty() && self.counts.is_empty()
    }
}

/// Buckets in ascending phase order.
pub type PhaseBuckets = BTreeMap<CompilePhase, PhaseBucket>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum List {
    FailOn,
    Counts,
}

#[derive(Default)]
struct Partition {
    buckets: PhaseBuckets,
    errors: Vec<ResolveError>,
}

impl Partition {
    fn place(
        &mut self,
        list: List,
        raw: &RawConstraint,
        index: usize,
        phases: impl IntoIterator<Item = CompilePhase>,
        catalog: &dyn NodeCatalog,
    ) {
        for phase in phases {
            match Constraint::resolve(raw, index, phase, catalog) {
                Ok(constraint) => {
                    let bucket = self.buckets.entry(phase).or_default();
                    match list {
                        List::FailOn => bucket.fail_on.push(constraint),
                        List::Counts => bucket.counts.push(constraint),
                    }
                }
                Err(e) => self.error(e),
            }
        }
    }

    fn error(&mut self, error: ResolveError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    fn finish(self) -> Result<PhaseBuckets, ResolveErrors> {
        if self.errors.is_empty() {
            Ok(self.buckets)
        } else {
            Err(ResolveErrors {
                errors: self.errors,
            })
        }
    }
}

fn entries(decl: &RawDeclaration) -> impl Iterator<Item = (List, usize, &RawConstraint)> {
    let fail_on = decl
        .fail_on
        .iter()
        .enumerate()
        .map(|(i, c)| (List::FailOn, i + 1, c));
    let counts = decl
        .counts
        .iter()
        .enumerate()
        .map(|(i, c)| (List::Counts, i + 1, c));
    fail_on.chain(counts)
}

/// Resolve a rule whose phases are `DEFAULT`.
///
/// Every node without a default phase under `vm` is reported once; no
/// bucket is returned unless all entries resolve.
pub fn resolve_default_phases(
    decl: &RawDeclaration,
    vm: &dyn VmInfo,
    catalog: &dyn NodeCatalog,
) -> Result<PhaseBuckets, ResolveErrors> {
    let mut partition = Partition::default();
    for (list, index, raw) in entries(decl) {
        if let Some(prefix) = &raw.phases {
            partition.place(list, raw, index, prefix.iter().copied(), catalog);
            continue;
        }
        if !catalog.contains(&raw.node) {
            partition.error(ResolveError::UnknownNode {
                node: raw.node.clone(),
            });
            continue;
        }
        match vm.default_phase_for(&raw.node) {
            Some(phase) => partition.place(list, raw, index, [phase], catalog),
            None => partition.error(ResolveError::NoDefaultPhase {
                node: raw.node.clone(),
            }),
        }
    }
    partition.finish()
}

/// Resolve a rule naming `phases` explicitly.
///
/// Prefixed entries go to their prefix phases only; prefixes are expected to
/// have been checked against `phases` already and foreign phases are skipped.
pub fn resolve_explicit_phases(
    decl: &RawDeclaration,
    phases: &BTreeSet<CompilePhase>,
    catalog: &dyn NodeCatalog,
) -> Result<PhaseBuckets, ResolveErrors> {
    let mut partition = Partition::default();
    for (list, index, raw) in entries(decl) {
        let targets: Vec<CompilePhase> = match &raw.phases {
            Some(prefix) => prefix
                .iter()
                .copied()
                .filter(|p| phases.contains(p))
                .collect(),
            None => phases.iter().copied().collect(),
        };
        partition.place(list, raw, index, targets, catalog);
    }
    partition.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NodeEntry, NodeRegistry, VmConfig};
    use irmatch_dsl::{parse_declaration, OutputClass};

    fn registry() -> NodeRegistry {
        NodeRegistry::new([
            NodeEntry::new("compI_rReg")
                .with_class(OutputClass::Mach)
                .with_default(CompilePhase::FinalCode),
            NodeEntry::new("LOAD")
                .with_class(OutputClass::Ideal)
                .with_default(CompilePhase::PrintIdeal)
                .with_override("LoopOpts", "true", CompilePhase::AfterParsing),
            NodeEntry::new("STORE").with_class(OutputClass::Ideal),
        ])
        .unwrap()
    }

    fn phases_of(buckets: &PhaseBuckets) -> Vec<CompilePhase> {
        buckets.keys().copied().collect()
    }

    #[test]
    fn default_resolution_partitions_by_node() {
        let reg = registry();
        let vm = VmConfig::new(&reg);
        let decl = parse_declaration("compI_rReg", "LOAD = 2").unwrap();
        let buckets = resolve_default_phases(&decl, &vm, &vm).unwrap();
        assert_eq!(
            phases_of(&buckets),
            vec![CompilePhase::FinalCode, CompilePhase::PrintIdeal]
        );
        assert_eq!(buckets[&CompilePhase::FinalCode].fail_on.len(), 1);
        assert!(buckets[&CompilePhase::FinalCode].counts.is_empty());
        assert_eq!(buckets[&CompilePhase::PrintIdeal].counts[0].node, "LOAD");
    }

    #[test]
    fn configuration_moves_default_phase() {
        let reg = registry();
        let decl = parse_declaration("", "LOAD = 2").unwrap();
        let plain = VmConfig::new(&reg);
        let flagged = VmConfig::new(&reg).with_flag("LoopOpts", "true");
        let a = resolve_default_phases(&decl, &plain, &plain).unwrap();
        let b = resolve_default_phases(&decl, &flagged, &flagged).unwrap();
        assert_eq!(phases_of(&a), vec![CompilePhase::PrintIdeal]);
        assert_eq!(phases_of(&b), vec![CompilePhase::AfterParsing]);
    }

    #[test]
    fn prefix_overrides_default() {
        let reg = registry();
        let vm = VmConfig::new(&reg);
        let decl = parse_declaration("", "AFTER_PARSING|PRINT_IDEAL:STORE >= 1").unwrap();
        let buckets = resolve_default_phases(&decl, &vm, &vm).unwrap();
        assert_eq!(
            phases_of(&buckets),
            vec![CompilePhase::AfterParsing, CompilePhase::PrintIdeal]
        );
    }

    #[test]
    fn missing_defaults_are_reported_once_per_node() {
        let reg = registry();
        let vm = VmConfig::new(&reg);
        let decl = parse_declaration("STORE, NOPE", "STORE < 3, LOAD = 1").unwrap();
        let errs = resolve_default_phases(&decl, &vm, &vm).unwrap_err();
        assert_eq!(
            errs.errors,
            vec![
                ResolveError::NoDefaultPhase {
                    node: "STORE".into()
                },
                ResolveError::UnknownNode {
                    node: "NOPE".into()
                },
            ]
        );
        assert!(errs.to_string().starts_with("2 resolution errors:"));
    }

    #[test]
    fn explicit_phases_receive_unprefixed_entries() {
        let reg = registry();
        let decl = parse_declaration("", "LOAD >= 1, AFTER_PARSING:STORE = 0").unwrap();
        let phases = BTreeSet::from([CompilePhase::PrintIdeal, CompilePhase::AfterParsing]);
        let buckets = resolve_explicit_phases(&decl, &phases, &reg).unwrap();
        assert_eq!(buckets[&CompilePhase::AfterParsing].counts.len(), 2);
        assert_eq!(buckets[&CompilePhase::PrintIdeal].counts.len(), 1);
        assert_eq!(buckets[&CompilePhase::PrintIdeal].counts[0].index, 1);
        assert_eq!(buckets[&CompilePhase::AfterParsing].counts[1].index, 2);
    }

    #[test]
    fn explicit_phase_outside_node_class_is_an_error() {
        let reg = registry();
        let decl = parse_declaration("compI_rReg", "").unwrap();
        let phases = BTreeSet::from([CompilePhase::PrintIdeal, CompilePhase::FinalCode]);
        let errs = resolve_explicit_phases(&decl, &phases, &reg).unwrap_err();
        assert_eq!(
            errs.errors,
            vec![ResolveError::UndefinedInPhase {
                node: "compI_rReg".into(),
                phase: CompilePhase::PrintIdeal,
            }]
        );
    }
}
