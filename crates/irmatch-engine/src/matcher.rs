//! The two check attributes of a phase rule.

use crate::constraint::Constraint;
use crate::result::{CheckAttribute, CheckFailure};

fn failure(attribute: CheckAttribute, constraint: &Constraint, observed: u64) -> CheckFailure {
    CheckFailure {
        attribute,
        constraint_index: constraint.index,
        node: constraint.node.clone(),
        pattern: constraint.pattern.to_string(),
        observed,
        expected: constraint.expected(),
    }
}

fn occurrences(constraint: &Constraint, text: &str) -> u64 {
    constraint.pattern.count(text) as u64
}

/// Nodes that must not occur in the phase output.
#[derive(Debug, Clone)]
pub struct FailOn {
    constraints: Vec<Constraint>,
}

impl FailOn {
    /// `None` when there is nothing to check.
    pub fn new(constraints: Vec<Constraint>) -> Option<Self> {
        (!constraints.is_empty()).then_some(Self { constraints })
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn check(&self, text: &str) -> Vec<CheckFailure> {
        self.constraints
            .iter()
            .filter_map(|c| {
                let observed = occurrences(c, text);
                (observed > 0).then(|| failure(CheckAttribute::FailOn, c, observed))
            })
            .collect()
    }
}

/// Nodes whose occurrence count is bounded.
#[derive(Debug, Clone)]
pub struct Counts {
    constraints: Vec<Constraint>,
}

impl Counts {
    /// `None` when there is nothing to check.
    pub fn new(constraints: Vec<Constraint>) -> Option<Self> {
        (!constraints.is_empty()).then_some(Self { constraints })
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn check(&self, text: &str) -> Vec<CheckFailure> {
        self.constraints
            .iter()
            .filter_map(|c| {
                let observed = occurrences(c, text);
                (!c.accepts(observed)).then(|| failure(CheckAttribute::Counts, c, observed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NodeEntry, NodeRegistry};
    use irmatch_dsl::{parse_counts, parse_fail_on, CompilePhase};

    const FINAL_CODE: &str = "\
000   B1: #\tout( B2 ) <- BLOCK HEAD IS JUNK  Freq: 1
000   # stack bang (96 bytes)
00c   compI_rReg rax, rsi\t# int
010   compI_rReg_imm rax, #3
014   compI_rReg rax, rdx\t# int
018   ret
";

    fn resolve(list: Vec<irmatch_dsl::ast::RawConstraint>) -> Vec<Constraint> {
        let registry = NodeRegistry::new([
            NodeEntry::new("compI_rReg"),
            NodeEntry::new("RET").with_regex(r"(?m)^\S+\s+ret$"),
            NodeEntry::new("CALL"),
        ])
        .unwrap();
        list.iter()
            .enumerate()
            .map(|(i, raw)| Constraint::resolve(raw, i + 1, CompilePhase::FinalCode, &registry).unwrap())
            .collect()
    }

    fn counts(src: &str) -> Counts {
        Counts::new(resolve(parse_counts(src).unwrap())).unwrap()
    }

    #[test]
    fn equality_mismatch_reports_observed_and_expected() {
        let failures = counts("compI_rReg = 1").check(FINAL_CODE);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].observed, 2);
        assert_eq!(failures[0].expected, "=1");
        assert_eq!(failures[0].attribute, CheckAttribute::Counts);
    }

    #[test]
    fn exact_count_passes() {
        assert!(counts("compI_rReg = 2").check(FINAL_CODE).is_empty());
        assert!(counts("compI_rReg 2").check(FINAL_CODE).is_empty());
    }

    #[test]
    fn all_relations_must_hold() {
        assert!(counts("compI_rReg >= 1 <= 3").check(FINAL_CODE).is_empty());
        let failures = counts("compI_rReg >= 3 <= 5").check(FINAL_CODE);
        assert_eq!(failures[0].expected, ">=3,<=5");
    }

    #[test]
    fn failures_carry_constraint_positions() {
        let failures = counts("RET = 1, CALL >= 1, compI_rReg < 2").check(FINAL_CODE);
        let indices: Vec<usize> = failures.iter().map(|f| f.constraint_index).collect();
        assert_eq!(indices, vec![2, 3]);
    }

    #[test]
    fn fail_on_reports_matches() {
        let fail_on = FailOn::new(resolve(parse_fail_on("CALL, compI_rReg").unwrap())).unwrap();
        let failures = fail_on.check(FINAL_CODE);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].node, "compI_rReg");
        assert_eq!(failures[0].observed, 2);
        assert_eq!(failures[0].expected, "=0");
        assert_eq!(failures[0].constraint_index, 2);
    }

    #[test]
    fn empty_attributes_are_not_built() {
        assert!(FailOn::new(Vec::new()).is_none());
        assert!(Counts::new(Vec::new()).is_none());
    }
}
