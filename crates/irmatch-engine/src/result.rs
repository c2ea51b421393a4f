use serde::Serialize;
use std::fmt;

use irmatch_dsl::CompilePhase;

/// Which check attribute of a phase rule produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckAttribute {
    FailOn,
    Counts,
}

impl fmt::Display for CheckAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckAttribute::FailOn => write!(f, "failOn"),
            CheckAttribute::Counts => write!(f, "counts"),
        }
    }
}

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub attribute: CheckAttribute,
    /// 1-based position in the declaring list.
    pub constraint_index: usize,
    pub node: String,
    pub pattern: String,
    pub observed: u64,
    /// Relation the count had to satisfy, e.g. `=1` or `>=1,<=3`.
    pub expected: String,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attribute {
            CheckAttribute::FailOn => write!(
                f,
                "{} constraint {}: forbidden node \"{}\" matched {} time(s) (pattern: {})",
                self.attribute, self.constraint_index, self.node, self.observed, self.pattern
            ),
            CheckAttribute::Counts => write!(
                f,
                "{} constraint {}: node \"{}\" found {} time(s), expected {} (pattern: {})",
                self.attribute,
                self.constraint_index,
                self.node,
                self.observed,
                self.expected,
                self.pattern
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "failures", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Pass,
    Fail(Vec<CheckFailure>),
    /// No output was captured for the phase. Always a failure, but never a
    /// mismatch.
    PhaseAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseResult {
    pub phase: CompilePhase,
    pub outcome: PhaseOutcome,
}

impl PhaseResult {
    pub fn is_pass(&self) -> bool {
        self.outcome == PhaseOutcome::Pass
    }

    pub fn failures(&self) -> &[CheckFailure] {
        match &self.outcome {
            PhaseOutcome::Fail(failures) => failures,
            _ => &[],
        }
    }
}

impl fmt::Display for PhaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            PhaseOutcome::Pass => write!(f, "{}: pass", self.phase),
            PhaseOutcome::PhaseAbsent => write!(
                f,
                "{}: no compilation output captured for this phase",
                self.phase
            ),
            PhaseOutcome::Fail(failures) => {
                write!(f, "{}: {} failure(s)", self.phase, failures.len())?;
                for failure in failures {
                    write!(f, "\n  - {failure}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "phases", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// An `apply_if` condition does not hold under the current VM flags.
    NotApplicable,
    Evaluated(Vec<PhaseResult>),
}

/// Result of checking one IR rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    /// 1-based position of the rule in its declaration list.
    pub rule_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub outcome: RuleOutcome,
}

impl RuleReport {
    pub fn phases(&self) -> &[PhaseResult] {
        match &self.outcome {
            RuleOutcome::NotApplicable => &[],
            RuleOutcome::Evaluated(phases) => phases,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.phases().iter().any(|p| !p.is_pass())
    }

    pub fn failed_phases(&self) -> impl Iterator<Item = &PhaseResult> {
        self.phases().iter().filter(|p| !p.is_pass())
    }
}

impl fmt::Display for RuleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IR rule {}", self.rule_index)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        match &self.outcome {
            RuleOutcome::NotApplicable => write!(f, ": not applicable"),
            RuleOutcome::Evaluated(_) if !self.is_failure() => write!(f, ": PASS"),
            RuleOutcome::Evaluated(_) => {
                write!(f, ": FAIL")?;
                for phase in self.failed_phases() {
                    write!(f, "\n  {}", phase.to_string().replace('\n', "\n  "))?;
                }
                Ok(())
            }
        }
    }
}
