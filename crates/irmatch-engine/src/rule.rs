use std::sync::Arc;

use rayon::prelude::*;

use irmatch_dsl::CompilePhase;

use crate::matcher::{Counts, FailOn};
use crate::result::{PhaseOutcome, PhaseResult};

/// Checks of one IR rule for one compile phase.
#[derive(Debug, Clone)]
pub enum PhaseRule {
    Checked {
        phase: CompilePhase,
        fail_on: Option<FailOn>,
        counts: Option<Counts>,
        output: Arc<str>,
    },
    /// The compiler produced no output for `phase`.
    Absent { phase: CompilePhase },
}

impl PhaseRule {
    pub fn phase(&self) -> CompilePhase {
        match self {
            PhaseRule::Checked { phase, .. } | PhaseRule::Absent { phase } => *phase,
        }
    }

    pub fn evaluate(&self) -> PhaseResult {
        let outcome = match self {
            PhaseRule::Absent { .. } => PhaseOutcome::PhaseAbsent,
            PhaseRule::Checked {
                fail_on,
                counts,
                output,
                ..
            } => {
                let mut failures = Vec::new();
                if let Some(fail_on) = fail_on {
                    failures.extend(fail_on.check(output));
                }
                if let Some(counts) = counts {
                    failures.extend(counts.check(output));
                }
                if failures.is_empty() {
                    PhaseOutcome::Pass
                } else {
                    PhaseOutcome::Fail(failures)
                }
            }
        };
        PhaseResult {
            phase: self.phase(),
            outcome,
        }
    }
}

/// Evaluate `rules` in order.
pub fn evaluate(rules: &[PhaseRule]) -> Vec<PhaseResult> {
    rules.iter().map(PhaseRule::evaluate).collect()
}

/// Evaluate `rules` across the rayon pool. Results keep the order of
/// `rules`.
pub fn evaluate_parallel(rules: &[PhaseRule]) -> Vec<PhaseResult> {
    rules.par_iter().map(PhaseRule::evaluate).collect()
}
