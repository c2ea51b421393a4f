use std::sync::Arc;

use tracing::{debug, warn};

use crate::compilation::Compilation;
use crate::matcher::{Counts, FailOn};
use crate::resolve::PhaseBuckets;
use crate::rule::PhaseRule;

/// Turn resolved buckets into phase rules, in ascending phase order.
///
/// Empty buckets produce no rule. A phase the compilation has no output for
/// produces [`PhaseRule::Absent`]; its text is never requested.
pub fn build_phase_rules(buckets: PhaseBuckets, compilation: &dyn Compilation) -> Vec<PhaseRule> {
    buckets
        .into_iter()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(phase, bucket)| {
            if !compilation.has_output(phase) {
                warn!("No compilation output captured for phase {phase}");
                return PhaseRule::Absent { phase };
            }
            debug!(
                "Built rule for phase {phase}: {} failOn, {} counts constraint(s)",
                bucket.fail_on.len(),
                bucket.counts.len()
            );
            PhaseRule::Checked {
                phase,
                fail_on: FailOn::new(bucket.fail_on),
                counts: Counts::new(bucket.counts),
                output: Arc::from(compilation.output(phase)),
            }
        })
        .collect()
}
