//! Access to the compiler output captured for one compilation.

use std::collections::BTreeMap;

use irmatch_dsl::CompilePhase;

/// Captured IR dumps of one compilation, keyed by phase.
pub trait Compilation {
    /// Whether any text was captured for `phase`.
    fn has_output(&self, phase: CompilePhase) -> bool;

    /// The dump for `phase`. Only called when [`Compilation::has_output`]
    /// returned true.
    fn output(&self, phase: CompilePhase) -> &str;
}

/// In-memory [`Compilation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedCompilation {
    outputs: BTreeMap<CompilePhase, String>,
}

impl CapturedCompilation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, phase: CompilePhase, text: impl Into<String>) -> Self {
        self.insert(phase, text);
        self
    }

    /// Record the dump of `phase`, appending to any text already captured
    /// for it. A phase can be dumped several times in one compilation.
    pub fn insert(&mut self, phase: CompilePhase, text: impl Into<String>) {
        let text = text.into();
        self.outputs
            .entry(phase)
            .and_modify(|existing| {
                if !existing.ends_with('\n') {
                    existing.push('\n');
                }
                existing.push_str(&text);
            })
            .or_insert(text);
    }

    pub fn phases(&self) -> impl Iterator<Item = CompilePhase> + '_ {
        self.outputs.keys().copied()
    }
}

impl Compilation for CapturedCompilation {
    fn has_output(&self, phase: CompilePhase) -> bool {
        self.outputs.contains_key(&phase)
    }

    fn output(&self, phase: CompilePhase) -> &str {
        self.outputs.get(&phase).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_phase_has_no_output() {
        let c = CapturedCompilation::new().with_output(CompilePhase::FinalCode, "x");
        assert!(c.has_output(CompilePhase::FinalCode));
        assert!(!c.has_output(CompilePhase::PrintIdeal));
        assert_eq!(c.output(CompilePhase::PrintIdeal), "");
    }

    #[test]
    fn empty_dump_still_counts_as_output() {
        let c = CapturedCompilation::new().with_output(CompilePhase::AfterParsing, "");
        assert!(c.has_output(CompilePhase::AfterParsing));
    }

    #[test]
    fn repeated_dumps_are_concatenated() {
        let mut c = CapturedCompilation::new();
        c.insert(CompilePhase::PrintIdeal, "first");
        c.insert(CompilePhase::PrintIdeal, "second\n");
        assert_eq!(c.output(CompilePhase::PrintIdeal), "first\nsecond\n");
        assert_eq!(c.phases().collect::<Vec<_>>(), vec![CompilePhase::PrintIdeal]);
    }
}
