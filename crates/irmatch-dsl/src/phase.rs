//! Compile phases a compiler can dump IR for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of dump a phase produces. Node identifiers are only defined for
/// the output classes they are registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputClass {
    /// Ideal graph dumps (platform-independent nodes).
    Ideal,
    /// Machine node dumps (after matching, platform-specific nodes).
    Mach,
}

/// One stage of the compiler's optimization pipeline.
///
/// Variants are declared in pipeline order; the derived `Ord` is the order
/// phase rules are enumerated and reported in. `Default` is a placeholder
/// resolved per node identifier and never names a captured dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompilePhase {
    Default,
    BeforeStringopts,
    AfterStringopts,
    AfterParsing,
    IterGvn1,
    PhaseIdealLoop1,
    PhaseIdealLoop2,
    PhaseIdealLoop3,
    Ccp1,
    IterGvn2,
    BeforeMacroExpansion,
    AfterMacroExpansion,
    BeforeMatching,
    Matching,
    GlobalCodeMotion,
    FinalCode,
    PrintIdeal,
    PrintOptoAssembly,
}

impl CompilePhase {
    /// Every phase, in ascending order.
    pub const ALL: [CompilePhase; 18] = [
        CompilePhase::Default,
        CompilePhase::BeforeStringopts,
        CompilePhase::AfterStringopts,
        CompilePhase::AfterParsing,
        CompilePhase::IterGvn1,
        CompilePhase::PhaseIdealLoop1,
        CompilePhase::PhaseIdealLoop2,
        CompilePhase::PhaseIdealLoop3,
        CompilePhase::Ccp1,
        CompilePhase::IterGvn2,
        CompilePhase::BeforeMacroExpansion,
        CompilePhase::AfterMacroExpansion,
        CompilePhase::BeforeMatching,
        CompilePhase::Matching,
        CompilePhase::GlobalCodeMotion,
        CompilePhase::FinalCode,
        CompilePhase::PrintIdeal,
        CompilePhase::PrintOptoAssembly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompilePhase::Default => "DEFAULT",
            CompilePhase::BeforeStringopts => "BEFORE_STRINGOPTS",
            CompilePhase::AfterStringopts => "AFTER_STRINGOPTS",
            CompilePhase::AfterParsing => "AFTER_PARSING",
            CompilePhase::IterGvn1 => "ITER_GVN1",
            CompilePhase::PhaseIdealLoop1 => "PHASE_IDEAL_LOOP1",
            CompilePhase::PhaseIdealLoop2 => "PHASE_IDEAL_LOOP2",
            CompilePhase::PhaseIdealLoop3 => "PHASE_IDEAL_LOOP3",
            CompilePhase::Ccp1 => "CCP1",
            CompilePhase::IterGvn2 => "ITER_GVN2",
            CompilePhase::BeforeMacroExpansion => "BEFORE_MACRO_EXPANSION",
            CompilePhase::AfterMacroExpansion => "AFTER_MACRO_EXPANSION",
            CompilePhase::BeforeMatching => "BEFORE_MATCHING",
            CompilePhase::Matching => "MATCHING",
            CompilePhase::GlobalCodeMotion => "GLOBAL_CODE_MOTION",
            CompilePhase::FinalCode => "FINAL_CODE",
            CompilePhase::PrintIdeal => "PRINT_IDEAL",
            CompilePhase::PrintOptoAssembly => "PRINT_OPTO_ASSEMBLY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|phase| phase.name() == name)
    }

    pub fn is_default(self) -> bool {
        self == CompilePhase::Default
    }

    /// Output class of the dump this phase produces; `None` for the placeholder.
    pub fn output_class(self) -> Option<OutputClass> {
        match self {
            CompilePhase::Default => None,
            CompilePhase::Matching
            | CompilePhase::GlobalCodeMotion
            | CompilePhase::FinalCode
            | CompilePhase::PrintOptoAssembly => Some(OutputClass::Mach),
            _ => Some(OutputClass::Ideal),
        }
    }
}

impl fmt::Display for CompilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a phase name that is not part of [`CompilePhase::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown compile phase '{0}'")]
pub struct UnknownPhaseName(pub String);

impl FromStr for CompilePhase {
    type Err = UnknownPhaseName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s.trim()).ok_or_else(|| UnknownPhaseName(s.to_string()))
    }
}
