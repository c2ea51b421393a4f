#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use irmatch_dsl::errors::ParseError;
use irmatch_dsl::CompilePhase;

use crate::catalog::ResolveErrors;
use crate::validate::ValidationError;

/// Reason an IR rule declaration was rejected. Raised before any compiler
/// output is looked at.
#[derive(Debug, Error, Diagnostic)]
pub enum DeclarationError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveErrors),

    #[error("Cannot specify a compile phase twice: {phase}")]
    #[diagnostic(code(irmatch::declaration::duplicate_phase))]
    DuplicatePhase { phase: CompilePhase },

    #[error("DEFAULT cannot be combined with explicit compile phases ({phase})")]
    #[diagnostic(
        code(irmatch::declaration::mixed_default),
        help("either list only DEFAULT or only concrete phases")
    )]
    MixedDefaultPhase { phase: CompilePhase },

    #[error(
        "Constraint on node \"{node}\" targets {phase}, which is not one of the rule's phases"
    )]
    #[diagnostic(code(irmatch::declaration::prefix_outside_rule))]
    PrefixOutsideRule { node: String, phase: CompilePhase },

    #[error("IR rule has neither failOn nor counts constraints")]
    #[diagnostic(code(irmatch::declaration::empty_rule))]
    EmptyRule,

    #[error("applyIf names unknown VM flag \"{flag}\"")]
    #[diagnostic(code(irmatch::declaration::unknown_flag))]
    UnknownFlag { flag: String },
}

/// A [`DeclarationError`] tagged with the rule it belongs to.
#[derive(Debug, Error, Diagnostic)]
#[error("IR rule {rule_index}{}: {error}", rule_label(.name))]
#[diagnostic(code(irmatch::declaration::rule))]
pub struct RuleError {
    pub rule_index: usize,
    pub name: Option<String>,
    #[source]
    #[diagnostic_source]
    pub error: DeclarationError,
}

fn rule_label(name: &Option<String>) -> String {
    name.as_ref().map(|n| format!(" ({n})")).unwrap_or_default()
}

/// Every rejected declaration of a rule list.
#[derive(Debug, Error, Diagnostic)]
#[error("{}", format_rule_errors(.errors))]
#[diagnostic(code(irmatch::declaration::multiple))]
pub struct RuleErrors {
    #[related]
    pub errors: Vec<RuleError>,
}

fn format_rule_errors(errors: &[RuleError]) -> String {
    if errors.len() == 1 {
        return errors[0].to_string();
    }
    let mut s = format!("{} invalid IR rules:\n", errors.len());
    for (i, e) in errors.iter().enumerate() {
        s.push_str(&format!("  {}. {}\n", i + 1, e));
    }
    s
}
