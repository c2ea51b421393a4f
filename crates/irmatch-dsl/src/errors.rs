#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

/// Error raised while parsing a failOn or counts declaration string.
///
/// Every variant names the offending substring and carries the declaration
/// source so miette can underline it.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error in {list}: {message}")]
    #[diagnostic(code(irmatch::parse::syntax))]
    Syntax {
        list: String,
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Unknown comparator '{token}' for node \"{node}\"")]
    #[diagnostic(
        code(irmatch::parse::unknown_comparator),
        help("valid comparators are: = != < <= > >= (or eq, ne, lt, le, gt, ge)")
    )]
    UnknownComparator {
        token: String,
        node: String,
        #[label("unknown comparator")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Invalid bound '{token}' for node \"{node}\": expected a non-negative integer")]
    #[diagnostic(code(irmatch::parse::invalid_bound))]
    InvalidBound {
        token: String,
        node: String,
        #[label("not a count")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Comparator '{comparator}' for node \"{node}\" is missing its bound")]
    #[diagnostic(code(irmatch::parse::missing_bound))]
    MissingBound {
        comparator: String,
        node: String,
        #[label("bound expected after this")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Counts entry for node \"{node}\" has no comparator or bound")]
    #[diagnostic(
        code(irmatch::parse::missing_relation),
        help("write the expected count after the node, e.g. `LOAD = 1` or `LOAD >= 1`")
    )]
    MissingRelation {
        node: String,
        #[label("count expected")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Unknown compile phase '{name}'")]
    #[diagnostic(code(irmatch::parse::unknown_phase))]
    UnknownPhase {
        name: String,
        #[label("unknown phase")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("DEFAULT cannot be used as an explicit phase for node \"{node}\"")]
    #[diagnostic(
        code(irmatch::parse::default_prefix),
        help("drop the prefix to use the node's default phase")
    )]
    DefaultPhasePrefix {
        node: String,
        #[label("placeholder phase")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Compile phase {phase} is listed twice for node \"{node}\"")]
    #[diagnostic(code(irmatch::parse::duplicate_phase))]
    DuplicatePhase {
        phase: String,
        node: String,
        #[label("duplicate")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("{0}")]
    #[diagnostic(code(irmatch::parse::multiple))]
    MultipleErrors(#[from] ParseErrors),
}

/// Wrapper for collecting every semantic error of a declaration.
///
/// Once pest accepts a list, entries are converted one by one; a bad
/// comparator in the first entry does not hide an unknown phase in the third.
#[derive(Debug, Error)]
#[error("{}", format_parse_errors(.errors))]
pub struct ParseErrors {
    pub errors: Vec<ParseError>,
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    if errors.len() == 1 {
        return errors[0].to_string();
    }
    let mut s = format!("{} parse errors:\n", errors.len());
    for (i, e) in errors.iter().enumerate() {
        s.push_str(&format!("  {}. {}\n", i + 1, e));
    }
    s
}

impl ParseErrors {
    /// Collapse a non-empty error list into a single error.
    pub fn into_error(mut self) -> ParseError {
        if self.errors.len() == 1 {
            self.errors.remove(0)
        } else {
            ParseError::MultipleErrors(self)
        }
    }
}

impl ParseError {
    pub fn syntax(
        message: impl Into<String>,
        span: Span,
        source: &str,
        list: &str,
    ) -> Self {
        ParseError::Syntax {
            list: list.to_string(),
            message: message.into(),
            span: span.into(),
            src: miette::NamedSource::new(list, source.to_owned()),
        }
    }

    /// Byte span of the offending substring, if the error has one.
    pub fn span(&self) -> Option<miette::SourceSpan> {
        match self {
            ParseError::Syntax { span, .. }
            | ParseError::UnknownComparator { span, .. }
            | ParseError::InvalidBound { span, .. }
            | ParseError::MissingBound { span, .. }
            | ParseError::MissingRelation { span, .. }
            | ParseError::UnknownPhase { span, .. }
            | ParseError::DefaultPhasePrefix { span, .. }
            | ParseError::DuplicatePhase { span, .. } => Some(*span),
            ParseError::MultipleErrors(_) => None,
        }
    }

    /// Number of underlying errors (1 unless this wraps several).
    pub fn count(&self) -> usize {
        match self {
            ParseError::MultipleErrors(errs) => errs.errors.len(),
            _ => 1,
        }
    }
}
