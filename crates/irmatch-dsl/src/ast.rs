use std::fmt;

use crate::phase::CompilePhase;

/// Byte span into one declaration string, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

/// Comparison operator of a counts relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    /// Decode a symbolic (`>=`) or literal (`ge`) comparator token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" | "==" => Some(Comparator::Eq),
            "!=" => Some(Comparator::Ne),
            "<" => Some(Comparator::Lt),
            "<=" => Some(Comparator::Le),
            ">" => Some(Comparator::Gt),
            ">=" => Some(Comparator::Ge),
            _ => match token.to_ascii_lowercase().as_str() {
                "eq" => Some(Comparator::Eq),
                "ne" => Some(Comparator::Ne),
                "lt" => Some(Comparator::Lt),
                "le" => Some(Comparator::Le),
                "gt" => Some(Comparator::Gt),
                "ge" => Some(Comparator::Ge),
                _ => None,
            },
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    pub fn holds(self, observed: u64, bound: u64) -> bool {
        match self {
            Comparator::Eq => observed == bound,
            Comparator::Ne => observed != bound,
            Comparator::Lt => observed < bound,
            Comparator::Le => observed <= bound,
            Comparator::Gt => observed > bound,
            Comparator::Ge => observed >= bound,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One `comparator bound` pair of a counts constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Relation {
    pub comparator: Comparator,
    pub bound: u64,
}

impl Relation {
    pub fn new(comparator: Comparator, bound: u64) -> Self {
        Self { comparator, bound }
    }

    pub fn holds(&self, observed: u64) -> bool {
        self.comparator.holds(observed, self.bound)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparator, self.bound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum ConstraintKind {
    FailOn,
    /// Conjunction of relations on the occurrence count.
    Counts(Vec<Relation>),
}

/// One parsed declaration entry, before any phase resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct RawConstraint {
    pub node: String,
    pub kind: ConstraintKind,
    /// Phases named by an explicit `PHASE:` prefix. `None` means the entry
    /// follows the rule's phases (or the node's default phase).
    pub phases: Option<Vec<CompilePhase>>,
    pub span: Span,
}

impl RawConstraint {
    pub fn relations(&self) -> &[Relation] {
        match &self.kind {
            ConstraintKind::FailOn => &[],
            ConstraintKind::Counts(relations) => relations,
        }
    }

    pub fn is_counts(&self) -> bool {
        matches!(self.kind, ConstraintKind::Counts(_))
    }

    /// True when any relation is an equality (`= n`).
    pub fn is_equality(&self) -> bool {
        self.relations()
            .iter()
            .any(|r| r.comparator == Comparator::Eq)
    }

    /// The expected relation in report form, e.g. `=1` or `>=1,<=3`.
    /// Fail-on entries expect zero occurrences.
    pub fn expected(&self) -> String {
        match &self.kind {
            ConstraintKind::FailOn => "=0".to_string(),
            ConstraintKind::Counts(relations) => relations
                .iter()
                .map(Relation::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for RawConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(phases) = &self.phases {
            let names: Vec<&str> = phases.iter().map(|p| p.name()).collect();
            write!(f, "{}:", names.join("|"))?;
        }
        f.write_str(&self.node)?;
        for relation in self.relations() {
            write!(f, " {relation}")?;
        }
        Ok(())
    }
}

/// Both constraint lists of one IR rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct RawDeclaration {
    pub fail_on: Vec<RawConstraint>,
    pub counts: Vec<RawConstraint>,
}

impl RawDeclaration {
    pub fn is_empty(&self) -> bool {
        self.fail_on.is_empty() && self.counts.is_empty()
    }

    /// All entries, fail-on first, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RawConstraint> {
        self.fail_on.iter().chain(self.counts.iter())
    }
}
