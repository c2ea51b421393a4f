#![allow(clippy::result_large_err)]

use std::collections::BTreeSet;

use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::errors::{ParseError, ParseErrors};
use crate::phase::CompilePhase;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct ConstraintParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Source name used in diagnostics for the fail-on list.
pub const FAIL_ON_LIST: &str = "failOn";
/// Source name used in diagnostics for the counts list.
pub const COUNTS_LIST: &str = "counts";

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Parse a fail-on list: `AFTER_PARSING:ALLOC, STORE_I`.
pub fn parse_fail_on(source: &str) -> Result<Vec<RawConstraint>, ParseError> {
    let list = parse_list(Rule::fail_on_list, source, FAIL_ON_LIST)?;
    let mut ctx = ListContext::new(source, FAIL_ON_LIST);

    let mut constraints = Vec::new();
    for item in list.into_inner() {
        if item.as_rule() != Rule::node_ref {
            continue;
        }
        let span = span_from(&item);
        let (node, phases) = ctx.node_ref(item);
        constraints.push(RawConstraint {
            node,
            kind: ConstraintKind::FailOn,
            phases,
            span,
        });
    }
    ctx.finish(constraints)
}

/// Parse a counts list: `compI_rReg = 2, LOAD >= 1 <= 3, CALL 1`.
///
/// A bare bound is an equality.
pub fn parse_counts(source: &str) -> Result<Vec<RawConstraint>, ParseError> {
    let list = parse_list(Rule::counts_list, source, COUNTS_LIST)?;
    let mut ctx = ListContext::new(source, COUNTS_LIST);

    let constraints = list
        .into_inner()
        .filter(|item| item.as_rule() == Rule::counts_entry)
        .map(|item| ctx.counts_entry(item))
        .collect::<Vec<_>>();
    ctx.finish(constraints)
}

/// Parse both lists of one IR rule. Errors from both lists are reported
/// together and nothing is returned unless both parse cleanly.
pub fn parse_declaration(fail_on: &str, counts: &str) -> Result<RawDeclaration, ParseError> {
    match (parse_fail_on(fail_on), parse_counts(counts)) {
        (Ok(fail_on), Ok(counts)) => Ok(RawDeclaration { fail_on, counts }),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(a), Err(b)) => {
            let errors = flatten(a).into_iter().chain(flatten(b)).collect();
            Err(ParseErrors { errors }.into_error())
        }
    }
}

fn flatten(err: ParseError) -> Vec<ParseError> {
    match err {
        ParseError::MultipleErrors(errs) => errs.errors,
        other => vec![other],
    }
}

fn parse_list<'s>(rule: Rule, source: &'s str, list: &str) -> Result<Pair<'s>, ParseError> {
    let mut pairs = ConstraintParser::parse(rule, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, p + 1),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        let end = end.min(source.len());
        let start = start.min(end);
        ParseError::syntax(
            e.variant.message().into_owned(),
            Span::new(start, end),
            source,
            list,
        )
    })?;
    pairs
        .next()
        .ok_or_else(|| ParseError::syntax("empty input", Span::new(0, 0), source, list))
}

/// Per-list conversion state: the source text for diagnostics and every
/// semantic error found so far.
struct ListContext<'s> {
    source: &'s str,
    list: &'static str,
    errors: Vec<ParseError>,
}

impl<'s> ListContext<'s> {
    fn new(source: &'s str, list: &'static str) -> Self {
        Self {
            source,
            list,
            errors: Vec::new(),
        }
    }

    fn report(&mut self, make: impl FnOnce(miette::NamedSource<String>) -> ParseError) {
        let src = miette::NamedSource::new(self.list, self.source.to_owned());
        self.errors.push(make(src));
    }

    fn finish<T>(self, value: T) -> Result<T, ParseError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ParseErrors {
                errors: self.errors,
            }
            .into_error())
        }
    }

    fn node_ref(&mut self, pair: Pair<'_>) -> (String, Option<Vec<CompilePhase>>) {
        let mut node = String::new();
        let mut prefix = None;
        for item in pair.into_inner() {
            match item.as_rule() {
                Rule::phase_prefix => prefix = Some(item),
                Rule::node_ident => node = item.as_str().to_string(),
                _ => {}
            }
        }

        let phases = prefix.map(|prefix| {
            let mut seen = BTreeSet::new();
            let mut phases = Vec::new();
            for name_pair in prefix.into_inner() {
                let name = name_pair.as_str();
                let span: miette::SourceSpan = span_from(&name_pair).into();
                match CompilePhase::from_name(name) {
                    None => self.report(|src| ParseError::UnknownPhase {
                        name: name.to_string(),
                        span,
                        src,
                    }),
                    Some(CompilePhase::Default) => {
                        self.report(|src| ParseError::DefaultPhasePrefix {
                            node: node.clone(),
                            span,
                            src,
                        })
                    }
                    Some(phase) if !seen.insert(phase) => {
                        self.report(|src| ParseError::DuplicatePhase {
                            phase: phase.name().to_string(),
                            node: node.clone(),
                            span,
                            src,
                        })
                    }
                    Some(phase) => phases.push(phase),
                }
            }
            phases
        });

        (node, phases)
    }

    fn counts_entry(&mut self, pair: Pair<'_>) -> RawConstraint {
        let span = span_from(&pair);
        let mut node = String::new();
        let mut phases = None;
        let mut relation_pairs = Vec::new();
        for item in pair.into_inner() {
            match item.as_rule() {
                Rule::node_ref => (node, phases) = self.node_ref(item),
                Rule::relation => relation_pairs.push(item),
                _ => {}
            }
        }

        if relation_pairs.is_empty() {
            self.report(|src| ParseError::MissingRelation {
                node: node.clone(),
                span: span.into(),
                src,
            });
        }

        let relations = relation_pairs
            .into_iter()
            .filter_map(|item| self.relation(item, &node))
            .collect();

        RawConstraint {
            node,
            kind: ConstraintKind::Counts(relations),
            phases,
            span,
        }
    }

    fn relation(&mut self, pair: Pair<'_>, node: &str) -> Option<Relation> {
        let span = span_from(&pair);
        let mut comparator_pair = None;
        let mut bound_pair = None;
        for item in pair.into_inner() {
            match item.as_rule() {
                Rule::comparator => comparator_pair = Some(item),
                Rule::bound => bound_pair = Some(item),
                _ => {}
            }
        }

        let comparator = match &comparator_pair {
            None => Some(Comparator::Eq),
            Some(token) => {
                let comparator = Comparator::from_token(token.as_str());
                if comparator.is_none() {
                    self.report(|src| ParseError::UnknownComparator {
                        token: token.as_str().to_string(),
                        node: node.to_string(),
                        span: span_from(token).into(),
                        src,
                    });
                }
                comparator
            }
        };

        let bound = match bound_pair {
            Some(token) => {
                let bound = token.as_str().parse::<u64>().ok();
                if bound.is_none() {
                    self.report(|src| ParseError::InvalidBound {
                        token: token.as_str().to_string(),
                        node: node.to_string(),
                        span: span_from(&token).into(),
                        src,
                    });
                }
                bound
            }
            None => {
                // Only reachable through `comparator ~ bound?`; an unknown
                // comparator has already been reported.
                if let (Some(token), Some(_)) = (&comparator_pair, comparator) {
                    self.report(|src| ParseError::MissingBound {
                        comparator: token.as_str().to_string(),
                        node: node.to_string(),
                        span: span.into(),
                        src,
                    });
                }
                None
            }
        };

        Some(Relation::new(comparator?, bound?))
    }
}
