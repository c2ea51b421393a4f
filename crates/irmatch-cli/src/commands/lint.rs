// Command handler for: lint

use miette::IntoDiagnostic;
use serde::Serialize;
use std::path::Path;

use irmatch_dsl::CompilePhase;
use irmatch_engine::declaration::PreparedRule;
use irmatch_engine::{prepare_rules, NodeRegistry, Phases, VmConfig};

use super::{parse_output_format, OutputFormat};
use crate::manifest::{load_manifest, SUITE_MANIFEST_SCHEMA_VERSION};

/// Phase plan of one accepted rule.
#[derive(Debug, Serialize)]
pub(crate) struct LintedRule {
    pub(crate) rule_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    /// `true` when the rule targets each node's default phase.
    pub(crate) default_phases: bool,
    pub(crate) applicable: bool,
    /// Phases a rule would be built for; empty when not applicable.
    pub(crate) phases: Vec<CompilePhase>,
    pub(crate) fail_on: usize,
    pub(crate) counts: usize,
}

impl From<&PreparedRule> for LintedRule {
    fn from(prepared: &PreparedRule) -> Self {
        let rule = &prepared.rule;
        let phases = prepared
            .buckets
            .iter()
            .flat_map(|buckets| {
                buckets
                    .iter()
                    .filter(|(_, bucket)| !bucket.is_empty())
                    .map(|(phase, _)| *phase)
            })
            .collect();
        LintedRule {
            rule_index: rule.index(),
            name: rule.name().map(str::to_string),
            default_phases: *rule.phases() == Phases::Default,
            applicable: prepared.buckets.is_some(),
            phases,
            fail_on: rule.constraints().fail_on.len(),
            counts: rule.constraints().counts.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LintReport {
    pub(crate) schema_version: u32,
    pub(crate) suite_name: String,
    pub(crate) rules: Vec<LintedRule>,
}

pub(crate) fn render_lint_text(report: &LintReport) -> String {
    let mut out = format!(
        "Suite {}: {} rule(s) OK\n",
        report.suite_name,
        report.rules.len()
    );
    for rule in &report.rules {
        let label = match &rule.name {
            Some(name) => format!("IR rule {} ({name})", rule.rule_index),
            None => format!("IR rule {}", rule.rule_index),
        };
        if !rule.applicable {
            out.push_str(&format!("  {label}: not applicable\n"));
            continue;
        }
        let phases: Vec<&str> = rule.phases.iter().map(|p| p.name()).collect();
        out.push_str(&format!(
            "  {label}: {} failOn, {} counts -> {}\n",
            rule.fail_on,
            rule.counts,
            phases.join(", ")
        ));
    }
    out
}

pub(crate) fn run_lint_command(
    manifest_path: &Path,
    format: &str,
    flag_overrides: &[String],
) -> miette::Result<()> {
    let output_format = parse_output_format(format)?;
    let manifest = load_manifest(manifest_path)?;

    let registry = NodeRegistry::new(manifest.nodes.iter().cloned())?;
    let flags = manifest.flags_with_overrides(flag_overrides)?;
    let vm = VmConfig::new(&registry).with_flags(flags);

    let prepared = prepare_rules(&manifest.rules, &vm, &vm)?;
    let report = LintReport {
        schema_version: SUITE_MANIFEST_SCHEMA_VERSION,
        suite_name: manifest.suite_name.clone(),
        rules: prepared.iter().map(LintedRule::from).collect(),
    };

    match output_format {
        OutputFormat::Text => print!("{}", render_lint_text(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).into_diagnostic()?
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_text_lists_phase_plan() {
        let report = LintReport {
            schema_version: 1,
            suite_name: "loops".into(),
            rules: vec![
                LintedRule {
                    rule_index: 1,
                    name: Some("cmp".into()),
                    default_phases: true,
                    applicable: true,
                    phases: vec![CompilePhase::FinalCode, CompilePhase::PrintIdeal],
                    fail_on: 1,
                    counts: 2,
                },
                LintedRule {
                    rule_index: 2,
                    name: None,
                    default_phases: false,
                    applicable: false,
                    phases: Vec::new(),
                    fail_on: 0,
                    counts: 1,
                },
            ],
        };
        assert_eq!(
            render_lint_text(&report),
            "Suite loops: 2 rule(s) OK\n\
             \x20 IR rule 1 (cmp): 1 failOn, 2 counts -> FINAL_CODE, PRINT_IDEAL\n\
             \x20 IR rule 2: not applicable\n"
        );
    }
}
