// Command handler for: check

use miette::IntoDiagnostic;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use irmatch_engine::{
    check_rules, CapturedCompilation, EvalMode, NodeRegistry, RuleReport, VmConfig,
};

use super::{parse_output_format, write_json_artifact, OutputFormat};
use crate::manifest::{load_manifest, SuiteManifest, SUITE_MANIFEST_SCHEMA_VERSION};

#[derive(Debug, Serialize)]
pub(crate) struct SuiteReport {
    pub(crate) schema_version: u32,
    pub(crate) suite_name: String,
    pub(crate) flags: indexmap::IndexMap<String, String>,
    /// `pass` or `fail`.
    pub(crate) overall: String,
    pub(crate) rules: Vec<RuleReport>,
}

impl SuiteReport {
    fn failed_rules(&self) -> usize {
        self.rules.iter().filter(|r| r.is_failure()).count()
    }
}

fn read_dumps(manifest: &SuiteManifest, manifest_path: &Path) -> miette::Result<CapturedCompilation> {
    let mut compilation = CapturedCompilation::new();
    for (phase, path) in manifest.dump_paths(manifest_path) {
        let text = fs::read_to_string(&path)
            .into_diagnostic()
            .map_err(|e| e.wrap_err(format!("Cannot read dump for {phase}: {}", path.display())))?;
        compilation.insert(phase, text);
    }
    Ok(compilation)
}

pub(crate) fn render_suite_text(report: &SuiteReport) -> String {
    let mut out = String::new();
    let failed = report.failed_rules();
    if failed == 0 {
        out.push_str(&format!(
            "Suite {}: PASS ({} rule(s))\n",
            report.suite_name,
            report.rules.len()
        ));
    } else {
        out.push_str(&format!(
            "Suite {}: FAIL ({} of {} rule(s) failed)\n",
            report.suite_name,
            failed,
            report.rules.len()
        ));
    }
    for rule in &report.rules {
        out.push_str("  ");
        out.push_str(&rule.to_string().replace('\n', "\n  "));
        out.push('\n');
    }
    out
}

pub(crate) fn run_check_command(
    manifest_path: &Path,
    format: &str,
    parallel: bool,
    flag_overrides: &[String],
    out: Option<&PathBuf>,
) -> miette::Result<()> {
    let output_format = parse_output_format(format)?;
    let manifest = load_manifest(manifest_path)?;

    let registry = NodeRegistry::new(manifest.nodes.iter().cloned())?;
    let flags = manifest.flags_with_overrides(flag_overrides)?;
    let vm = VmConfig::new(&registry).with_flags(flags.clone());
    let compilation = read_dumps(&manifest, manifest_path)?;

    let mode = if parallel {
        EvalMode::Parallel
    } else {
        EvalMode::Sequential
    };
    info!(
        "Checking {} IR rule(s) of suite {}...",
        manifest.rules.len(),
        manifest.suite_name
    );
    let rules = check_rules(&manifest.rules, &vm, &vm, &compilation, mode)?;

    let mut report = SuiteReport {
        schema_version: SUITE_MANIFEST_SCHEMA_VERSION,
        suite_name: manifest.suite_name.clone(),
        flags,
        overall: String::new(),
        rules,
    };
    report.overall = if report.failed_rules() == 0 { "pass" } else { "fail" }.into();

    let report_json = serde_json::to_value(&report).into_diagnostic()?;
    if let Some(path) = out {
        write_json_artifact(path, &report_json)?;
        info!("Check report written to {}", path.display());
    }

    match output_format {
        OutputFormat::Text => print!("{}", render_suite_text(&report)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report_json).into_diagnostic()?)
        }
    }

    if report.overall != "pass" {
        std::process::exit(2);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use irmatch_dsl::CompilePhase;
    use irmatch_engine::result::{PhaseOutcome, PhaseResult, RuleOutcome};

    #[test]
    fn text_report_indents_rule_details() {
        let report = SuiteReport {
            schema_version: 1,
            suite_name: "loops".into(),
            flags: Default::default(),
            overall: "fail".into(),
            rules: vec![
                RuleReport {
                    rule_index: 1,
                    name: Some("cmp".into()),
                    outcome: RuleOutcome::Evaluated(vec![PhaseResult {
                        phase: CompilePhase::FinalCode,
                        outcome: PhaseOutcome::Pass,
                    }]),
                },
                RuleReport {
                    rule_index: 2,
                    name: None,
                    outcome: RuleOutcome::Evaluated(vec![PhaseResult {
                        phase: CompilePhase::PrintIdeal,
                        outcome: PhaseOutcome::PhaseAbsent,
                    }]),
                },
            ],
        };
        let text = render_suite_text(&report);
        assert!(text.starts_with("Suite loops: FAIL (1 of 2 rule(s) failed)\n"));
        assert!(text.contains("\n  IR rule 1 (cmp): PASS\n"));
        assert!(text.contains("\n  IR rule 2: FAIL\n    PRINT_IDEAL: no compilation output"));
    }
}
