use indexmap::IndexMap;
use miette::IntoDiagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use irmatch_dsl::CompilePhase;
use irmatch_engine::{NodeEntry, RuleDeclaration};

/// Current schema version for suite manifests.
pub(crate) const SUITE_MANIFEST_SCHEMA_VERSION: u32 = 1;

/// A suite manifest: the node catalog, the VM flags the dumps were captured
/// under, the IR rules to check and the dump file of each phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SuiteManifest {
    /// Schema version (must be exactly 1).
    pub(crate) schema_version: u32,
    pub(crate) suite_name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    /// VM flag values, e.g. `{"UseAVX": "2"}`.
    #[serde(default)]
    pub(crate) flags: IndexMap<String, String>,
    pub(crate) nodes: Vec<NodeEntry>,
    pub(crate) rules: Vec<RuleDeclaration>,
    /// Phase name to dump file, relative to the manifest.
    #[serde(default)]
    pub(crate) dumps: IndexMap<String, String>,
}

/// Validation error for a suite manifest.
#[derive(Debug, Clone)]
pub(crate) struct ManifestValidationError {
    pub(crate) message: String,
}

impl std::fmt::Display for ManifestValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Validate a suite manifest and return any errors found.
///
/// - `schema_version` must be exactly `SUITE_MANIFEST_SCHEMA_VERSION`.
/// - `suite_name` must be non-empty.
/// - `rules` must be non-empty; rule names, where given, must be unique.
/// - `dumps` keys must name concrete compile phases and values must be
///   non-empty paths.
/// - flag names must be non-empty.
pub(crate) fn validate_manifest(manifest: &SuiteManifest) -> Vec<ManifestValidationError> {
    let mut errors = Vec::new();
    let mut error = |message: String| errors.push(ManifestValidationError { message });

    if manifest.schema_version != SUITE_MANIFEST_SCHEMA_VERSION {
        error(format!(
            "schema_version must be {}, got {}",
            SUITE_MANIFEST_SCHEMA_VERSION, manifest.schema_version
        ));
    }

    if manifest.suite_name.trim().is_empty() {
        error("suite_name must be non-empty".into());
    }

    if manifest.rules.is_empty() {
        error("rules must be non-empty".into());
    }

    let mut seen_names: HashSet<&str> = HashSet::new();
    for (i, rule) in manifest.rules.iter().enumerate() {
        let Some(name) = rule.name.as_deref() else {
            continue;
        };
        if name.trim().is_empty() {
            error(format!("rules[{i}]: name must be non-empty when given"));
        } else if !seen_names.insert(name) {
            error(format!("rules[{i}]: duplicate name '{name}'"));
        }
    }

    for flag in manifest.flags.keys() {
        if flag.trim().is_empty() {
            error("flags: flag names must be non-empty".into());
        }
    }

    for (phase, path) in &manifest.dumps {
        match phase.parse::<CompilePhase>() {
            Ok(CompilePhase::Default) => {
                error("dumps: DEFAULT is not a capturable phase".into());
            }
            Ok(_) => {}
            Err(e) => error(format!("dumps: {e}")),
        }
        if path.trim().is_empty() {
            error(format!("dumps.{phase}: path must be non-empty"));
        }
    }

    errors
}

/// Read, deserialize and validate the manifest at `path`.
pub(crate) fn load_manifest(path: &Path) -> miette::Result<SuiteManifest> {
    let raw = fs::read_to_string(path).into_diagnostic()?;
    let manifest: SuiteManifest = serde_json::from_str(&raw).into_diagnostic()?;

    let schema_errors = validate_manifest(&manifest);
    if !schema_errors.is_empty() {
        let msgs: Vec<String> = schema_errors.iter().map(|e| e.message.clone()).collect();
        miette::bail!("Suite manifest validation failed:\n  {}", msgs.join("\n  "));
    }
    Ok(manifest)
}

impl SuiteManifest {
    /// Dump files by phase, resolved against the manifest's directory.
    /// Assumes the manifest passed [`validate_manifest`].
    pub(crate) fn dump_paths(&self, manifest_path: &Path) -> Vec<(CompilePhase, PathBuf)> {
        let base_dir = manifest_path.parent().unwrap_or(Path::new("."));
        self.dumps
            .iter()
            .filter_map(|(phase, file)| {
                let phase = phase.parse::<CompilePhase>().ok()?;
                Some((phase, base_dir.join(file)))
            })
            .collect()
    }

    /// Manifest flags with `NAME=VALUE` overrides applied.
    pub(crate) fn flags_with_overrides(
        &self,
        overrides: &[String],
    ) -> miette::Result<IndexMap<String, String>> {
        let mut flags = self.flags.clone();
        for raw in overrides {
            let (name, value) = parse_flag_override(raw)?;
            flags.insert(name, value);
        }
        Ok(flags)
    }
}

pub(crate) fn parse_flag_override(raw: &str) -> miette::Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => miette::bail!("Invalid --flag '{raw}': expected NAME=VALUE"),
    }
}
