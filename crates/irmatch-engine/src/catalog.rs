//! Node identifiers: how they are matched in each phase and which phase
//! they default to under a given VM configuration.

use std::fmt;

use indexmap::IndexMap;
use miette::Diagnostic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use irmatch_dsl::{CompilePhase, OutputClass};

/// A compiled pattern for one node identifier in one phase.
#[derive(Debug, Clone)]
pub struct NodePattern {
    node: String,
    regex: Regex,
}

impl NodePattern {
    /// Match `node` as a whole identifier: `compI_rReg` does not match
    /// inside `compI_rReg_imm`.
    pub fn word(node: &str) -> Self {
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let start = if node.starts_with(is_word) { r"\b" } else { "" };
        let end = if node.ends_with(is_word) { r"\b" } else { "" };
        let source = format!("{start}{}{end}", regex::escape(node));
        // An escaped literal between word boundaries is always a valid regex.
        let regex = Regex::new(&source).unwrap_or_else(|_| unreachable!("escaped literal"));
        Self {
            node: node.to_string(),
            regex,
        }
    }

    pub fn regex(node: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            node: node.to_string(),
            regex: Regex::new(pattern)?,
        })
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Number of non-overlapping matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.regex.as_str())
    }
}

/// Failure to bind a node identifier to a phase.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ResolveError {
    #[error("Unknown node \"{node}\": it is not registered in the node catalog")]
    #[diagnostic(code(irmatch::resolve::unknown_node))]
    UnknownNode { node: String },

    #[error("Node \"{node}\" is not defined for compile phase {phase}")]
    #[diagnostic(
        code(irmatch::resolve::undefined_in_phase),
        help("pick a phase whose output class the node is registered for")
    )]
    UndefinedInPhase { node: String, phase: CompilePhase },

    #[error("Node \"{node}\" has no default compile phase under the current VM configuration")]
    #[diagnostic(
        code(irmatch::resolve::no_default_phase),
        help("name the phase explicitly with a prefix, e.g. `FINAL_CODE:LOAD`")
    )]
    NoDefaultPhase { node: String },
}

/// Every resolution error of one rule, reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{}", format_resolve_errors(.errors))]
#[diagnostic(code(irmatch::resolve::errors))]
pub struct ResolveErrors {
    pub errors: Vec<ResolveError>,
}

fn format_resolve_errors(errors: &[ResolveError]) -> String {
    if errors.len() == 1 {
        return errors[0].to_string();
    }
    let mut s = format!("{} resolution errors:\n", errors.len());
    for (i, e) in errors.iter().enumerate() {
        s.push_str(&format!("  {}. {}\n", i + 1, e));
    }
    s
}

/// Resolves node identifiers to match patterns.
pub trait NodeCatalog {
    fn contains(&self, node: &str) -> bool;

    fn pattern(&self, node: &str, phase: CompilePhase) -> Result<NodePattern, ResolveError>;
}

/// The VM configuration the compiler output was captured under.
pub trait VmInfo {
    /// The canonical phase of `node` under this configuration, if any.
    fn default_phase_for(&self, node: &str) -> Option<CompilePhase>;

    /// Value of a VM flag, as a string (`"true"`, `"4"`, ...).
    fn flag(&self, name: &str) -> Option<&str>;
}

/// Default phase that applies while a VM flag has a given value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultOverride {
    pub flag: String,
    pub value: String,
    pub phase: CompilePhase,
}

/// Catalog entry for one node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeEntry {
    pub name: String,
    /// Regex to search for; the name as a whole word when absent.
    #[serde(default)]
    pub regex: Option<String>,
    /// Output classes the node is defined for; empty means every class.
    #[serde(default)]
    pub classes: Vec<OutputClass>,
    #[serde(default)]
    pub default_phase: Option<CompilePhase>,
    /// Checked in order; the first override whose flag matches wins.
    #[serde(default)]
    pub default_overrides: Vec<DefaultOverride>,
}

impl NodeEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regex: None,
            classes: Vec::new(),
            default_phase: None,
            default_overrides: Vec::new(),
        }
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn with_class(mut self, class: OutputClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_default(mut self, phase: CompilePhase) -> Self {
        self.default_phase = Some(phase);
        self
    }

    pub fn with_override(
        mut self,
        flag: impl Into<String>,
        value: impl Into<String>,
        phase: CompilePhase,
    ) -> Self {
        self.default_overrides.push(DefaultOverride {
            flag: flag.into(),
            value: value.into(),
            phase,
        });
        self
    }

    pub fn is_defined_in(&self, phase: CompilePhase) -> bool {
        match phase.output_class() {
            None => false,
            Some(class) => self.classes.is_empty() || self.classes.contains(&class),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RegistryError {
    #[error("Node \"{node}\" is registered twice")]
    #[diagnostic(code(irmatch::catalog::duplicate))]
    Duplicate { node: String },

    #[error("Node \"{node}\" has an invalid regex: {message}")]
    #[diagnostic(code(irmatch::catalog::invalid_regex))]
    InvalidRegex { node: String, message: String },

    #[error("Node \"{node}\" uses DEFAULT as a concrete default phase")]
    #[diagnostic(code(irmatch::catalog::placeholder_default))]
    PlaceholderDefault { node: String },

    #[error("Node \"{node}\" defaults to {phase}, but is not defined for that phase")]
    #[diagnostic(code(irmatch::catalog::default_outside_classes))]
    DefaultOutsideClasses { node: String, phase: CompilePhase },
}

#[derive(Debug, Clone)]
struct RegisteredNode {
    entry: NodeEntry,
    regex: Option<Regex>,
}

/// In-memory node catalog built from [`NodeEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: IndexMap<String, RegisteredNode>,
}

impl NodeRegistry {
    pub fn new(entries: impl IntoIterator<Item = NodeEntry>) -> Result<Self, RegistryError> {
        let mut nodes = IndexMap::new();
        for entry in entries {
            let regex = match &entry.regex {
                Some(source) => {
                    Some(
                        Regex::new(source).map_err(|e| RegistryError::InvalidRegex {
                            node: entry.name.clone(),
                            message: e.to_string(),
                        })?,
                    )
                }
                None => None,
            };
            let defaults = entry
                .default_phase
                .iter()
                .chain(entry.default_overrides.iter().map(|o| &o.phase));
            for &phase in defaults {
                if phase.is_default() {
                    return Err(RegistryError::PlaceholderDefault {
                        node: entry.name.clone(),
                    });
                }
                if !entry.is_defined_in(phase) {
                    return Err(RegistryError::DefaultOutsideClasses {
                        node: entry.name.clone(),
                        phase,
                    });
                }
            }
            let name = entry.name.clone();
            if nodes
                .insert(name.clone(), RegisteredNode { entry, regex })
                .is_some()
            {
                return Err(RegistryError::Duplicate { node: name });
            }
        }
        Ok(Self { nodes })
    }

    pub fn get(&self, node: &str) -> Option<&NodeEntry> {
        self.nodes.get(node).map(|n| &n.entry)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Default phase of `node` given the VM flag values.
    pub fn default_phase(
        &self,
        node: &str,
        flags: &IndexMap<String, String>,
    ) -> Option<CompilePhase> {
        let entry = self.get(node)?;
        entry
            .default_overrides
            .iter()
            .find(|o| flags.get(&o.flag) == Some(&o.value))
            .map(|o| o.phase)
            .or(entry.default_phase)
    }
}

impl NodeCatalog for NodeRegistry {
    fn contains(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    fn pattern(&self, node: &str, phase: CompilePhase) -> Result<NodePattern, ResolveError> {
        let registered = self.nodes.get(node).ok_or_else(|| ResolveError::UnknownNode {
            node: node.to_string(),
        })?;
        if !registered.entry.is_defined_in(phase) {
            return Err(ResolveError::UndefinedInPhase {
                node: node.to_string(),
                phase,
            });
        }
        Ok(match &registered.regex {
            Some(regex) => NodePattern {
                node: node.to_string(),
                regex: regex.clone(),
            },
            None => NodePattern::word(node),
        })
    }
}

/// A node registry together with the VM flags of one run.
#[derive(Debug, Clone)]
pub struct VmConfig<'a> {
    registry: &'a NodeRegistry,
    flags: IndexMap<String, String>,
}

impl<'a> VmConfig<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self {
            registry,
            flags: IndexMap::new(),
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = (String, String)>) -> Self {
        self.flags.extend(flags);
        self
    }

    pub fn flags(&self) -> &IndexMap<String, String> {
        &self.flags
    }
}

impl VmInfo for VmConfig<'_> {
    fn default_phase_for(&self, node: &str) -> Option<CompilePhase> {
        self.registry.default_phase(node, &self.flags)
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }
}

impl NodeCatalog for VmConfig<'_> {
    fn contains(&self, node: &str) -> bool {
        self.registry.contains(node)
    }

    fn pattern(&self, node: &str, phase: CompilePhase) -> Result<NodePattern, ResolveError> {
        self.registry.pattern(node, phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> NodeRegistry {
        NodeRegistry::new([
            NodeEntry::new("compI_rReg")
                .with_class(OutputClass::Mach)
                .with_default(CompilePhase::FinalCode),
            NodeEntry::new("ALLOC")
                .with_regex(r"Allocate\b")
                .with_class(OutputClass::Ideal)
                .with_default(CompilePhase::PrintIdeal)
                .with_override("EliminateAllocations", "false", CompilePhase::AfterParsing),
            NodeEntry::new("CALL"),
        ])
        .unwrap()
    }

    #[test]
    fn word_pattern_does_not_match_longer_identifiers() {
        let pattern = NodePattern::word("compI_rReg");
        let text = "compI_rReg_imm\n  compI_rReg rax, rbx\ncompI_rReg\n";
        assert_eq!(pattern.count(text), 2);
    }

    #[test]
    fn word_pattern_with_symbols_at_edges() {
        let pattern = NodePattern::word("_#ALLOC#_");
        assert_eq!(pattern.count("x _#ALLOC#_ y _#ALLOC#_"), 2);
    }

    #[test]
    fn registered_regex_is_used() {
        let reg = registry();
        let pattern = reg.pattern("ALLOC", CompilePhase::PrintIdeal).unwrap();
        assert_eq!(pattern.as_str(), r"Allocate\b");
        assert_eq!(pattern.count("12 Allocate === 5\n13 AllocateArray"), 1);
    }

    #[test]
    fn undefined_phase_is_an_error_not_a_fallback() {
        let reg = registry();
        assert_eq!(
            reg.pattern("compI_rReg", CompilePhase::PrintIdeal).unwrap_err(),
            ResolveError::UndefinedInPhase {
                node: "compI_rReg".into(),
                phase: CompilePhase::PrintIdeal,
            }
        );
        assert!(reg.pattern("CALL", CompilePhase::FinalCode).is_ok());
        assert!(reg.pattern("CALL", CompilePhase::PrintIdeal).is_ok());
    }

    #[test]
    fn unknown_node() {
        assert!(matches!(
            registry().pattern("NOPE", CompilePhase::FinalCode),
            Err(ResolveError::UnknownNode { .. })
        ));
    }

    #[test]
    fn default_phase_depends_on_flags() {
        let reg = registry();
        let plain = VmConfig::new(&reg);
        assert_eq!(plain.default_phase_for("ALLOC"), Some(CompilePhase::PrintIdeal));
        let flagged = VmConfig::new(&reg).with_flag("EliminateAllocations", "false");
        assert_eq!(
            flagged.default_phase_for("ALLOC"),
            Some(CompilePhase::AfterParsing)
        );
        assert_eq!(plain.default_phase_for("CALL"), None);
        assert_eq!(plain.default_phase_for("NOPE"), None);
    }

    #[test]
    fn registry_rejects_bad_entries() {
        assert!(matches!(
            NodeRegistry::new([NodeEntry::new("A"), NodeEntry::new("A")]),
            Err(RegistryError::Duplicate { .. })
        ));
        assert!(matches!(
            NodeRegistry::new([NodeEntry::new("A").with_regex("(")]),
            Err(RegistryError::InvalidRegex { .. })
        ));
        assert!(matches!(
            NodeRegistry::new([NodeEntry::new("A").with_default(CompilePhase::Default)]),
            Err(RegistryError::PlaceholderDefault { .. })
        ));
        assert!(matches!(
            NodeRegistry::new([NodeEntry::new("A")
                .with_class(OutputClass::Mach)
                .with_default(CompilePhase::PrintIdeal)]),
            Err(RegistryError::DefaultOutsideClasses { .. })
        ));
    }

    #[test]
    fn entries_deserialize_from_json() {
        let entry: NodeEntry = serde_json::from_str(
            r#"{"name":"ALLOC","classes":["ideal"],"default_phase":"PRINT_IDEAL",
                "default_overrides":[{"flag":"X","value":"true","phase":"AFTER_PARSING"}]}"#,
        )
        .unwrap();
        assert_eq!(entry.default_phase, Some(CompilePhase::PrintIdeal));
        assert_eq!(entry.default_overrides[0].phase, CompilePhase::AfterParsing);
        assert!(entry.is_defined_in(CompilePhase::AfterParsing));
        assert!(!entry.is_defined_in(CompilePhase::FinalCode));
        assert!(!entry.is_defined_in(CompilePhase::Default));
    }
}
