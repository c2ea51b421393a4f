//! IR rule declarations and their checking pipeline: parse, validate,
//! resolve, then build and evaluate phase rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use irmatch_dsl::ast::RawDeclaration;
use irmatch_dsl::{parse_declaration, CompilePhase};

use crate::builder::build_phase_rules;
use crate::catalog::{NodeCatalog, VmInfo};
use crate::compilation::Compilation;
use crate::errors::{DeclarationError, RuleError, RuleErrors};
use crate::resolve::{resolve_default_phases, resolve_explicit_phases, PhaseBuckets};
use crate::result::{RuleOutcome, RuleReport};
use crate::rule::{evaluate, evaluate_parallel};
use crate::validate::validate_constraints;

/// The phases an IR rule targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phases {
    /// Each node is checked in its default phase.
    Default,
    Explicit(BTreeSet<CompilePhase>),
}

impl Phases {
    /// An empty list means `DEFAULT`.
    pub fn from_declared(declared: &[CompilePhase]) -> Result<Self, DeclarationError> {
        let mut seen = BTreeSet::new();
        for &phase in declared {
            if !seen.insert(phase) {
                return Err(DeclarationError::DuplicatePhase { phase });
            }
        }
        if !seen.contains(&CompilePhase::Default) {
            return Ok(if seen.is_empty() {
                Phases::Default
            } else {
                Phases::Explicit(seen)
            });
        }
        match seen.iter().find(|p| !p.is_default()) {
            Some(&phase) => Err(DeclarationError::MixedDefaultPhase { phase }),
            None => Ok(Phases::Default),
        }
    }
}

/// `applyIf` condition: the rule only applies while `flag` has `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagCondition {
    pub flag: String,
    pub value: String,
}

impl FlagCondition {
    pub fn new(flag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            value: value.into(),
        }
    }

    pub fn holds(&self, vm: &dyn VmInfo) -> bool {
        vm.flag(&self.flag) == Some(self.value.as_str())
    }
}

/// An IR rule as written by a test author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub phases: Vec<CompilePhase>,
    #[serde(default)]
    pub fail_on: String,
    #[serde(default)]
    pub counts: String,
    #[serde(default)]
    pub apply_if: Vec<FlagCondition>,
}

impl RuleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn phases(mut self, phases: impl IntoIterator<Item = CompilePhase>) -> Self {
        self.phases = phases.into_iter().collect();
        self
    }

    pub fn fail_on(mut self, fail_on: impl Into<String>) -> Self {
        self.fail_on = fail_on.into();
        self
    }

    pub fn counts(mut self, counts: impl Into<String>) -> Self {
        self.counts = counts.into();
        self
    }

    pub fn apply_if(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.apply_if.push(FlagCondition::new(flag, value));
        self
    }
}

/// A declaration that parsed and passed validation.
#[derive(Debug, Clone)]
pub struct IrRule {
    index: usize,
    name: Option<String>,
    phases: Phases,
    constraints: RawDeclaration,
    apply_if: Vec<FlagCondition>,
}

impl IrRule {
    pub fn new(
        index: usize,
        decl: &RuleDeclaration,
        vm: &dyn VmInfo,
    ) -> Result<Self, DeclarationError> {
        let phases = Phases::from_declared(&decl.phases)?;
        let constraints = parse_declaration(&decl.fail_on, &decl.counts)?;
        if constraints.is_empty() {
            return Err(DeclarationError::EmptyRule);
        }
        validate_constraints(&constraints.fail_on, &constraints.counts)?;

        if let Phases::Explicit(rule_phases) = &phases {
            for constraint in constraints.iter() {
                let outside = constraint
                    .phases
                    .iter()
                    .flatten()
                    .find(|p| !rule_phases.contains(*p));
                if let Some(&phase) = outside {
                    return Err(DeclarationError::PrefixOutsideRule {
                        node: constraint.node.clone(),
                        phase,
                    });
                }
            }
        }

        if let Some(unknown) = decl.apply_if.iter().find(|c| vm.flag(&c.flag).is_none()) {
            return Err(DeclarationError::UnknownFlag {
                flag: unknown.flag.clone(),
            });
        }

        Ok(Self {
            index,
            name: decl.name.clone(),
            phases,
            constraints,
            apply_if: decl.apply_if.clone(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn phases(&self) -> &Phases {
        &self.phases
    }

    pub fn constraints(&self) -> &RawDeclaration {
        &self.constraints
    }

    pub fn is_applicable(&self, vm: &dyn VmInfo) -> bool {
        self.apply_if.iter().all(|c| c.holds(vm))
    }

    pub fn resolve(
        &self,
        vm: &dyn VmInfo,
        catalog: &dyn NodeCatalog,
    ) -> Result<PhaseBuckets, DeclarationError> {
        let buckets = match &self.phases {
            Phases::Default => resolve_default_phases(&self.constraints, vm, catalog)?,
            Phases::Explicit(phases) => {
                resolve_explicit_phases(&self.constraints, phases, catalog)?
            }
        };
        Ok(buckets)
    }

    fn error(&self, error: DeclarationError) -> RuleError {
        RuleError {
            rule_index: self.index,
            name: self.name.clone(),
            error,
        }
    }
}

/// How phase rules are evaluated once built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvalMode {
    #[default]
    Sequential,
    Parallel,
}

/// A rule ready to be checked: its buckets, or `None` if it does not apply
/// under the current VM flags.
#[derive(Debug, Clone)]
pub struct PreparedRule {
    pub rule: IrRule,
    pub buckets: Option<PhaseBuckets>,
}

/// Parse, validate and resolve every declaration without touching any
/// compiler output. All rejected declarations are reported together.
pub fn prepare_rules(
    decls: &[RuleDeclaration],
    vm: &dyn VmInfo,
    catalog: &dyn NodeCatalog,
) -> Result<Vec<PreparedRule>, RuleErrors> {
    let mut prepared = Vec::with_capacity(decls.len());
    let mut errors = Vec::new();
    for (i, decl) in decls.iter().enumerate() {
        let rule = match IrRule::new(i + 1, decl, vm) {
            Ok(rule) => rule,
            Err(error) => {
                errors.push(RuleError {
                    rule_index: i + 1,
                    name: decl.name.clone(),
                    error,
                });
                continue;
            }
        };
        if !rule.is_applicable(vm) {
            debug!("IR rule {} does not apply under the current flags", rule.index);
            prepared.push(PreparedRule {
                rule,
                buckets: None,
            });
            continue;
        }
        match rule.resolve(vm, catalog) {
            Ok(buckets) => prepared.push(PreparedRule {
                rule,
                buckets: Some(buckets),
            }),
            Err(error) => errors.push(rule.error(error)),
        }
    }
    if errors.is_empty() {
        Ok(prepared)
    } else {
        Err(RuleErrors { errors })
    }
}

/// Check `decls` against one compilation, one report per declaration in
/// declaration order.
///
/// Every declaration is validated and resolved before the first phase
/// output is requested from `compilation`.
pub fn check_rules(
    decls: &[RuleDeclaration],
    vm: &dyn VmInfo,
    catalog: &dyn NodeCatalog,
    compilation: &dyn Compilation,
    mode: EvalMode,
) -> Result<Vec<RuleReport>, RuleErrors> {
    let prepared = prepare_rules(decls, vm, catalog)?;
    Ok(prepared
        .into_iter()
        .map(|PreparedRule { rule, buckets }| {
            let outcome = match buckets {
                None => RuleOutcome::NotApplicable,
                Some(buckets) => {
                    let phase_rules = build_phase_rules(buckets, compilation);
                    let results = match mode {
                        EvalMode::Sequential => evaluate(&phase_rules),
                        EvalMode::Parallel => evaluate_parallel(&phase_rules),
                    };
                    RuleOutcome::Evaluated(results)
                }
            };
            let report = RuleReport {
                rule_index: rule.index,
                name: rule.name,
                outcome,
            };
            info!(
                "IR rule {}: {}",
                report.rule_index,
                match &report.outcome {
                    RuleOutcome::NotApplicable => "not applicable",
                    RuleOutcome::Evaluated(_) if report.is_failure() => "failed",
                    RuleOutcome::Evaluated(_) => "passed",
                }
            );
            report
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NodeEntry, NodeRegistry, VmConfig};
    use crate::validate::ValidationError;
    use irmatch_dsl::OutputClass;

    fn registry() -> NodeRegistry {
        NodeRegistry::new([
            NodeEntry::new("LOAD")
                .with_class(OutputClass::Ideal)
                .with_default(CompilePhase::PrintIdeal),
            NodeEntry::new("compI_rReg")
                .with_class(OutputClass::Mach)
                .with_default(CompilePhase::FinalCode),
        ])
        .unwrap()
    }

    #[test]
    fn phases_from_declared() {
        assert_eq!(Phases::from_declared(&[]).unwrap(), Phases::Default);
        assert_eq!(
            Phases::from_declared(&[CompilePhase::Default]).unwrap(),
            Phases::Default
        );
        assert_eq!(
            Phases::from_declared(&[CompilePhase::FinalCode, CompilePhase::AfterParsing]).unwrap(),
            Phases::Explicit(BTreeSet::from([
                CompilePhase::AfterParsing,
                CompilePhase::FinalCode
            ]))
        );
    }

    #[test]
    fn duplicate_explicit_phase_is_rejected() {
        let err =
            Phases::from_declared(&[CompilePhase::FinalCode, CompilePhase::FinalCode]).unwrap_err();
        assert!(matches!(
            err,
            DeclarationError::DuplicatePhase {
                phase: CompilePhase::FinalCode
            }
        ));
        assert!(matches!(
            Phases::from_declared(&[CompilePhase::Default, CompilePhase::Default]),
            Err(DeclarationError::DuplicatePhase { .. })
        ));
    }

    #[test]
    fn default_mixed_with_explicit_is_rejected() {
        assert!(matches!(
            Phases::from_declared(&[CompilePhase::Default, CompilePhase::PrintIdeal]),
            Err(DeclarationError::MixedDefaultPhase {
                phase: CompilePhase::PrintIdeal
            })
        ));
    }

    #[test]
    fn empty_rule_is_rejected() {
        let reg = registry();
        let vm = VmConfig::new(&reg);
        let err = IrRule::new(1, &RuleDeclaration::new(), &vm).unwrap_err();
        assert!(matches!(err, DeclarationError::EmptyRule));
    }

    #[test]
    fn validation_error_surfaces_as_declaration_error() {
        let reg = registry();
        let vm = VmConfig::new(&reg);
        let decl = RuleDeclaration::new().fail_on("LOAD").counts("LOAD >= 1");
        let err = IrRule::new(1, &decl, &vm).unwrap_err();
        assert!(matches!(
            err,
            DeclarationError::Validation(ValidationError::FailOnContradiction { .. })
        ));
    }

    #[test]
    fn prefix_must_name_a_rule_phase() {
        let reg = registry();
        let vm = VmConfig::new(&reg);
        let decl = RuleDeclaration::new()
            .phases([CompilePhase::PrintIdeal])
            .counts("AFTER_PARSING:LOAD = 1");
        let err = IrRule::new(1, &decl, &vm).unwrap_err();
        assert!(matches!(
            err,
            DeclarationError::PrefixOutsideRule {
                phase: CompilePhase::AfterParsing,
                ..
            }
        ));
    }

    #[test]
    fn apply_if_needs_known_flags() {
        let reg = registry();
        let vm = VmConfig::new(&reg).with_flag("UseAVX", "2");
        let decl = RuleDeclaration::new()
            .counts("LOAD = 1")
            .apply_if("UseSSE", "4");
        assert!(matches!(
            IrRule::new(1, &decl, &vm),
            Err(DeclarationError::UnknownFlag { .. })
        ));

        let decl = RuleDeclaration::new()
            .counts("LOAD = 1")
            .apply_if("UseAVX", "3");
        let rule = IrRule::new(1, &decl, &vm).unwrap();
        assert!(!rule.is_applicable(&vm));
        let decl = RuleDeclaration::new()
            .counts("LOAD = 1")
            .apply_if("UseAVX", "2");
        assert!(IrRule::new(1, &decl, &vm).unwrap().is_applicable(&vm));
    }

    #[test]
    fn prepare_collects_errors_from_every_rule() {
        let reg = registry();
        let vm = VmConfig::new(&reg);
        let decls = [
            RuleDeclaration::new().counts("LOAD = 1"),
            RuleDeclaration::new().named("bad").counts("LOAD = 1, LOAD = 1"),
            RuleDeclaration::new().counts("NOPE >= 1"),
        ];
        let errs = prepare_rules(&decls, &vm, &vm).unwrap_err();
        let indices: Vec<usize> = errs.errors.iter().map(|e| e.rule_index).collect();
        assert_eq!(indices, vec![2, 3]);
        assert_eq!(errs.errors[0].name.as_deref(), Some("bad"));
        assert!(matches!(errs.errors[1].error, DeclarationError::Resolve(_)));
    }

    #[test]
    fn declarations_deserialize_with_defaults() {
        let decl: RuleDeclaration = serde_json::from_str(
            r#"{"counts": "LOAD = 1", "phases": ["PRINT_IDEAL"],
                "apply_if": [{"flag": "UseAVX", "value": "2"}]}"#,
        )
        .unwrap();
        assert_eq!(decl.fail_on, "");
        assert_eq!(decl.phases, vec![CompilePhase::PrintIdeal]);
        assert_eq!(decl.apply_if[0], FlagCondition::new("UseAVX", "2"));
        assert!(serde_json::from_str::<RuleDeclaration>(r#"{"count": "LOAD = 1"}"#).is_err());
    }
}
