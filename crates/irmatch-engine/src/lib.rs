//! IR rule checking engine.
//!
//! Validates fail-on and counts declarations, resolves them to concrete
//! compile phases through a node catalog and VM configuration, and checks
//! the resulting phase rules against captured compiler output.

pub mod bitvec;
pub mod builder;
pub mod catalog;
pub mod compilation;
pub mod constraint;
pub mod declaration;
pub mod errors;
pub mod matcher;
pub mod resolve;
pub mod result;
pub mod rule;
pub mod validate;

pub use catalog::{NodeCatalog, NodeEntry, NodeRegistry, VmConfig, VmInfo};
pub use compilation::{CapturedCompilation, Compilation};
pub use declaration::{check_rules, prepare_rules, EvalMode, IrRule, Phases, RuleDeclaration};
pub use errors::{DeclarationError, RuleError, RuleErrors};
pub use result::{PhaseOutcome, PhaseResult, RuleOutcome, RuleReport};
