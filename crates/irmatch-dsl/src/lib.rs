//! Declaration language for IR rules: compile phases, fail-on and counts
//! lists, and their parse errors.

pub mod ast;
pub mod errors;
pub mod parser;
pub mod phase;

pub use parser::{parse_counts, parse_declaration, parse_fail_on};
pub use phase::{CompilePhase, OutputClass};
