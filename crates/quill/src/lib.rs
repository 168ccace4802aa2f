//! The Quill driver: the compilation pipeline behind the CLI.
//!
//! [`Compilation`] wires the stages together — parse, bind, optimize,
//! evaluate — with the abort policy from the pipeline contract: syntax
//! diagnostics stop binding from being consumed, semantic diagnostics stop
//! evaluation.

mod compiler;
mod render;

pub use compiler::{Compilation, EvaluationResult};
pub use quill_eval::{RuntimeError, Variables};
pub use quill_hir::Value;
pub use render::write_diagnostics;

#[cfg(test)]
mod compiler_tests;

#[cfg(test)]
mod prop_tests;
