//! The bound (typed, resolved) program representation for Quill.
//!
//! This is the boundary between the binder and the back half of the
//! pipeline: expressions carry resolved static types, statements reference
//! interned symbols instead of raw tokens, and structured control flow has a
//! lowered label/goto form. The generic [`BoundTreeRewriter`] lives here so
//! both the lowerer and the optimizer can specialize it.

pub mod literal_eval;
pub mod node;
pub mod ops;
pub mod print;
pub mod rewrite;
pub mod symbols;
pub mod types;
pub mod value;

pub use node::{BoundExpr, BoundMethod, BoundProgram, BoundStmt};
pub use ops::{
    BoundBinaryOperator, BoundBinaryOperatorKind, BoundUnaryOperator, BoundUnaryOperatorKind,
};
pub use rewrite::BoundTreeRewriter;
pub use symbols::{Builtin, LabelSymbol, MethodSymbol, SymbolId, VariableSymbol};
pub use types::{Conversion, Type};
pub use value::Value;
