//! Lexer, token definitions and the recursive-descent parser for Quill.
//!
//! [`SyntaxTree::parse`] is the entry point: it lexes and parses in one go
//! and never fails — malformed input produces placeholder nodes plus
//! diagnostics, so downstream stages always have a well-formed tree to work
//! with.

pub mod facts;
pub mod lexer;
pub mod parser;
pub mod token;

pub use parser::SyntaxTree;
pub use token::{Token, TokenKind};
