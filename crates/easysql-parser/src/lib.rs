/// easysql-parser - tolerant parser for EasySQL files
///
/// EasySQL files are SQL scripts segmented by `-- target=...` directive
/// lines, with `${var}`, `@{tpl}` and `#{tplvar}` interpolation expressions
/// in the body text.
///
/// The parser provides:
/// - Lossless trees: joining every token reproduces the input exactly
/// - Error recovery: malformed input still yields a best-effort tree,
///   flagged through token validity rather than parse failures
/// - Absolute position tracking for diagnostics and IDE features
///
/// This crate is standalone and can be used independently of the LSP.
pub mod ast;
pub mod body;
pub mod cache;
pub mod expr;
pub mod parser;
pub mod scanner;
pub mod target;
pub mod token;

pub use ast::*;
pub use body::{parse_body, parse_body_with_limit, DEFAULT_MAX_DEPTH};
pub use cache::AstCache;
pub use expr::{parse_single_call, parse_single_var};
pub use parser::{parse, parse_with_limit};
pub use target::{accept_target, parse_target};
pub use token::{Token, TokenTag, TARGET_KEYWORDS};

use thiserror::Error;

/// Hard parse failures. These only arise from the strict entry points
/// (`parse_single_call`, `parse_single_var`, `parse_target`); the document
/// parsers recover from everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected '(' in call expression")]
    MissingOpenParen,
    #[error("expected ')' in call expression")]
    MissingCloseParen,
    #[error("not an interpolation expression")]
    MalformedReference,
    #[error("not a target directive")]
    NotADirective,
}
