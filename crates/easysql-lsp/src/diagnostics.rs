//! Diagnostics from token validity.
//!
//! The parser never fails; malformed input shows up as tokens whose text
//! does not satisfy their syntactic role. One diagnostic per invalid token,
//! capped by the client-configured problem limit.

use easysql_parser::{flatten_tokens, Node};
use lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use crate::document::Document;

pub fn collect(nodes: &[Node], doc: &Document, max_problems: usize) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for token in flatten_tokens(nodes) {
        if out.len() >= max_problems {
            break;
        }
        if let Some(reason) = token.invalid_reason() {
            out.push(Diagnostic {
                range: Range {
                    start: doc.position(token.start()),
                    end: doc.position(token.end()),
                },
                severity: Some(DiagnosticSeverity::ERROR),
                message: reason,
                source: Some("easysql".to_string()),
                ..Default::default()
            });
        }
    }
    out
}
