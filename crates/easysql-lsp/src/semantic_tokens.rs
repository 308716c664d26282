//! Semantic token provider for EasySQL-aware highlighting.
//!
//! Walks the parsed tree and assigns a semantic type per meaningful token;
//! plain SQL spans are left to the client's regular SQL grammar. Best-effort:
//! tokens of malformed constructs still highlight with their intended role,
//! and additionally carry the `invalid` modifier.

use easysql_parser::{
    Condition, FuncCall, Node, Reference, Target, TargetContent, Token, TokenTag,
};
use tower_lsp::lsp_types::{SemanticToken, SemanticTokenModifier, SemanticTokenType};

use crate::document::Document;

/// Index into TOKEN_TYPES for each semantic category.
const TK_KEYWORD: u32 = 0;
const TK_VARIABLE: u32 = 1;
const TK_FUNCTION: u32 = 2;
const TK_PARAMETER: u32 = 3;
const TK_STRING: u32 = 4;
const TK_COMMENT: u32 = 5;
const TK_OPERATOR: u32 = 6;
const TK_MACRO: u32 = 7;
const TK_NAMESPACE: u32 = 8;

/// Semantic token types registered with the client.
pub static TOKEN_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::KEYWORD,   // 0
    SemanticTokenType::VARIABLE,  // 1
    SemanticTokenType::FUNCTION,  // 2
    SemanticTokenType::PARAMETER, // 3
    SemanticTokenType::STRING,    // 4
    SemanticTokenType::COMMENT,   // 5
    SemanticTokenType::OPERATOR,  // 6
    SemanticTokenType::MACRO,     // 7
    SemanticTokenType::NAMESPACE, // 8
];

/// Semantic token modifiers.
pub static TOKEN_MODIFIERS: &[SemanticTokenModifier] = &[
    SemanticTokenModifier::DECLARATION,      // bit 0
    SemanticTokenModifier::new("invalid"),   // bit 1
];

const MOD_DECLARATION: u32 = 1 << 0;
const MOD_INVALID: u32 = 1 << 1;

/// A raw token with absolute position before delta-encoding.
struct RawSemanticToken {
    line: u32,
    col: u32,
    length: u32,
    token_type: u32,
    modifiers: u32,
}

/// Compute delta-encoded semantic tokens for a parsed document.
pub fn compute(nodes: &[Node], doc: &Document) -> Vec<SemanticToken> {
    let mut raw = Vec::new();
    for node in nodes {
        walk(node, &mut raw, doc);
    }

    // LSP wants deltas from the previous token.
    let mut out = Vec::with_capacity(raw.len());
    let mut prev_line = 0u32;
    let mut prev_col = 0u32;
    for t in raw {
        let delta_line = t.line - prev_line;
        let delta_start = if delta_line == 0 { t.col - prev_col } else { t.col };
        out.push(SemanticToken {
            delta_line,
            delta_start,
            length: t.length,
            token_type: t.token_type,
            token_modifiers_bitset: t.modifiers,
        });
        prev_line = t.line;
        prev_col = t.col;
    }
    out
}

fn walk(node: &Node, out: &mut Vec<RawSemanticToken>, doc: &Document) {
    match node {
        Node::Sentinel(_) | Node::Any(_) => {}
        Node::Str(t) => push(out, doc, t, TK_STRING, 0),
        Node::Comment(c) => {
            for t in &c.start.tokens {
                push(out, doc, t, TK_COMMENT, 0);
            }
            push(out, doc, &c.text, TK_COMMENT, 0);
        }
        Node::Name(t) => push(out, doc, t, TK_VARIABLE, 0),
        Node::Lit(t) => push(out, doc, t, TK_PARAMETER, 0),
        Node::VarReference(r) | Node::TplReference(r) | Node::TplVarReference(r) => {
            walk_reference(r, TK_VARIABLE, out, doc);
        }
        Node::FuncCall(call) => walk_call(call, out, doc),
        Node::VarFuncCall(bc) | Node::TplFuncCall(bc) => {
            push_brackets(&bc.start.tokens, out, doc);
            walk_call(&bc.call, out, doc);
            push_brackets(&bc.end.tokens, out, doc);
        }
        Node::TplFuncArg(arg) => {
            push(out, doc, &arg.name, TK_PARAMETER, 0);
            push(out, doc, &arg.assignment, TK_OPERATOR, 0);
            walk(&arg.value, out, doc);
        }
        Node::Condition(cond) => walk_condition(cond, out, doc),
        Node::Target(target) => walk_target(target, out, doc),
        Node::Table(t) => {
            push(out, doc, &t.db, TK_NAMESPACE, 0);
            push(out, doc, &t.table, TK_VARIABLE, 0);
        }
        Node::FullTable(t) => {
            push(out, doc, &t.db, TK_NAMESPACE, 0);
            push(out, doc, &t.schema, TK_NAMESPACE, 0);
            push(out, doc, &t.table, TK_VARIABLE, 0);
        }
    }
}

fn walk_reference(r: &Reference, name_type: u32, out: &mut Vec<RawSemanticToken>, doc: &Document) {
    push_brackets(&r.start.tokens, out, doc);
    push(out, doc, &r.name, name_type, 0);
    push_brackets(&r.end.tokens, out, doc);
}

fn walk_call(call: &FuncCall, out: &mut Vec<RawSemanticToken>, doc: &Document) {
    push(out, doc, &call.name, TK_FUNCTION, 0);
    for arg in call.semantic_args() {
        walk(arg, out, doc);
    }
}

fn walk_condition(cond: &Condition, out: &mut Vec<RawSemanticToken>, doc: &Document) {
    for t in &cond.start.tokens {
        if t.tag() == TokenTag::Name {
            push(out, doc, t, TK_KEYWORD, 0);
        }
    }
    walk_call(&cond.call, out, doc);
}

fn walk_target(target: &Target, out: &mut Vec<RawSemanticToken>, doc: &Document) {
    for t in &target.header.tokens {
        match t.tag() {
            TokenTag::TargetStart | TokenTag::TargetName => {
                push(out, doc, t, TK_KEYWORD, MOD_DECLARATION);
            }
            _ => {}
        }
    }
    match &target.content {
        TargetContent::None => {}
        TargetContent::Named { name, .. } => push(out, doc, name, TK_VARIABLE, MOD_DECLARATION),
        TargetContent::Call { call, .. } => walk_call(call, out, doc),
        TargetContent::Output { table, .. } => walk(table, out, doc),
    }
    if let Some(cond) = &target.condition {
        walk_condition(cond, out, doc);
    }
}

fn push_brackets(tokens: &[Token], out: &mut Vec<RawSemanticToken>, doc: &Document) {
    for t in tokens {
        match t.tag() {
            TokenTag::VarOpen
            | TokenTag::TplOpen
            | TokenTag::TplVarOpen
            | TokenTag::BracketClose => push(out, doc, t, TK_MACRO, 0),
            _ => {}
        }
    }
}

fn push(out: &mut Vec<RawSemanticToken>, doc: &Document, token: &Token, token_type: u32, modifiers: u32) {
    // Clients do not handle multi-line or zero-length semantic tokens.
    if token.is_empty() || token.text().contains('\n') {
        return;
    }
    let modifiers = if token.is_valid() {
        modifiers
    } else {
        modifiers | MOD_INVALID
    };
    let pos = doc.position(token.start());
    let length: usize = token.text().chars().map(|c| c.len_utf16()).sum();
    out.push(RawSemanticToken {
        line: pos.line,
        col: pos.character,
        length: length as u32,
        token_type,
        modifiers,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use easysql_parser::parse;

    fn tokens(text: &str) -> Vec<SemanticToken> {
        let doc = Document::new(text.to_string(), 1);
        compute(&parse(text), &doc)
    }

    #[test]
    fn test_reference_tokens() {
        // `${`, `abc`, `}`
        let out = tokens("select ${abc}");
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].delta_start, 7);
        assert_eq!(out[1].token_type, TK_VARIABLE);
        assert_eq!(out[1].length, 3);
    }

    #[test]
    fn test_directive_tokens_carry_declaration() {
        let out = tokens("-- target=temp.stage");
        let kw: Vec<_> = out
            .iter()
            .filter(|t| t.token_type == TK_KEYWORD)
            .collect();
        assert_eq!(kw.len(), 2);
        assert!(kw.iter().all(|t| t.token_modifiers_bitset == MOD_DECLARATION));
    }

    #[test]
    fn test_invalid_token_carries_invalid_modifier() {
        // `1x` is not a valid name; it still highlights as a variable.
        let out = tokens("select ${1x}");
        assert_eq!(out[1].token_type, TK_VARIABLE);
        assert_eq!(out[1].token_modifiers_bitset, MOD_INVALID);

        let out = tokens("-- target=outputs");
        let kw = out
            .iter()
            .find(|t| t.token_type == TK_KEYWORD && t.length == 7)
            .unwrap();
        assert_eq!(kw.token_modifiers_bitset, MOD_DECLARATION | MOD_INVALID);
    }

    #[test]
    fn test_delta_encoding_across_lines() {
        let out = tokens("${a}\n${b}");
        // Second open bracket is on a new line at column 0.
        let second_open = &out[3];
        assert_eq!(second_open.delta_line, 1);
        assert_eq!(second_open.delta_start, 0);
    }

    #[test]
    fn test_multi_line_call_skips_spanning_tokens() {
        // No token of a multi-line template call crosses a line boundary,
        // so every emitted token must be single-line.
        let text = "@{f(a=1,\n b=2)}";
        let doc = Document::new(text.to_string(), 1);
        for t in compute(&parse(text), &doc) {
            assert!(t.length > 0);
        }
    }
}
