/// Body parser: recursive descent over non-directive text
///
/// Converts a contiguous run of SQL body text into an ordered node list that
/// covers it exactly, juggling three interacting concerns: line comments,
/// single-line string literals, and interpolation expressions (which stay
/// active inside terminated strings). Never raises for malformed DSL input;
/// diagnostics come from scanning the resulting tree for invalid tokens.
use std::sync::Arc;

use crate::ast::{Comment, Node, Sentinel};
use crate::expr::{parse_bracket_call_at, parse_var_at};
use crate::scanner::{
    find_closing_quote, find_comment_start, find_unterminated_quote, next_expr_match,
    ExprMatchKind,
};
use crate::token::{Token, TokenTag};

/// Default bound on nested re-parses (comment prefixes, quoted interiors).
/// Sequential lines do not consume depth; only true nesting does.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parse an isolated body region. Offsets in the result are relative to
/// `text`; use `Node::rebase` to stitch into a larger document.
pub fn parse_body(text: &str, ignore_comment: bool, ignore_quote: bool) -> Vec<Node> {
    parse_body_with_limit(text, ignore_comment, ignore_quote, DEFAULT_MAX_DEPTH)
}

/// `parse_body` with an explicit nesting bound.
pub fn parse_body_with_limit(
    text: &str,
    ignore_comment: bool,
    ignore_quote: bool,
    max_depth: usize,
) -> Vec<Node> {
    let source: Arc<str> = Arc::from(text);
    parse_body_range(
        &source,
        0,
        text.len(),
        !ignore_comment,
        !ignore_quote,
        max_depth,
        0,
    )
}

/// Parse `[start, end)` of `source`. `comments`/`quotes` gate the respective
/// sub-languages; `depth` counts nested re-parses.
pub(crate) fn parse_body_range(
    source: &Arc<str>,
    start: usize,
    end: usize,
    comments: bool,
    quotes: bool,
    max_depth: usize,
    depth: usize,
) -> Vec<Node> {
    let mut nodes = Vec::new();
    if start >= end {
        return nodes;
    }
    if depth > max_depth {
        // Too deeply nested: tolerate with one opaque span.
        nodes.push(Node::Any(Token::new(TokenTag::Any, start, end - start, source)));
        return nodes;
    }

    let mut pos = start;
    while pos < end {
        let line_end = source[pos..end]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(end);
        let line = &source[pos..line_end];

        if comments {
            if let Some(ci) = find_comment_start(line) {
                // Everything before the marker re-parses with comments off
                // (a second `--` in there is literal text).
                nodes.extend(parse_body_range(
                    source,
                    pos,
                    pos + ci,
                    false,
                    quotes,
                    max_depth,
                    depth + 1,
                ));
                let mut marker = Sentinel::new();
                marker.push(Token::new(TokenTag::CommentStart, pos + ci, 2, source));
                nodes.push(Node::Comment(Comment {
                    start: marker,
                    text: Token::new(
                        TokenTag::Any,
                        pos + ci + 2,
                        line_end - (pos + ci + 2),
                        source,
                    ),
                }));
                pos = line_end;
                continue;
            }
            if quotes {
                if let Some(qi) = find_unterminated_quote(line) {
                    // A string literal cannot span lines: the open quote
                    // consumes to end of line.
                    nodes.extend(parse_body_range(
                        source,
                        pos,
                        pos + qi,
                        comments,
                        false,
                        max_depth,
                        depth + 1,
                    ));
                    nodes.push(Node::Str(Token::new(
                        TokenTag::Any,
                        pos + qi,
                        line_end - (pos + qi),
                        source,
                    )));
                    pos = line_end;
                    continue;
                }
            }
        }

        match next_expr_match(&source[pos..end], line_end - pos, quotes) {
            None => {
                // No structure left on this line: one opaque span up to and
                // including its newline, then the next line independently.
                let chunk_end = if line_end < end { line_end + 1 } else { end };
                nodes.push(Node::Any(Token::new(
                    TokenTag::Any,
                    pos,
                    chunk_end - pos,
                    source,
                )));
                pos = chunk_end;
            }
            Some(m) => {
                let m_start = pos + m.start;
                let m_end = pos + m.end;
                if m.start > 0 {
                    nodes.push(Node::Any(Token::new(
                        TokenTag::Any,
                        pos,
                        m.start,
                        source,
                    )));
                }
                match m.kind {
                    ExprMatchKind::TplCall | ExprMatchKind::FuncCall => {
                        let node = match parse_bracket_call_at(source, m_start, m_end) {
                            Ok(node) => node,
                            Err(_) => unreachable!("call patterns guarantee a parseable call"),
                        };
                        nodes.push(node);
                        pos = m_end;
                    }
                    ExprMatchKind::VarRef => {
                        let node = match parse_var_at(source, m_start, m_end) {
                            Ok(node) => node,
                            Err(_) => unreachable!("the reference pattern guarantees the bracket shape"),
                        };
                        nodes.push(node);
                        pos = m_end;
                    }
                    ExprMatchKind::Quote => {
                        pos = parse_quoted(source, &mut nodes, m_start, line_end, max_depth, depth);
                    }
                }
            }
        }
    }

    nodes
}

/// Handle a quote found by the expression matcher. A terminated region is
/// re-entered with comments and quotes disabled (a `--` inside a string is
/// literal; `'${x}'` still interpolates); an unterminated one consumes to
/// end of line. Returns the position to resume at.
fn parse_quoted(
    source: &Arc<str>,
    nodes: &mut Vec<Node>,
    quote_at: usize,
    line_end: usize,
    max_depth: usize,
    depth: usize,
) -> usize {
    let quote = source.as_bytes()[quote_at];
    let close_at = match find_closing_quote(&source[quote_at + 1..line_end], quote) {
        Some(rel) => quote_at + 1 + rel,
        None => {
            nodes.push(Node::Str(Token::new(
                TokenTag::Any,
                quote_at,
                line_end - quote_at,
                source,
            )));
            return line_end;
        }
    };

    let mut inner = parse_body_range(
        source,
        quote_at + 1,
        close_at,
        false,
        false,
        max_depth,
        depth + 1,
    );
    // Opaque fragments inside a string are string content.
    for node in &mut inner {
        if let Node::Any(t) = node {
            *node = Node::Str(t.clone());
        }
    }

    // Fold the quote characters into the first/last fragment.
    match inner.first_mut() {
        Some(Node::Str(t)) if t.start() == quote_at + 1 => t.extend_left(),
        _ => inner.insert(
            0,
            Node::Str(Token::new(TokenTag::Any, quote_at, 1, source)),
        ),
    }
    match inner.last_mut() {
        Some(Node::Str(t)) if t.end() == close_at => t.extend_right(),
        _ => inner.push(Node::Str(Token::new(TokenTag::Any, close_at, 1, source))),
    }

    nodes.append(&mut inner);
    close_at + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::join_nodes;

    fn kinds(nodes: &[Node]) -> Vec<&'static str> {
        nodes
            .iter()
            .map(|n| match n {
                Node::Any(_) => "any",
                Node::Str(_) => "str",
                Node::Comment(_) => "comment",
                Node::VarReference(_) => "var",
                Node::TplReference(_) => "tpl",
                Node::TplVarReference(_) => "tplvar",
                Node::VarFuncCall(_) => "varcall",
                Node::TplFuncCall(_) => "tplcall",
                _ => "other",
            })
            .collect()
    }

    fn body(text: &str) -> Vec<Node> {
        let nodes = parse_body(text, false, false);
        assert_eq!(join_nodes(&nodes), text, "round trip failed");
        nodes
    }

    #[test]
    fn test_plain_sql_is_opaque() {
        let nodes = body("select 1 from t\nwhere x = 2");
        assert_eq!(kinds(&nodes), ["any", "any"]);
    }

    #[test]
    fn test_string_with_interpolation_and_comment() {
        let nodes = body("select ' ${abc}' from 123 -- comment");
        assert_eq!(kinds(&nodes), ["any", "str", "var", "str", "any", "comment"]);
        assert_eq!(nodes[0].join(), "select ");
        assert_eq!(nodes[1].join(), "' ");
        match &nodes[2] {
            Node::VarReference(r) => assert_eq!(r.name.text(), "abc"),
            other => panic!("expected VarReference, got {other:?}"),
        }
        assert_eq!(nodes[3].join(), "'");
        assert_eq!(nodes[4].join(), " from 123 ");
        match &nodes[5] {
            Node::Comment(c) => assert_eq!(c.text.text(), " comment"),
            other => panic!("expected Comment, got {other:?}"),
        }
    }

    #[test]
    fn test_comment_marker_inside_string_is_literal() {
        let nodes = body("select '--' from t");
        assert!(kinds(&nodes).contains(&"str"));
        assert!(!kinds(&nodes).contains(&"comment"));
    }

    #[test]
    fn test_unterminated_quote_consumes_to_end_of_line() {
        let nodes = body("select 'abc\nfrom t");
        assert_eq!(kinds(&nodes), ["any", "str", "any", "any"]);
        assert_eq!(nodes[1].join(), "'abc");
    }

    #[test]
    fn test_interpolations_in_plain_sql() {
        let nodes = body("select ${a}, #{b}, @{c} from t");
        assert_eq!(kinds(&nodes), ["any", "var", "any", "tplvar", "any", "tpl", "any"]);
    }

    #[test]
    fn test_calls_dispatch() {
        let nodes = body("${f(a)} and @{g(x=1)}");
        assert_eq!(kinds(&nodes), ["varcall", "any", "tplcall"]);
    }

    #[test]
    fn test_multi_line_template_call() {
        let nodes = body("@{g(a=1,\n  b=2)} rest");
        assert_eq!(kinds(&nodes), ["tplcall", "any"]);
        assert_eq!(nodes[0].join(), "@{g(a=1,\n  b=2)}");
    }

    #[test]
    fn test_empty_string_literal() {
        let nodes = body("x '' y");
        assert_eq!(kinds(&nodes), ["any", "str", "any"]);
        assert_eq!(nodes[1].join(), "''");
    }

    #[test]
    fn test_ignore_flags() {
        let nodes = parse_body("select '--' 1", true, true);
        assert_eq!(join_nodes(&nodes), "select '--' 1");
        // Comments off, quotes off: the marker and quotes are plain text.
        assert!(!kinds(&nodes).contains(&"comment"));
        assert!(!kinds(&nodes).contains(&"str"));
    }

    #[test]
    fn test_depth_limit_degrades_to_opaque() {
        // Each quoted interior costs one level of nesting.
        let text = "'a' 'b' 'c'";
        let nodes = parse_body_with_limit(text, false, false, 0);
        assert_eq!(join_nodes(&nodes), text);
    }

    #[test]
    fn test_directive_line_in_body_is_a_comment() {
        // The body parser knows nothing about directives.
        let nodes = body("-- target=variables");
        assert_eq!(kinds(&nodes), ["comment"]);
    }

    #[test]
    fn test_trailing_newline_round_trip() {
        body("select 1\n");
        body("\n\n");
        body("");
    }
}
