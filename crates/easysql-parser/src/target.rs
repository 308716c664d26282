/// Directive (target) parser: `-- target=<kind>...` header lines
///
/// Fixed-grammar state machine over one directive-prefixed line. Tolerant by
/// policy: anything after the recognized prefix that does not parse becomes
/// an absorbed-garbage sentinel, so diagnostics can flag just the junk
/// instead of failing the whole line.
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{
    Condition, FullTable, Node, Sentinel, Table, Target, TargetContent, TargetKind,
};
use crate::expr::{parse_bare_call, ArgStyle};
use crate::token::{Token, TokenTag};
use crate::ParseError;

/// `-- target=<word>`.
static TARGET_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-- target=(\w+)").unwrap());

/// Trailing-condition separator: `,` then `if=`.
static COND_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*),(\s*)if=").unwrap());

/// A call-shaped remainder: `<anything-but-comma>(<anything-but-close-paren>)`.
static CALL_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^,\n]*\([^)\n]*\)").unwrap());

/// Same, with the leading dot of directive content.
static DOT_CALL_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.[^,\n]*\([^)\n]*\)").unwrap());

/// Up to three dot-separated output segments.
static OUTPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.([^.\s,]*)(?:\.([^.\s,]*))?(?:\.([^.\s,]*))?").unwrap());

/// Whether `text` begins with a directive header line.
pub fn accept_target(text: &str) -> bool {
    TARGET_HEAD_RE.is_match(text)
}

/// Parse a single directive header line. Only the first line of `text` is
/// considered; the directive grammar never spans lines.
pub fn parse_target(text: &str) -> Result<Node, ParseError> {
    let line_len = text.find('\n').unwrap_or(text.len());
    if !accept_target(&text[..line_len]) {
        return Err(ParseError::NotADirective);
    }
    let source: Arc<str> = Arc::from(text);
    Ok(parse_target_at(&source, 0, line_len))
}

/// Parse `[start, end)` (one line, pre-checked by `accept_target`).
pub(crate) fn parse_target_at(source: &Arc<str>, start: usize, end: usize) -> Node {
    let line = &source[start..end];
    let caps = TARGET_HEAD_RE
        .captures(line)
        .unwrap_or_else(|| unreachable!("parse_target_at is gated by accept_target"));
    let kw_range = caps.get(1).map(|m| (m.start(), m.end())).unwrap_or((10, 10));
    let keyword = &line[kw_range.0..kw_range.1];
    let kind = TargetKind::from_keyword(keyword);

    let mut header = Sentinel::new();
    header.push(Token::new(TokenTag::TargetStart, start, 9, source));
    header.push(Token::new(TokenTag::Assignment, start + 9, 1, source));
    header.push(Token::new(
        TokenTag::TargetName,
        start + kw_range.0,
        kw_range.1 - kw_range.0,
        source,
    ));

    let rest_start = start + kw_range.1;

    let (content, after_content) = match kind {
        TargetKind::Variables | TargetKind::ListVariables => (TargetContent::None, rest_start),
        TargetKind::Template
        | TargetKind::Log
        | TargetKind::Action
        | TargetKind::Temp
        | TargetKind::Cache
        | TargetKind::Broadcast => parse_named_content(source, rest_start, end),
        TargetKind::Check | TargetKind::Func => {
            // A call-shaped remainder is a function check/definition; anything
            // else reuses the simple-named path so partial input still parses.
            if DOT_CALL_SHAPE_RE.is_match(&source[rest_start..end]) {
                parse_call_content(source, rest_start, end)
            } else {
                parse_named_content(source, rest_start, end)
            }
        }
        TargetKind::Output => parse_output_content(source, rest_start, end),
        TargetKind::Unrecognized => (TargetContent::None, rest_start),
    };

    let (condition, trailing) = match kind {
        TargetKind::Unrecognized => (None, garbage_sentinel(source, after_content, end)),
        _ => parse_condition_or_garbage(source, after_content, end),
    };

    Node::Target(Target {
        kind,
        header,
        content,
        condition,
        trailing,
    })
}

/// Optional `.<name>`; dot and name are zero-length placeholders when absent
/// so downstream code can always address the name token.
fn parse_named_content(source: &Arc<str>, start: usize, end: usize) -> (TargetContent, usize) {
    let rest = &source[start..end];
    if !rest.starts_with('.') {
        return (
            TargetContent::Named {
                dot: Token::empty(TokenTag::Dot, start, source),
                name: Token::empty(TokenTag::Name, start, source),
            },
            start,
        );
    }
    let name_rel = rest[1..]
        .find(|c: char| c.is_whitespace() || c == ',')
        .unwrap_or(rest.len() - 1);
    (
        TargetContent::Named {
            dot: Token::new(TokenTag::Dot, start, 1, source),
            name: Token::new(TokenTag::Name, start + 1, name_rel, source),
        },
        start + 1 + name_rel,
    )
}

/// `.func(args)` content for `check` and `func` directives.
fn parse_call_content(source: &Arc<str>, start: usize, end: usize) -> (TargetContent, usize) {
    let m = DOT_CALL_SHAPE_RE
        .find(&source[start..end])
        .unwrap_or_else(|| unreachable!("gated by the call-shape pre-check"));
    let call_end = start + m.end();
    let (call, consumed) = match parse_bare_call(source, start + 1, call_end, ArgStyle::Positional)
    {
        Ok(parsed) => parsed,
        Err(_) => unreachable!("call shape guarantees both parens"),
    };
    (
        TargetContent::Call {
            dot: Token::new(TokenTag::Dot, start, 1, source),
            call,
        },
        consumed,
    )
}

/// `.db.table` / `.db.schema.table` content for `output`.
fn parse_output_content(source: &Arc<str>, start: usize, end: usize) -> (TargetContent, usize) {
    let rest = &source[start..end];
    let caps = match OUTPUT_RE.captures(rest) {
        Some(caps) if rest.starts_with('.') => caps,
        _ => {
            // Nothing usable: empty placeholders at the keyword's end.
            let table = Table {
                db: Token::empty(TokenTag::Name, start, source),
                sep: Token::empty(TokenTag::Dot, start, source),
                table: Token::empty(TokenTag::Name, start, source),
            };
            return (
                TargetContent::Output {
                    dot: Token::empty(TokenTag::Dot, start, source),
                    table: Box::new(Node::Table(table)),
                },
                start,
            );
        }
    };

    let dot = Token::new(TokenTag::Dot, start, 1, source);
    let seg = |m: &regex::Match| {
        Token::new(TokenTag::Name, start + m.start(), m.len(), source)
    };
    let sep_before = |m: &regex::Match| Token::new(TokenTag::Dot, start + m.start() - 1, 1, source);

    let g1 = caps.get(1).expect("group 1 always participates");
    let (node, consumed) = match (caps.get(2), caps.get(3)) {
        (Some(g2), Some(g3)) => (
            Node::FullTable(FullTable {
                db: seg(&g1),
                sep1: sep_before(&g2),
                schema: seg(&g2),
                sep2: sep_before(&g3),
                table: seg(&g3),
            }),
            start + g3.end(),
        ),
        (Some(g2), None) => (
            Node::Table(Table {
                db: seg(&g1),
                sep: sep_before(&g2),
                table: seg(&g2),
            }),
            start + g2.end(),
        ),
        _ => (
            Node::Table(Table {
                db: seg(&g1),
                sep: Token::empty(TokenTag::Dot, start + g1.end(), source),
                table: Token::empty(TokenTag::Name, start + g1.end(), source),
            }),
            start + g1.end(),
        ),
    };

    (
        TargetContent::Output {
            dot,
            table: Box::new(node),
        },
        consumed,
    )
}

/// Shared trailing grammar: `,` `if=` call, all-or-nothing. A present
/// separator with a malformed call degrades the whole remainder to garbage
/// rather than a partial condition.
fn parse_condition_or_garbage(
    source: &Arc<str>,
    start: usize,
    end: usize,
) -> (Option<Condition>, Sentinel) {
    if start >= end {
        return (None, Sentinel::new());
    }
    let rest = &source[start..end];
    let caps = match COND_SEP_RE.captures(rest) {
        Some(caps) => caps,
        None => return (None, garbage_sentinel(source, start, end)),
    };

    let sep_end = caps.get(0).expect("group 0 always participates").end();
    let call_start = start + sep_end;
    let call_shape = match CALL_SHAPE_RE.find(&source[call_start..end]) {
        Some(m) => m,
        None => return (None, garbage_sentinel(source, start, end)),
    };
    let call_end = call_start + call_shape.end();

    let mut cond_start = Sentinel::new();
    let ws1 = caps.get(1).expect("group 1 always participates");
    if !ws1.is_empty() {
        cond_start.push(Token::new(TokenTag::Whitespace, start + ws1.start(), ws1.len(), source));
    }
    cond_start.push(Token::new(TokenTag::Comma, start + ws1.end(), 1, source));
    let ws2 = caps.get(2).expect("group 2 always participates");
    if !ws2.is_empty() {
        cond_start.push(Token::new(TokenTag::Whitespace, start + ws2.start(), ws2.len(), source));
    }
    // `if=` sits right before the call.
    cond_start.push(Token::new(TokenTag::Name, call_start - 3, 2, source));
    cond_start.push(Token::new(TokenTag::Assignment, call_start - 1, 1, source));

    let (call, _) = match parse_bare_call(source, call_start, call_end, ArgStyle::Positional) {
        Ok(parsed) => parsed,
        Err(_) => unreachable!("call shape guarantees both parens"),
    };

    (
        Some(Condition {
            start: cond_start,
            call,
            end: garbage_sentinel(source, call_end, end),
        }),
        Sentinel::new(),
    )
}

/// Absorb `[start, end)` as garbage: leading whitespace, then a wide-name
/// token whose validity check surfaces structural characters in the junk.
fn garbage_sentinel(source: &Arc<str>, start: usize, end: usize) -> Sentinel {
    let mut sentinel = Sentinel::new();
    if start >= end {
        return sentinel;
    }
    let rest = &source[start..end];
    let lead = rest.len() - rest.trim_start().len();
    if lead > 0 {
        sentinel.push(Token::new(TokenTag::Whitespace, start, lead, source));
    }
    if start + lead < end {
        sentinel.push(Token::new(
            TokenTag::NameWide,
            start + lead,
            end - start - lead,
            source,
        ));
    }
    sentinel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(text: &str) -> Target {
        match parse_target(text).unwrap() {
            Node::Target(t) => t,
            other => panic!("expected Target, got {other:?}"),
        }
    }

    fn round_trip(text: &str) {
        assert_eq!(parse_target(text).unwrap().join(), text);
    }

    #[test]
    fn test_accept() {
        assert!(accept_target("-- target=variables"));
        assert!(accept_target("-- target=bogus stuff"));
        assert!(!accept_target("-- target="));
        assert!(!accept_target("--target=variables"));
        assert!(!accept_target("select 1"));
    }

    #[test]
    fn test_variables_with_condition() {
        let t = target("-- target=variables , if=bool()");
        assert_eq!(t.kind, TargetKind::Variables);
        assert!(matches!(t.content, TargetContent::None));
        let cond = t.condition.as_ref().unwrap();
        assert_eq!(cond.call.name.text(), "bool");
        assert_eq!(cond.call.semantic_args().count(), 0);
        round_trip("-- target=variables , if=bool()");
    }

    #[test]
    fn test_simple_named() {
        let t = target("-- target=template.dim_cols");
        assert_eq!(t.kind, TargetKind::Template);
        assert_eq!(t.name_token().unwrap().text(), "dim_cols");
        round_trip("-- target=template.dim_cols");
    }

    #[test]
    fn test_named_placeholders_when_absent() {
        let t = target("-- target=log");
        match &t.content {
            TargetContent::Named { dot, name } => {
                assert!(dot.is_empty());
                assert!(name.is_empty());
                assert!(!name.is_valid());
            }
            other => panic!("expected Named, got {other:?}"),
        }
        round_trip("-- target=log");
    }

    #[test]
    fn test_output_full_table() {
        let t = target("-- target=output.a.bc.bcd");
        assert_eq!(t.kind, TargetKind::Output);
        match &t.content {
            TargetContent::Output { table, .. } => match table.as_ref() {
                Node::FullTable(ft) => {
                    assert_eq!(ft.db.text(), "a");
                    assert_eq!(ft.schema.text(), "bc");
                    assert_eq!(ft.table.text(), "bcd");
                }
                other => panic!("expected FullTable, got {other:?}"),
            },
            other => panic!("expected Output, got {other:?}"),
        }
        round_trip("-- target=output.a.bc.bcd");
    }

    #[test]
    fn test_output_two_segments() {
        let t = target("-- target=output.db.events");
        match &t.content {
            TargetContent::Output { table, .. } => match table.as_ref() {
                Node::Table(tb) => {
                    assert_eq!(tb.db.text(), "db");
                    assert_eq!(tb.table.text(), "events");
                }
                other => panic!("expected Table, got {other:?}"),
            },
            other => panic!("expected Output, got {other:?}"),
        }
        round_trip("-- target=output.db.events");
    }

    #[test]
    fn test_output_bare() {
        let t = target("-- target=output");
        match &t.content {
            TargetContent::Output { dot, table } => {
                assert!(dot.is_empty());
                match table.as_ref() {
                    Node::Table(tb) => {
                        assert!(tb.db.is_empty());
                        assert!(tb.table.is_empty());
                    }
                    other => panic!("expected Table, got {other:?}"),
                }
            }
            other => panic!("expected Output, got {other:?}"),
        }
        round_trip("-- target=output");
    }

    #[test]
    fn test_check_function_call() {
        let t = target("-- target=check.not_empty(${table})");
        assert_eq!(t.kind, TargetKind::Check);
        match &t.content {
            TargetContent::Call { call, .. } => {
                assert_eq!(call.name.text(), "not_empty");
                let args: Vec<_> = call.semantic_args().collect();
                assert!(matches!(args[0], Node::VarReference(_)));
            }
            other => panic!("expected Call, got {other:?}"),
        }
        round_trip("-- target=check.not_empty(${table})");
    }

    #[test]
    fn test_check_named() {
        let t = target("-- target=check.row_count");
        assert!(matches!(t.content, TargetContent::Named { .. }));
        round_trip("-- target=check.row_count");
    }

    #[test]
    fn test_malformed_check_degrades_to_named() {
        // Unterminated call: the content becomes a named check whose name
        // token carries the invalid text rather than a parse failure.
        let t = target("-- target=check.a(, bc");
        match &t.content {
            TargetContent::Named { name, .. } => {
                assert_eq!(name.text(), "a(");
                assert!(!name.is_valid());
            }
            other => panic!("expected Named, got {other:?}"),
        }
        // The rest is absorbed garbage, flagged through the wide-name token.
        assert!(t.trailing.tokens.iter().any(|tok| !tok.is_valid()));
        round_trip("-- target=check.a(, bc");
    }

    #[test]
    fn test_func_call() {
        let t = target("-- target=func.refresh(${a}, b)");
        assert_eq!(t.kind, TargetKind::Func);
        assert!(matches!(t.content, TargetContent::Call { .. }));
        round_trip("-- target=func.refresh(${a}, b)");
    }

    #[test]
    fn test_unrecognized_keyword() {
        let t = target("-- target=outputs.a.b");
        assert_eq!(t.kind, TargetKind::Unrecognized);
        let kw = t.keyword_token().unwrap();
        assert_eq!(kw.text(), "outputs");
        assert!(!kw.is_valid());
        round_trip("-- target=outputs.a.b");
    }

    #[test]
    fn test_condition_with_args() {
        let t = target("-- target=template.t, if=equal(${env}, prod)");
        let cond = t.condition.as_ref().unwrap();
        assert_eq!(cond.call.name.text(), "equal");
        assert_eq!(cond.call.semantic_args().count(), 2);
        round_trip("-- target=template.t, if=equal(${env}, prod)");
    }

    #[test]
    fn test_malformed_condition_degrades_to_garbage() {
        let t = target("-- target=variables, if=bool");
        assert!(t.condition.is_none());
        assert!(!t.trailing.is_empty());
        round_trip("-- target=variables, if=bool");
    }

    #[test]
    fn test_trailing_garbage_is_absorbed() {
        let t = target("-- target=variables and then some (junk)");
        assert!(t.condition.is_none());
        assert!(t.trailing.tokens.iter().any(|tok| !tok.is_valid()));
        round_trip("-- target=variables and then some (junk)");
    }

    #[test]
    fn test_only_first_line_is_parsed() {
        let node = parse_target("-- target=log.x\nselect 1").unwrap();
        assert_eq!(node.join(), "-- target=log.x");
    }

    #[test]
    fn test_not_a_directive() {
        assert_eq!(
            parse_target("select 1").unwrap_err(),
            ParseError::NotADirective
        );
    }
}
