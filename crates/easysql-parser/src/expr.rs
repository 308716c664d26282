/// Expression parser: single interpolation units and calls
///
/// Parses one `${...}` / `@{...}` / `#{...}` unit or one `name(args)` call,
/// independent of surrounding context. Used both as the body parser's
/// primitive and as a standalone entry point for editor features that have
/// already isolated a fragment.
use std::sync::Arc;

use crate::ast::{BracketCall, FuncCall, Node, Reference, Sentinel, TplFuncArg};
use crate::token::{Token, TokenTag};
use crate::ParseError;

/// Argument style of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgStyle {
    /// Positional `Lit` / `${...}` args.
    Positional,
    /// Named `name=value` args.
    Named,
}

/// Parse exactly one bracketed unit: `${name}`, `@{name}` or `#{name}`.
///
/// The name token covers everything between the trimmed bracket interior,
/// including internal whitespace; leading/trailing whitespace goes into the
/// sentinels.
pub fn parse_single_var(text: &str) -> Result<Node, ParseError> {
    let source: Arc<str> = Arc::from(text);
    parse_var_at(&source, 0, text.len())
}

/// Parse a single call. With `without_brackets` the input is `name(args...)`
/// (positional args); otherwise it is `${name(args)}` or `@{name(args)}` and
/// the variant is determined by the first two characters.
pub fn parse_single_call(text: &str, without_brackets: bool) -> Result<Node, ParseError> {
    let source: Arc<str> = Arc::from(text);
    if without_brackets {
        let (call, _) = parse_bare_call(&source, 0, text.len(), ArgStyle::Positional)?;
        Ok(Node::FuncCall(call))
    } else {
        parse_bracket_call_at(&source, 0, text.len())
    }
}

pub(crate) fn parse_var_at(source: &Arc<str>, start: usize, end: usize) -> Result<Node, ParseError> {
    let s = &source[start..end];
    let open_tag = reference_open_tag(s);
    let (open_tag, _) = match open_tag {
        Some(t) if s.len() >= 3 && s.ends_with('}') => t,
        _ => return Err(ParseError::MalformedReference),
    };

    let inner_start = start + 2;
    let inner_end = end - 1;
    let inner = &source[inner_start..inner_end];
    let lead = inner.len() - inner.trim_start().len();
    let trail = inner[lead..].len() - inner[lead..].trim_end().len();

    let mut start_sentinel = Sentinel::new();
    start_sentinel.push(Token::new(open_tag, start, 2, source));
    if lead > 0 {
        start_sentinel.push(Token::new(TokenTag::Whitespace, inner_start, lead, source));
    }

    let name = Token::new(
        TokenTag::Name,
        inner_start + lead,
        inner.len() - lead - trail,
        source,
    );

    let mut end_sentinel = Sentinel::new();
    if trail > 0 {
        end_sentinel.push(Token::new(TokenTag::Whitespace, inner_end - trail, trail, source));
    }
    end_sentinel.push(Token::new(TokenTag::BracketClose, inner_end, 1, source));

    let reference = Reference {
        start: start_sentinel,
        name,
        end: end_sentinel,
    };
    Ok(match open_tag {
        TokenTag::VarOpen => Node::VarReference(reference),
        TokenTag::TplOpen => Node::TplReference(reference),
        TokenTag::TplVarOpen => Node::TplVarReference(reference),
        _ => unreachable!("reference_open_tag only yields open-bracket tags"),
    })
}

fn reference_open_tag(s: &str) -> Option<(TokenTag, &str)> {
    if let Some(rest) = s.strip_prefix("${") {
        Some((TokenTag::VarOpen, rest))
    } else if let Some(rest) = s.strip_prefix("@{") {
        Some((TokenTag::TplOpen, rest))
    } else if let Some(rest) = s.strip_prefix("#{") {
        Some((TokenTag::TplVarOpen, rest))
    } else {
        None
    }
}

/// Parse `${name(args)}` / `@{name(args)}` over `[start, end)`.
pub(crate) fn parse_bracket_call_at(
    source: &Arc<str>,
    start: usize,
    end: usize,
) -> Result<Node, ParseError> {
    let s = &source[start..end];
    let (open_tag, style) = if s.starts_with("${") {
        (TokenTag::VarOpen, ArgStyle::Positional)
    } else if s.starts_with("@{") {
        (TokenTag::TplOpen, ArgStyle::Named)
    } else {
        return Err(ParseError::MalformedReference);
    };
    if s.len() < 3 || !s.ends_with('}') {
        return Err(ParseError::MalformedReference);
    }

    let inner_start = start + 2;
    let inner_end = end - 1;
    let inner = &source[inner_start..inner_end];
    let lead = inner.len() - inner.trim_start().len();

    let mut start_sentinel = Sentinel::new();
    start_sentinel.push(Token::new(open_tag, start, 2, source));
    if lead > 0 {
        start_sentinel.push(Token::new(TokenTag::Whitespace, inner_start, lead, source));
    }

    let (call, call_end) = parse_bare_call(source, inner_start + lead, inner_end, style)?;

    let mut end_sentinel = Sentinel::new();
    if call_end < inner_end {
        let gap = &source[call_end..inner_end];
        let tag = if gap.trim().is_empty() {
            TokenTag::Whitespace
        } else {
            TokenTag::Any
        };
        end_sentinel.push(Token::new(tag, call_end, inner_end - call_end, source));
    }
    end_sentinel.push(Token::new(TokenTag::BracketClose, inner_end, 1, source));

    let bracket_call = BracketCall {
        start: start_sentinel,
        call,
        end: end_sentinel,
    };
    Ok(match open_tag {
        TokenTag::VarOpen => Node::VarFuncCall(bracket_call),
        _ => Node::TplFuncCall(bracket_call),
    })
}

/// Parse `name(args...)` over `[start, end)`. The argument list runs from
/// the first `(` to the *last* `)` in the region, tolerating extra parens
/// inside argument literals. Returns the call and the offset just past `)`.
pub(crate) fn parse_bare_call(
    source: &Arc<str>,
    start: usize,
    end: usize,
    style: ArgStyle,
) -> Result<(FuncCall, usize), ParseError> {
    let s = &source[start..end];
    let open_rel = s.find('(').ok_or(ParseError::MissingOpenParen)?;
    let close_rel = s.rfind(')').ok_or(ParseError::MissingCloseParen)?;
    if close_rel < open_rel {
        return Err(ParseError::MissingCloseParen);
    }

    let name = Token::new(TokenTag::Name, start, open_rel, source);
    let arg_open = Token::new(TokenTag::ParenOpen, start + open_rel, 1, source);
    let arg_close = Token::new(TokenTag::ParenClose, start + close_rel, 1, source);

    let args = parse_args(source, start + open_rel + 1, start + close_rel, style);

    Ok((
        FuncCall {
            name,
            arg_open,
            args,
            arg_close,
        },
        start + close_rel + 1,
    ))
}

/// Split the argument region on top-level commas (naive split: the grammar
/// does not support nested parens/commas inside positional arguments) and
/// classify each segment.
fn parse_args(source: &Arc<str>, start: usize, end: usize, style: ArgStyle) -> Vec<Node> {
    let mut args = ArgsBuilder::new();
    if start >= end {
        return args.finish();
    }

    let region = &source[start..end];
    let mut seg_start = start;
    for (i, b) in region.bytes().enumerate() {
        if b == b',' {
            let comma_at = start + i;
            parse_one_arg(source, seg_start, comma_at, style, &mut args);
            args.push_filler(Token::new(TokenTag::Comma, comma_at, 1, source));
            seg_start = comma_at + 1;
        }
    }
    parse_one_arg(source, seg_start, end, style, &mut args);
    args.finish()
}

fn parse_one_arg(
    source: &Arc<str>,
    start: usize,
    end: usize,
    style: ArgStyle,
    args: &mut ArgsBuilder,
) {
    let seg = &source[start..end];
    let lead = seg.len() - seg.trim_start().len();
    let trail = seg[lead..].len() - seg[lead..].trim_end().len();
    let mid_start = start + lead;
    let mid_end = end - trail;

    match style {
        ArgStyle::Positional => {
            if lead > 0 {
                args.push_filler(Token::new(TokenTag::Whitespace, start, lead, source));
            }
            if mid_start < mid_end {
                args.push(classify_value(source, mid_start, mid_end));
            }
            if trail > 0 {
                args.push_filler(Token::new(TokenTag::Whitespace, mid_end, trail, source));
            }
        }
        ArgStyle::Named => {
            if mid_start >= mid_end {
                // Nothing but whitespace: filler, no argument node.
                if start < end {
                    args.push_filler(Token::new(TokenTag::Whitespace, start, end - start, source));
                }
                return;
            }
            args.push(parse_named_arg(source, start, end, lead, trail));
        }
    }
}

/// One `name=value` segment of a `@{...}` call. Tolerant of partial typing:
/// a missing `=` yields a zero-length assignment token and an empty value.
fn parse_named_arg(
    source: &Arc<str>,
    start: usize,
    end: usize,
    lead: usize,
    trail: usize,
) -> Node {
    let mut start_sentinel = Sentinel::new();
    if lead > 0 {
        start_sentinel.push(Token::new(TokenTag::Whitespace, start, lead, source));
    }
    let mut end_sentinel = Sentinel::new();
    if trail > 0 {
        end_sentinel.push(Token::new(TokenTag::Whitespace, end - trail, trail, source));
    }

    let mid_start = start + lead;
    let mid_end = end - trail;
    let mid = &source[mid_start..mid_end];

    let (name, assignment, value) = match mid.find('=') {
        Some(eq_rel) => {
            let eq_at = mid_start + eq_rel;
            let name = Token::new(TokenTag::Name, mid_start, eq_rel, source);
            let assignment = Token::new(TokenTag::Assignment, eq_at, 1, source);
            let value = classify_value(source, eq_at + 1, mid_end);
            (name, assignment, value)
        }
        None => {
            let name = Token::new(TokenTag::Name, mid_start, mid_end - mid_start, source);
            let assignment = Token::empty(TokenTag::Assignment, mid_end, source);
            let value = Node::Lit(Token::empty(TokenTag::NameWide, mid_end, source));
            (name, assignment, value)
        }
    };

    Node::TplFuncArg(TplFuncArg {
        start: start_sentinel,
        name,
        assignment,
        value: Box::new(value),
        end: end_sentinel,
    })
}

/// A `${...}` value recurses into the reference parser; anything else is a
/// raw `Lit`.
fn classify_value(source: &Arc<str>, start: usize, end: usize) -> Node {
    let text = &source[start..end];
    let lead = text.len() - text.trim_start().len();
    let trimmed = &text[lead..];
    if trimmed.starts_with("${") && trimmed.ends_with('}') && !trimmed.contains('\n') {
        if let Ok(mut node) = parse_var_at(source, start + lead, end) {
            // Whitespace between `=` and the reference has no slot of its
            // own; it rides in the reference's start sentinel.
            if lead > 0 {
                if let Node::VarReference(r) = &mut node {
                    r.start
                        .tokens
                        .insert(0, Token::new(TokenTag::Whitespace, start, lead, source));
                }
            }
            return node;
        }
    }
    Node::Lit(Token::new(TokenTag::NameWide, start, end - start, source))
}

/// Accumulates argument nodes, squeezing adjacent sentinels into one so the
/// node list stays minimal.
struct ArgsBuilder {
    nodes: Vec<Node>,
}

impl ArgsBuilder {
    fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    fn push_filler(&mut self, token: Token) {
        if token.is_empty() {
            return;
        }
        if let Some(Node::Sentinel(s)) = self.nodes.last_mut() {
            s.push(token);
        } else {
            self.nodes.push(Node::Sentinel(Sentinel::from_tokens(vec![token])));
        }
    }

    fn finish(self) -> Vec<Node> {
        self.nodes
    }
}
