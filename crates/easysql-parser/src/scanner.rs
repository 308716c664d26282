/// Lexical scanners: comment starts, quoted regions, interpolation matches
///
/// These are the regex-assisted primitives the body parser dispatches on.
/// Each returns a structured match result so the precedence and nesting
/// assumptions stay auditable instead of living inside raw patterns.
use std::sync::LazyLock;

use regex::Regex;

/// `@{name(a=b, ...)}`; the argument region may span lines.
static TPL_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\{[^}(\n]*\([^()]*\)[^}\n]*\}").unwrap());

/// `${name(args)}`; single line, requires both parens so the expression
/// parser's paren search cannot fail.
static FUNC_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}(\n]*\([^}\n]*\)[^}\n]*\}").unwrap());

/// Bare interpolation: `${name}`, `@{name}` or `#{name}`.
static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$@#]\{[^}\n]*\}").unwrap());

/// What the expression matcher found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprMatchKind {
    /// Template call `@{f(...)}`, possibly spanning lines.
    TplCall,
    /// Variable call `${f(...)}`.
    FuncCall,
    /// Bare reference of any of the three bracket kinds.
    VarRef,
    /// An opening quote character.
    Quote,
}

/// A located match, byte offsets relative to the scanned region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprMatch {
    pub start: usize,
    pub end: usize,
    pub kind: ExprMatchKind,
}

/// Find the earliest interpolation/call/quote match that starts within the
/// first `line_len` bytes of `region`. A template call may extend past the
/// line; the other patterns are line-bounded. Exact same-offset ties resolve
/// template-call > function-call > bare-interpolation > quote.
pub fn next_expr_match(region: &str, line_len: usize, quotes: bool) -> Option<ExprMatch> {
    let line = &region[..line_len];
    let mut best: Option<ExprMatch> = None;

    let mut consider = |m: ExprMatch| {
        let better = match best {
            None => true,
            // Strictly earlier wins; candidates arrive in precedence order,
            // so an equal offset never replaces the incumbent.
            Some(b) => m.start < b.start,
        };
        if better {
            best = Some(m);
        }
    };

    if let Some(m) = TPL_CALL_RE.find(region) {
        if m.start() < line_len {
            consider(ExprMatch {
                start: m.start(),
                end: m.end(),
                kind: ExprMatchKind::TplCall,
            });
        }
    }
    if let Some(m) = FUNC_CALL_RE.find(line) {
        consider(ExprMatch {
            start: m.start(),
            end: m.end(),
            kind: ExprMatchKind::FuncCall,
        });
    }
    if let Some(m) = VAR_RE.find(line) {
        consider(ExprMatch {
            start: m.start(),
            end: m.end(),
            kind: ExprMatchKind::VarRef,
        });
    }
    if quotes {
        if let Some(pos) = find_quote(line) {
            consider(ExprMatch {
                start: pos,
                end: pos + 1,
                kind: ExprMatchKind::Quote,
            });
        }
    }

    best
}

fn find_quote(line: &str) -> Option<usize> {
    line.bytes().position(|b| b == b'\'' || b == b'"')
}

/// Find the first `--` on the line that is not inside an open quote.
pub fn find_comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match in_quote {
            Some(q) => {
                if b == q {
                    in_quote = None;
                }
            }
            None => {
                if b == b'\'' || b == b'"' {
                    in_quote = Some(b);
                } else if b == b'-' && bytes.get(i + 1) == Some(&b'-') {
                    return Some(i);
                }
            }
        }
    }
    None
}

/// Find the open quote that is still unterminated at end of line, if any.
/// Quote parity is tracked per quote character: a `"` inside `'...'` does
/// not open a region.
pub fn find_unterminated_quote(line: &str) -> Option<usize> {
    let mut in_quote: Option<(u8, usize)> = None;
    for (i, b) in line.bytes().enumerate() {
        match in_quote {
            Some((q, _)) => {
                if b == q {
                    in_quote = None;
                }
            }
            None => {
                if b == b'\'' || b == b'"' {
                    in_quote = Some((b, i));
                }
            }
        }
    }
    in_quote.map(|(_, i)| i)
}

/// Find the closing quote for `quote` in `rest` (the text after the open
/// quote character). Returns the offset within `rest`.
pub fn find_closing_quote(rest: &str, quote: u8) -> Option<usize> {
    rest.bytes().position(|b| b == quote)
}
