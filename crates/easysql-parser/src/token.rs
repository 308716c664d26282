/// Tokens for EasySQL files: position-addressed spans over the source text
use std::sync::Arc;

/// The eleven directive keywords recognized after `-- target=`.
pub const TARGET_KEYWORDS: [&str; 11] = [
    "variables",
    "list_variables",
    "template",
    "log",
    "action",
    "temp",
    "cache",
    "broadcast",
    "check",
    "func",
    "output",
];

/// Syntactic role of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenTag {
    /// `${`
    VarOpen,
    /// `@{`
    TplOpen,
    /// `#{`
    TplVarOpen,
    /// `}`
    BracketClose,
    /// `(`
    ParenOpen,
    /// `)`
    ParenClose,
    /// `,`
    Comma,
    /// `=`
    Assignment,
    /// `'` or `"`
    Quote,
    /// `.`
    Dot,
    /// `-- target`
    TargetStart,
    /// Identifier
    Name,
    /// Free-form literal argument; may contain spaces but not `,()'"`,
    /// backtick or newline
    NameWide,
    /// `--`
    CommentStart,
    /// Whitespace run
    Whitespace,
    /// Opaque text
    Any,
    /// Directive keyword after `-- target=`
    TargetName,
}

/// An immutable-content span over the original text plus its syntactic role.
///
/// `text()` slices the shared source buffer unless overridden. Offsets are
/// absolute within the source handle the token was built against.
#[derive(Debug, Clone)]
pub struct Token {
    tag: TokenTag,
    start: usize,
    len: usize,
    source: Arc<str>,
    text_override: Option<Box<str>>,
}

impl Token {
    pub fn new(tag: TokenTag, start: usize, len: usize, source: &Arc<str>) -> Self {
        Self {
            tag,
            start,
            len,
            source: Arc::clone(source),
            text_override: None,
        }
    }

    /// A zero-length placeholder at `at`, so downstream code can always
    /// address e.g. "the name token" even when nothing was typed yet.
    pub fn empty(tag: TokenTag, at: usize, source: &Arc<str>) -> Self {
        Self::new(tag, at, 0, source)
    }

    /// A token whose text differs from the source slice it stands at.
    pub fn with_text(tag: TokenTag, start: usize, text: &str, source: &Arc<str>) -> Self {
        Self {
            tag,
            start,
            len: text.len(),
            source: Arc::clone(source),
            text_override: Some(text.into()),
        }
    }

    pub fn tag(&self) -> TokenTag {
        self.tag
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn text(&self) -> &str {
        match &self.text_override {
            Some(text) => text,
            None => &self.source[self.start..self.start + self.len],
        }
    }

    /// Shift this token by `delta` and rebind it to `source`. Used when a
    /// tree parsed against a sub-range is stitched into a larger document.
    pub fn rebase(&mut self, delta: usize, source: &Arc<str>) {
        self.start += delta;
        self.source = Arc::clone(source);
    }

    /// Grow the span one byte to the left (quote folding).
    pub(crate) fn extend_left(&mut self) {
        debug_assert!(self.start > 0 && self.text_override.is_none());
        self.start -= 1;
        self.len += 1;
    }

    /// Grow the span one byte to the right (quote folding).
    pub(crate) fn extend_right(&mut self) {
        debug_assert!(self.text_override.is_none());
        self.len += 1;
    }

    /// Whether this token is well-formed for its role. Total and pure:
    /// depends only on the tag and the text.
    pub fn is_valid(&self) -> bool {
        match self.tag {
            TokenTag::Name => is_identifier(self.text()),
            TokenTag::NameWide => !self
                .text()
                .chars()
                .any(|c| matches!(c, ',' | '(' | ')' | '\'' | '"' | '`' | '\n')),
            TokenTag::Assignment => self.text() == "=",
            TokenTag::TargetName => TARGET_KEYWORDS.contains(&self.text()),
            _ => true,
        }
    }

    /// Human-readable reason when `is_valid()` is false.
    pub fn invalid_reason(&self) -> Option<String> {
        if self.is_valid() {
            return None;
        }
        Some(match self.tag {
            TokenTag::Name => format!("invalid name: '{}'", self.text()),
            TokenTag::NameWide => format!(
                "literal '{}' contains a forbidden character (one of ,()'\"` or newline)",
                self.text()
            ),
            TokenTag::Assignment => "expected '='".to_string(),
            TokenTag::TargetName => format!(
                "unrecognized target '{}', expected one of: {}",
                self.text(),
                TARGET_KEYWORDS.join(", ")
            ),
            _ => unreachable!("tags other than Name/NameWide/Assignment/TargetName are always valid"),
        })
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.start == other.start
            && self.len == other.len
            && self.text() == other.text()
    }
}

impl Eq for Token {}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
