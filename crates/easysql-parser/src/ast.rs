/// AST node types for EasySQL: a closed tagged union over position-exact tokens
///
/// The tree is flat at the top (directives interleaved with body spans) with
/// one level of node-internal children. Every character of the input is
/// accounted for: concatenating `tokens()` across a parse result reproduces
/// the input byte-for-byte. Syntactically insignificant runs are kept in
/// `Sentinel` nodes purely to satisfy that invariant.
use std::sync::Arc;

use crate::token::{Token, TokenTag};

/// A run of syntactically insignificant tokens (whitespace, punctuation).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sentinel {
    pub tokens: Vec<Token>,
}

impl Sentinel {
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Absorb another sentinel's tokens; never drops a token.
    pub fn merge(&mut self, other: Sentinel) {
        self.tokens.extend(other.tokens);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// `-- comment text` to end of line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// The `--` marker.
    pub start: Sentinel,
    /// Everything from after the marker to end of line.
    pub text: Token,
}

/// One bracketed interpolation unit: `${name}`, `@{name}` or `#{name}`.
/// The three kinds are structurally identical; the enclosing `Node` variant
/// distinguishes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Open bracket plus leading whitespace.
    pub start: Sentinel,
    /// Everything between the trimmed bracket interior, including internal
    /// whitespace (`${ a bc }` yields the name `a bc`).
    pub name: Token,
    /// Trailing whitespace plus close bracket.
    pub end: Sentinel,
}

impl Reference {
    pub fn name_token(&self) -> &Token {
        &self.name
    }
}

/// A call parsed without surrounding interpolation brackets:
/// `name(arg, arg)`. Args are `Lit`, `VarReference`, `TplFuncArg` or
/// `Sentinel` nodes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncCall {
    pub name: Token,
    pub arg_open: Token,
    pub args: Vec<Node>,
    pub arg_close: Token,
}

impl FuncCall {
    /// Semantic arguments, skipping sentinel filler.
    pub fn semantic_args(&self) -> impl Iterator<Item = &Node> {
        self.args.iter().filter(|n| !matches!(n, Node::Sentinel(_)))
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Token>) {
        out.push(&self.name);
        out.push(&self.arg_open);
        for arg in &self.args {
            arg.collect(out);
        }
        out.push(&self.arg_close);
    }

    fn for_each_token_mut(&mut self, f: &mut impl FnMut(&mut Token)) {
        f(&mut self.name);
        f(&mut self.arg_open);
        for arg in &mut self.args {
            arg.for_each_token_mut(f);
        }
        f(&mut self.arg_close);
    }
}

/// A call wrapped in interpolation brackets: `${func(args)}` (positional)
/// or `@{func(a=b)}` (named).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketCall {
    /// Open bracket plus leading whitespace.
    pub start: Sentinel,
    pub call: FuncCall,
    /// Anything between the final `)` and the close bracket, plus the
    /// close bracket itself.
    pub end: Sentinel,
}

/// One named argument of a `@{...}` call: `name=value`. The assignment
/// token is a zero-length placeholder when `=` has not been typed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TplFuncArg {
    pub start: Sentinel,
    pub name: Token,
    pub assignment: Token,
    /// `Lit` or `VarReference`; a zero-length `Lit` when absent.
    pub value: Box<Node>,
    pub end: Sentinel,
}

/// Trailing directive condition: `, if=func(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Separator comma, whitespace, and the `if=` tokens.
    pub start: Sentinel,
    pub call: FuncCall,
    pub end: Sentinel,
}

/// The kind of a `-- target=<kind>` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Variables,
    ListVariables,
    Template,
    Log,
    Action,
    Temp,
    Cache,
    Broadcast,
    Check,
    Func,
    Output,
    /// Keyword not in the recognized set; kept so diagnostics can point at it.
    Unrecognized,
}

impl TargetKind {
    pub fn from_keyword(kw: &str) -> Self {
        match kw {
            "variables" => Self::Variables,
            "list_variables" => Self::ListVariables,
            "template" => Self::Template,
            "log" => Self::Log,
            "action" => Self::Action,
            "temp" => Self::Temp,
            "cache" => Self::Cache,
            "broadcast" => Self::Broadcast,
            "check" => Self::Check,
            "func" => Self::Func,
            "output" => Self::Output,
            _ => Self::Unrecognized,
        }
    }
}

/// Content after the directive keyword, by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetContent {
    /// `variables`, `list_variables`, unrecognized keywords.
    None,
    /// `.name` for the simple-named kinds. Both tokens are zero-length
    /// placeholders when absent, so "the name token" is always addressable.
    Named { dot: Token, name: Token },
    /// `.func(args)` for `func` and function-call `check`.
    Call { dot: Token, call: FuncCall },
    /// `.db.table` or `.db.schema.table` for `output`; the node is
    /// `Node::Table` or `Node::FullTable`.
    Output { dot: Token, table: Box<Node> },
}

/// A parsed `-- target=<kind>...` directive header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: TargetKind,
    /// The `-- target`, `=` and keyword tokens.
    pub header: Sentinel,
    pub content: TargetContent,
    pub condition: Option<Condition>,
    /// Unrecognized garbage after the recognized prefix.
    pub trailing: Sentinel,
}

impl Target {
    /// The keyword token after `-- target=`.
    pub fn keyword_token(&self) -> Option<&Token> {
        self.header
            .tokens
            .iter()
            .find(|t| t.tag() == TokenTag::TargetName)
    }

    /// The name token for simple-named directives, if any.
    pub fn name_token(&self) -> Option<&Token> {
        match &self.content {
            TargetContent::Named { name, .. } => Some(name),
            TargetContent::Call { call, .. } => Some(&call.name),
            _ => None,
        }
    }
}

/// `db.table` reference in an `output` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub db: Token,
    pub sep: Token,
    pub table: Token,
}

/// `db.schema.table` reference in an `output` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullTable {
    pub db: Token,
    pub sep1: Token,
    pub schema: Token,
    pub sep2: Token,
    pub table: Token,
}

/// An EasySQL syntax tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Sentinel(Sentinel),
    /// Opaque best-effort SQL text.
    Any(Token),
    /// String-literal content, including the quote characters.
    Str(Token),
    Comment(Comment),
    Name(Token),
    /// Free-form literal argument text.
    Lit(Token),
    /// `${name}`
    VarReference(Reference),
    /// `@{name}`
    TplReference(Reference),
    /// `#{name}`
    TplVarReference(Reference),
    /// `name(args)` without surrounding brackets.
    FuncCall(FuncCall),
    /// `${name(args)}` with positional args.
    VarFuncCall(BracketCall),
    /// `@{name(args)}` with named args.
    TplFuncCall(BracketCall),
    TplFuncArg(TplFuncArg),
    Condition(Condition),
    Target(Target),
    Table(Table),
    FullTable(FullTable),
}

impl Node {
    /// Semantic children only, excluding `Sentinel` filler. Used by
    /// outline/definition walks.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Sentinel(_)
            | Node::Any(_)
            | Node::Str(_)
            | Node::Comment(_)
            | Node::Name(_)
            | Node::Lit(_)
            | Node::VarReference(_)
            | Node::TplReference(_)
            | Node::TplVarReference(_)
            | Node::Table(_)
            | Node::FullTable(_) => Vec::new(),
            Node::FuncCall(call) => call.semantic_args().collect(),
            Node::VarFuncCall(bc) | Node::TplFuncCall(bc) => bc.call.semantic_args().collect(),
            Node::TplFuncArg(arg) => vec![&arg.value],
            Node::Condition(cond) => cond.call.semantic_args().collect(),
            Node::Target(target) => {
                let mut out: Vec<&Node> = match &target.content {
                    TargetContent::Output { table, .. } => vec![table],
                    TargetContent::Call { call, .. } => call.semantic_args().collect(),
                    TargetContent::None | TargetContent::Named { .. } => Vec::new(),
                };
                if let Some(cond) = &target.condition {
                    out.extend(cond.call.semantic_args());
                }
                out
            }
        }
    }

    /// Every token of this node in source order, including filler. Used by
    /// diagnostics and highlighting.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            Node::Sentinel(s) => out.extend(s.tokens.iter()),
            Node::Any(t) | Node::Str(t) | Node::Name(t) | Node::Lit(t) => out.push(t),
            Node::Comment(c) => {
                out.extend(c.start.tokens.iter());
                out.push(&c.text);
            }
            Node::VarReference(r) | Node::TplReference(r) | Node::TplVarReference(r) => {
                out.extend(r.start.tokens.iter());
                out.push(&r.name);
                out.extend(r.end.tokens.iter());
            }
            Node::FuncCall(call) => call.collect(out),
            Node::VarFuncCall(bc) | Node::TplFuncCall(bc) => {
                out.extend(bc.start.tokens.iter());
                bc.call.collect(out);
                out.extend(bc.end.tokens.iter());
            }
            Node::TplFuncArg(arg) => {
                out.extend(arg.start.tokens.iter());
                out.push(&arg.name);
                out.push(&arg.assignment);
                arg.value.collect(out);
                out.extend(arg.end.tokens.iter());
            }
            Node::Condition(cond) => collect_condition(cond, out),
            Node::Target(target) => {
                out.extend(target.header.tokens.iter());
                match &target.content {
                    TargetContent::None => {}
                    TargetContent::Named { dot, name } => {
                        out.push(dot);
                        out.push(name);
                    }
                    TargetContent::Call { dot, call } => {
                        out.push(dot);
                        call.collect(out);
                    }
                    TargetContent::Output { dot, table } => {
                        out.push(dot);
                        table.collect(out);
                    }
                }
                if let Some(cond) = &target.condition {
                    collect_condition(cond, out);
                }
                out.extend(target.trailing.tokens.iter());
            }
            Node::Table(t) => {
                out.push(&t.db);
                out.push(&t.sep);
                out.push(&t.table);
            }
            Node::FullTable(t) => {
                out.push(&t.db);
                out.push(&t.sep1);
                out.push(&t.schema);
                out.push(&t.sep2);
                out.push(&t.table);
            }
        }
    }

    /// Absolute start offset: the first token's start.
    pub fn start_pos(&self) -> usize {
        self.tokens().first().map(|t| t.start()).unwrap_or(0)
    }

    /// Absolute end offset: the last token's end.
    pub fn end_pos(&self) -> usize {
        self.tokens().last().map(|t| t.end()).unwrap_or(0)
    }

    /// Verbatim source slice spanned by this node.
    pub fn join(&self) -> String {
        self.tokens().iter().map(|t| t.text()).collect()
    }

    /// Shift every token by `delta` and rebind to `source`: the single
    /// explicit rebasing operation for stitching a sub-range parse into a
    /// larger document.
    pub fn rebase(&mut self, delta: usize, source: &Arc<str>) {
        self.for_each_token_mut(&mut |t| t.rebase(delta, source));
    }

    pub(crate) fn for_each_token_mut(&mut self, f: &mut impl FnMut(&mut Token)) {
        match self {
            Node::Sentinel(s) => s.tokens.iter_mut().for_each(&mut *f),
            Node::Any(t) | Node::Str(t) | Node::Name(t) | Node::Lit(t) => f(t),
            Node::Comment(c) => {
                c.start.tokens.iter_mut().for_each(&mut *f);
                f(&mut c.text);
            }
            Node::VarReference(r) | Node::TplReference(r) | Node::TplVarReference(r) => {
                r.start.tokens.iter_mut().for_each(&mut *f);
                f(&mut r.name);
                r.end.tokens.iter_mut().for_each(&mut *f);
            }
            Node::FuncCall(call) => call.for_each_token_mut(f),
            Node::VarFuncCall(bc) | Node::TplFuncCall(bc) => {
                bc.start.tokens.iter_mut().for_each(&mut *f);
                bc.call.for_each_token_mut(f);
                bc.end.tokens.iter_mut().for_each(&mut *f);
            }
            Node::TplFuncArg(arg) => {
                arg.start.tokens.iter_mut().for_each(&mut *f);
                f(&mut arg.name);
                f(&mut arg.assignment);
                arg.value.for_each_token_mut(f);
                arg.end.tokens.iter_mut().for_each(&mut *f);
            }
            Node::Condition(cond) => for_each_condition_mut(cond, f),
            Node::Target(target) => {
                target.header.tokens.iter_mut().for_each(&mut *f);
                match &mut target.content {
                    TargetContent::None => {}
                    TargetContent::Named { dot, name } => {
                        f(dot);
                        f(name);
                    }
                    TargetContent::Call { dot, call } => {
                        f(dot);
                        call.for_each_token_mut(f);
                    }
                    TargetContent::Output { dot, table } => {
                        f(dot);
                        table.for_each_token_mut(f);
                    }
                }
                if let Some(cond) = &mut target.condition {
                    for_each_condition_mut(cond, f);
                }
                target.trailing.tokens.iter_mut().for_each(&mut *f);
            }
            Node::Table(t) => {
                f(&mut t.db);
                f(&mut t.sep);
                f(&mut t.table);
            }
            Node::FullTable(t) => {
                f(&mut t.db);
                f(&mut t.sep1);
                f(&mut t.schema);
                f(&mut t.sep2);
                f(&mut t.table);
            }
        }
    }
}

fn collect_condition<'a>(cond: &'a Condition, out: &mut Vec<&'a Token>) {
    out.extend(cond.start.tokens.iter());
    cond.call.collect(out);
    out.extend(cond.end.tokens.iter());
}

fn for_each_condition_mut(cond: &mut Condition, f: &mut impl FnMut(&mut Token)) {
    cond.start.tokens.iter_mut().for_each(&mut *f);
    cond.call.for_each_token_mut(f);
    cond.end.tokens.iter_mut().for_each(&mut *f);
}

/// Flatten every token of a node list in source order.
pub fn flatten_tokens(nodes: &[Node]) -> Vec<&Token> {
    let mut out = Vec::new();
    for node in nodes {
        node.collect(&mut out);
    }
    out
}

/// Concatenate every token's text: must reproduce the parsed input exactly.
pub fn join_nodes(nodes: &[Node]) -> String {
    flatten_tokens(nodes).iter().map(|t| t.text()).collect()
}
