//! Go-to-definition within a single document.
//!
//! `${var}` jumps to the `variables`/`list_variables` directive that defines
//! variables, `@{tpl}` and `@{tpl(...)}` to the matching `template.<name>`
//! directive, and `#{placeholder}` to the template definition enclosing the
//! cursor. Cross-file resolution is a separate concern and not handled here.

use easysql_parser::{Node, TargetKind};
use tower_lsp::lsp_types::Range;

use crate::document::Document;
use crate::hover::find_at;

pub fn compute(nodes: &[Node], doc: &Document, offset: usize) -> Option<Range> {
    let node = find_at(nodes, offset)?;
    let (start, end) = match node {
        Node::VarReference(_) => variables_directive(nodes)?,
        Node::TplReference(r) => template_directive(nodes, r.name.text())?,
        Node::TplFuncCall(bc) => template_directive(nodes, bc.call.name.text())?,
        Node::TplVarReference(_) => enclosing_template(nodes, offset)?,
        _ => return None,
    };
    Some(Range {
        start: doc.position(start),
        end: doc.position(end),
    })
}

fn directives(nodes: &[Node]) -> impl Iterator<Item = (TargetKind, Option<&str>, usize, usize)> {
    nodes.iter().filter_map(|n| match n {
        Node::Target(t) => Some((
            t.kind,
            t.name_token().map(|tok| tok.text()),
            n.start_pos(),
            n.end_pos(),
        )),
        _ => None,
    })
}

/// The first `variables`/`list_variables` directive in the document.
fn variables_directive(nodes: &[Node]) -> Option<(usize, usize)> {
    directives(nodes)
        .find(|(kind, ..)| matches!(kind, TargetKind::Variables | TargetKind::ListVariables))
        .map(|(_, _, start, end)| (start, end))
}

/// The `template.<name>` directive with a matching name.
fn template_directive(nodes: &[Node], name: &str) -> Option<(usize, usize)> {
    directives(nodes)
        .find(|(kind, tpl_name, ..)| *kind == TargetKind::Template && *tpl_name == Some(name))
        .map(|(_, _, start, end)| (start, end))
}

/// The last template directive starting at or before `offset`: the
/// definition a `#{...}` placeholder belongs to.
fn enclosing_template(nodes: &[Node], offset: usize) -> Option<(usize, usize)> {
    directives(nodes)
        .take_while(|&(.., start, _)| start <= offset)
        .filter(|(kind, ..)| *kind == TargetKind::Template)
        .last()
        .map(|(_, _, start, end)| (start, end))
}
