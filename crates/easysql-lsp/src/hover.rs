//! Hover: describe the EasySQL construct under the cursor.

use easysql_parser::{Node, TargetContent, TargetKind};
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Range};

use crate::document::Document;

pub fn compute(nodes: &[Node], doc: &Document, offset: usize) -> Option<Hover> {
    let node = find_at(nodes, offset)?;
    let value = describe(node)?;
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(Range {
            start: doc.position(node.start_pos()),
            end: doc.position(node.end_pos()),
        }),
    })
}

/// Deepest node whose span contains `offset`.
pub(crate) fn find_at(nodes: &[Node], offset: usize) -> Option<&Node> {
    for node in nodes {
        if node.start_pos() <= offset && offset < node.end_pos() {
            // Prefer a semantic child that also contains the cursor.
            if let Some(inner) = find_at_children(node, offset) {
                return Some(inner);
            }
            return Some(node);
        }
    }
    None
}

fn find_at_children(node: &Node, offset: usize) -> Option<&Node> {
    for child in node.children() {
        if child.start_pos() <= offset && offset < child.end_pos() {
            return find_at_children(child, offset).or(Some(child));
        }
    }
    None
}

fn describe(node: &Node) -> Option<String> {
    match node {
        Node::VarReference(r) => Some(format!(
            "**Variable reference**\n\nExpands to the value of `{}`.",
            r.name.text()
        )),
        Node::TplReference(r) => Some(format!(
            "**Template reference**\n\nExpands the template `{}` with no arguments.",
            r.name.text()
        )),
        Node::TplVarReference(r) => Some(format!(
            "**Template variable**\n\nPlaceholder `{}`, bound at template expansion.",
            r.name.text()
        )),
        Node::VarFuncCall(bc) => {
            let args: Vec<String> = bc.call.semantic_args().map(|a| a.join()).collect();
            Some(format!(
                "**Function call**\n\n`{}({})`",
                bc.call.name.text(),
                args.join(", ")
            ))
        }
        Node::TplFuncCall(bc) => {
            let mut value = format!(
                "**Template call**\n\nExpands `{}` with:\n",
                bc.call.name.text()
            );
            for arg in bc.call.semantic_args() {
                if let Node::TplFuncArg(a) = arg {
                    value.push_str(&format!("- `{}` = `{}`\n", a.name.text(), a.value.join()));
                }
            }
            Some(value)
        }
        Node::TplFuncArg(a) => Some(format!(
            "**Template argument**\n\n`{}` = `{}`",
            a.name.text(),
            a.value.join()
        )),
        Node::Target(target) => {
            let mut value = format!("**Directive**\n\n{}", kind_doc(target.kind));
            if let Some(name) = target.name_token() {
                if !name.is_empty() {
                    value.push_str(&format!("\n\nName: `{}`", name.text()));
                }
            }
            if let TargetContent::Output { table, .. } = &target.content {
                value.push_str(&format!("\n\nWrites to `{}`.", table.join()));
            }
            if target.condition.is_some() {
                value.push_str("\n\nRuns only when its `if=` condition holds.");
            }
            Some(value)
        }
        _ => None,
    }
}

fn kind_doc(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Variables => "`variables`: each selected column defines a variable.",
        TargetKind::ListVariables => "`list_variables`: each selected column defines a list variable.",
        TargetKind::Template => "`template`: defines a reusable SQL template.",
        TargetKind::Log => "`log`: evaluates and logs the query result.",
        TargetKind::Action => "`action`: runs a statement for its side effects.",
        TargetKind::Temp => "`temp`: materializes the query as a temporary view.",
        TargetKind::Cache => "`cache`: materializes and caches the query.",
        TargetKind::Broadcast => "`broadcast`: materializes and broadcasts the query.",
        TargetKind::Check => "`check`: asserts a condition over the query result.",
        TargetKind::Func => "`func`: invokes a registered function.",
        TargetKind::Output => "`output`: writes the query result to a table.",
        TargetKind::Unrecognized => "Unrecognized target keyword.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easysql_parser::parse;

    fn hover_at(text: &str, needle: &str) -> Option<String> {
        let doc = Document::new(text.to_string(), 1);
        let offset = text.find(needle).unwrap();
        compute(&parse(text), &doc, offset).map(|h| match h.contents {
            HoverContents::Markup(m) => m.value,
            _ => String::new(),
        })
    }

    #[test]
    fn test_hover_reference() {
        let value = hover_at("select ${env} from t", "env").unwrap();
        assert!(value.contains("Variable reference"));
        assert!(value.contains("`env`"));
    }

    #[test]
    fn test_hover_template_call_lists_args() {
        let value = hover_at("@{enrich(tbl=${stage}, mode=full)}", "enrich").unwrap();
        assert!(value.contains("Template call"));
        assert!(value.contains("`tbl` = `${stage}`"));
        assert!(value.contains("`mode` = `full`"));
    }

    #[test]
    fn test_hover_inside_call_prefers_argument_value() {
        let value = hover_at("@{enrich(tbl=${stage})}", "stage").unwrap();
        assert!(value.contains("Variable reference"));
    }

    #[test]
    fn test_hover_directive() {
        let value = hover_at("-- target=output.db.sc.t\nselect 1", "output").unwrap();
        assert!(value.contains("Directive"));
        assert!(value.contains("db.sc.t"));
    }

    #[test]
    fn test_hover_plain_sql_is_none() {
        assert_eq!(hover_at("select 1 from t", "from"), None);
    }
}
