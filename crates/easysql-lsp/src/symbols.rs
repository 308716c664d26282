//! Document outline: one symbol per directive segment.

use easysql_parser::{Node, Target, TargetContent, TargetKind};
use tower_lsp::lsp_types::{DocumentSymbol, Range, SymbolKind};

use crate::document::Document;

pub fn compute(nodes: &[Node], doc: &Document) -> Vec<DocumentSymbol> {
    let targets: Vec<(&Target, usize, usize)> = nodes
        .iter()
        .filter_map(|n| match n {
            Node::Target(t) => Some((t, n.start_pos(), n.end_pos())),
            _ => None,
        })
        .collect();

    let mut out = Vec::new();
    for (i, &(target, start, header_end)) in targets.iter().enumerate() {
        // The symbol spans the whole segment, not just the directive line.
        let segment_end = match targets.get(i + 1) {
            Some(&(_, next_start, _)) => next_start,
            None => doc.text.len(),
        };
        let range = Range {
            start: doc.position(start),
            end: doc.position(segment_end),
        };
        let selection_range = Range {
            start: doc.position(start),
            end: doc.position(header_end),
        };

        #[allow(deprecated)]
        out.push(DocumentSymbol {
            name: symbol_name(target),
            detail: target
                .condition
                .as_ref()
                .map(|c| format!("if={}", Node::FuncCall(c.call.clone()).join())),
            kind: symbol_kind(target.kind),
            tags: None,
            deprecated: None,
            range,
            selection_range,
            children: None,
        });
    }
    out
}

fn symbol_name(target: &Target) -> String {
    let keyword = target
        .keyword_token()
        .map(|t| t.text().to_string())
        .unwrap_or_default();
    match &target.content {
        TargetContent::None => keyword,
        TargetContent::Named { name, .. } => format!("{}.{}", keyword, name.text()),
        TargetContent::Call { call, .. } => format!("{}.{}()", keyword, call.name.text()),
        TargetContent::Output { table, .. } => format!("{}.{}", keyword, table.join()),
    }
}

fn symbol_kind(kind: TargetKind) -> SymbolKind {
    match kind {
        TargetKind::Variables | TargetKind::ListVariables => SymbolKind::VARIABLE,
        TargetKind::Template | TargetKind::Func => SymbolKind::FUNCTION,
        TargetKind::Check => SymbolKind::BOOLEAN,
        TargetKind::Log | TargetKind::Action => SymbolKind::EVENT,
        TargetKind::Output => SymbolKind::CLASS,
        TargetKind::Temp | TargetKind::Cache | TargetKind::Broadcast => SymbolKind::OBJECT,
        TargetKind::Unrecognized => SymbolKind::NULL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easysql_parser::parse;

    fn symbols(text: &str) -> Vec<DocumentSymbol> {
        let doc = Document::new(text.to_string(), 1);
        compute(&parse(text), &doc)
    }

    #[test]
    fn test_symbol_names() {
        let text = "-- target=variables\nselect 1\n-- target=temp.stage\nselect 2\n-- target=output.db.sc.t\nselect 3\n";
        let out = symbols(text);
        let names: Vec<&str> = out.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["variables", "temp.stage", "output.db.sc.t"]);
    }

    #[test]
    fn test_symbol_spans_segment() {
        let text = "-- target=variables\nselect 1\n-- target=log.done\n";
        let out = symbols(text);
        assert_eq!(out[0].range.start.line, 0);
        assert_eq!(out[0].range.end.line, 2);
        assert_eq!(out[0].selection_range.end.line, 0);
    }

    #[test]
    fn test_condition_in_detail() {
        let out = symbols("-- target=temp.t, if=bool(${flag})\n");
        assert_eq!(out[0].detail.as_deref(), Some("if=bool(${flag})"));
    }

    #[test]
    fn test_call_target_symbol() {
        let out = symbols("-- target=func.refresh(${a}, b)\n");
        assert_eq!(out[0].name, "func.refresh()");
        assert_eq!(out[0].kind, SymbolKind::FUNCTION);
    }
}
