/// Top-level parser: full EasySQL documents
///
/// Splits the document into directive-prefixed segments on the boundary
/// "newline immediately followed by `-- target=` and an identifier
/// character", then drives the directive and body parsers per segment.
/// All offsets in the result are document-absolute.
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::Node;
use crate::body::{parse_body_range, DEFAULT_MAX_DEPTH};
use crate::target::{accept_target, parse_target_at};

/// Segment boundary. The trailing `\w` keeps a bare `-- target=` with
/// nothing after it from splitting oddly.
static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n-- target=\w").unwrap());

/// Parse a full document into its ordered top-level node list.
pub fn parse(text: &str) -> Vec<Node> {
    parse_with_limit(text, DEFAULT_MAX_DEPTH)
}

/// `parse` with an explicit nesting bound for the body parser.
pub fn parse_with_limit(text: &str, max_depth: usize) -> Vec<Node> {
    let source: Arc<str> = Arc::from(text);
    let mut nodes = Vec::new();

    // Segment start cursor positions; segment 0 starts at the top.
    let mut starts = vec![0];
    for m in SPLIT_RE.find_iter(text) {
        starts.push(m.start() + 1);
    }
    starts.push(text.len());

    for pair in starts.windows(2) {
        let (seg_start, seg_end) = (pair[0], pair[1]);
        if seg_start >= seg_end {
            continue;
        }
        let segment = &text[seg_start..seg_end];
        if accept_target(segment) {
            // Only the first line is directive grammar; the rest of the
            // segment is ordinary body text.
            let line_end = segment
                .find('\n')
                .map(|i| seg_start + i)
                .unwrap_or(seg_end);
            nodes.push(parse_target_at(&source, seg_start, line_end));
            if line_end < seg_end {
                nodes.extend(parse_body_range(
                    &source, line_end, seg_end, true, true, max_depth, 0,
                ));
            }
        } else {
            nodes.extend(parse_body_range(
                &source, seg_start, seg_end, true, true, max_depth, 0,
            ));
        }
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{flatten_tokens, join_nodes, TargetKind};

    fn doc(text: &str) -> Vec<Node> {
        let nodes = parse(text);
        assert_eq!(join_nodes(&nodes), text, "round trip failed");
        nodes
    }

    fn targets(nodes: &[Node]) -> Vec<TargetKind> {
        nodes
            .iter()
            .filter_map(|n| match n {
                Node::Target(t) => Some(t.kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_document_without_directives() {
        let nodes = doc("select 1 from t\n");
        assert!(targets(&nodes).is_empty());
    }

    #[test]
    fn test_leading_directive() {
        let nodes = doc("-- target=variables\nselect 1 as a\n");
        assert_eq!(targets(&nodes), [TargetKind::Variables]);
    }

    #[test]
    fn test_multiple_segments() {
        let text = "select 0\n-- target=temp.stage\nselect 1\n-- target=output.db.t\nselect 2\n";
        let nodes = doc(text);
        assert_eq!(targets(&nodes), [TargetKind::Temp, TargetKind::Output]);
    }

    #[test]
    fn test_offsets_are_document_absolute() {
        let text = "select 0\n-- target=log.step\nselect ${x}\n";
        let nodes = doc(text);
        let target = nodes
            .iter()
            .find_map(|n| match n {
                Node::Target(t) => Some(t),
                _ => None,
            })
            .unwrap();
        let name = target.name_token().unwrap();
        assert_eq!(name.start(), text.find("step").unwrap());
        assert_eq!(name.text(), "step");

        let var = nodes
            .iter()
            .find_map(|n| match n {
                Node::VarReference(r) => Some(r),
                _ => None,
            })
            .unwrap();
        assert_eq!(var.name.start(), text.find("x}").unwrap());
    }

    #[test]
    fn test_bare_target_prefix_does_not_split() {
        // No identifier after `=`: stays body text (a comment).
        let text = "select 1\n-- target=\nselect 2\n";
        let nodes = doc(text);
        assert!(targets(&nodes).is_empty());
    }

    #[test]
    fn test_adjacent_directives() {
        let text = "-- target=variables\n-- target=log.done";
        let nodes = doc(text);
        assert_eq!(targets(&nodes), [TargetKind::Variables, TargetKind::Log]);
    }

    #[test]
    fn test_directive_like_text_mid_line_is_body() {
        let text = "select 1 -- target=variables\n";
        let nodes = doc(text);
        assert!(targets(&nodes).is_empty());
    }

    #[test]
    fn test_offsets_monotonic_and_disjoint() {
        let text = "-- target=check.f(${a}, b)\nselect '${x}' -- c\n";
        let nodes = doc(text);
        let toks = flatten_tokens(&nodes);
        let mut last_end = 0;
        for t in toks {
            assert!(t.start() >= last_end, "overlap at {}", t.start());
            last_end = t.end();
        }
        assert_eq!(last_end, text.len());
    }

    #[test]
    fn test_idempotent_reparse() {
        let text = "-- target=template.t, if=f(${a})\nselect @{g(x=1)} from '${y}'\n";
        assert_eq!(parse(text), parse(text));
    }
}
