//! Folding ranges: one region per directive segment.
//!
//! A segment runs from its `-- target=` line to the line before the next
//! directive (or the end of the document).

use easysql_parser::Node;
use tower_lsp::lsp_types::{FoldingRange, FoldingRangeKind};

use crate::document::Document;

pub fn compute(nodes: &[Node], doc: &Document) -> Vec<FoldingRange> {
    let starts: Vec<usize> = nodes
        .iter()
        .filter_map(|n| match n {
            Node::Target(_) => Some(n.start_pos()),
            _ => None,
        })
        .collect();

    let mut out = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let start_line = doc.position(start).line;
        // A directive boundary is preceded by '\n', so next-1 is always a
        // char boundary. For the last segment, only step back over a
        // trailing newline; stepping back blindly could split a multibyte
        // character at the end of the document.
        let end_offset = match starts.get(i + 1) {
            Some(&next) => next.saturating_sub(1),
            None if doc.text.ends_with('\n') => doc.text.len() - 1,
            None => doc.text.len(),
        };
        let end_line = doc.position(end_offset).line;
        if end_line > start_line {
            out.push(FoldingRange {
                start_line,
                end_line,
                kind: Some(FoldingRangeKind::Region),
                ..Default::default()
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use easysql_parser::parse;

    fn ranges(text: &str) -> Vec<FoldingRange> {
        let doc = Document::new(text.to_string(), 1);
        compute(&parse(text), &doc)
    }

    #[test]
    fn test_two_segments() {
        let out = ranges("-- target=variables\nselect 1\n-- target=temp.t\nselect 2\nmore\n");
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].start_line, out[0].end_line), (0, 1));
        assert_eq!((out[1].start_line, out[1].end_line), (2, 4));
    }

    #[test]
    fn test_single_line_segment_does_not_fold() {
        let out = ranges("-- target=variables");
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_directives() {
        assert!(ranges("select 1\nselect 2\n").is_empty());
    }

    #[test]
    fn test_document_ending_in_multibyte_char() {
        // No trailing newline, last byte is mid-character.
        let out = ranges("-- target=log.x\nselect 'é");
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].start_line, out[0].end_line), (0, 1));
    }
}
