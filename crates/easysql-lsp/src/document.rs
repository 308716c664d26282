//! Open document store and offset <-> position conversion.
//!
//! The parser works in absolute byte offsets; LSP talks in line/UTF-16
//! column positions. `LineIndex` bridges the two.

use tower_lsp::lsp_types::Position;

/// An open text document as last synced from the client.
pub struct Document {
    pub text: String,
    pub version: i32,
    line_index: LineIndex,
}

impl Document {
    pub fn new(text: String, version: i32) -> Self {
        let line_index = LineIndex::new(&text);
        Self {
            text,
            version,
            line_index,
        }
    }

    /// Replace the whole text (FULL sync).
    pub fn update(&mut self, text: String, version: i32) {
        self.line_index = LineIndex::new(&text);
        self.text = text;
        self.version = version;
    }

    pub fn position(&self, offset: usize) -> Position {
        self.line_index.position(&self.text, offset)
    }

    pub fn offset(&self, position: Position) -> usize {
        self.line_index.offset(&self.text, position)
    }
}

/// Byte offsets of line starts, for position arithmetic.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Line containing the byte offset (0-based).
    pub fn line_of(&self, offset: usize) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line as u32,
            Err(next) => (next - 1) as u32,
        }
    }

    /// Convert a byte offset to an LSP position (UTF-16 column).
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(text.len());
        let line = self.line_of(offset);
        let line_start = self.line_starts[line as usize];
        let character: usize = text[line_start..offset]
            .chars()
            .map(|c| c.len_utf16())
            .sum();
        Position::new(line, character as u32)
    }

    /// Convert an LSP position (UTF-16 column) to a byte offset. Positions
    /// past the end of a line clamp to the end of that line; a line past the
    /// end of the document resolves to the document end.
    pub fn offset(&self, text: &str, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return text.len();
        }
        let line_start = self.line_starts[line];
        let line_end = text[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(text.len());

        let mut units = 0u32;
        for (i, c) in text[line_start..line_end].char_indices() {
            if units >= position.character {
                return line_start + i;
            }
            units += c.len_utf16() as u32;
        }
        line_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trip_ascii() {
        let text = "select 1\nselect 2\n";
        let index = LineIndex::new(text);
        let off = text.find('2').unwrap();
        let pos = index.position(text, off);
        assert_eq!(pos, Position::new(1, 7));
        assert_eq!(index.offset(text, pos), off);
    }

    #[test]
    fn test_position_utf16_columns() {
        // 'é' is 2 bytes in UTF-8 but 1 UTF-16 unit.
        let text = "sélect x";
        let index = LineIndex::new(text);
        let off = text.find('x').unwrap();
        let pos = index.position(text, off);
        assert_eq!(pos, Position::new(0, 7));
        assert_eq!(index.offset(text, pos), off);
    }

    #[test]
    fn test_offset_clamps_past_line_end() {
        let text = "ab\ncd";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(text, Position::new(0, 99)), 2);
        assert_eq!(index.offset(text, Position::new(9, 0)), text.len());
    }

    #[test]
    fn test_document_update() {
        let mut doc = Document::new("a".to_string(), 1);
        doc.update("a\nb".to_string(), 2);
        assert_eq!(doc.version, 2);
        assert_eq!(doc.position(2), Position::new(1, 0));
    }
}
