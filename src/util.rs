/// Utility functions for the msbuild-lsp server.
///
/// This module contains the text-position plumbing shared by the document
/// model, the location resolver and the completion handler: byte ranges,
/// a line index for LSP position conversion, and small character helpers.
use tower_lsp::lsp_types::{Position, Range};

/// A half-open byte range `[start, end)` into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range {start}..{end}");
        Self { start, end }
    }

    /// A zero-width range at `offset` (pure insertion point).
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive containment: `start <= offset <= end`.
    ///
    /// The cursor sitting right after the last character of a token still
    /// counts as "in" that token, which is what completion wants.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Strict containment: `start < offset < end`.
    pub fn strictly_contains(&self, offset: usize) -> bool {
        self.start < offset && offset < self.end
    }

    pub fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Maps byte offsets to LSP positions and back.
///
/// LSP columns are UTF-16 code units; the index keeps the byte offset of
/// every line start and walks the line's characters for the column part.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Positions past the end of a line clamp to the line end; positions
    /// past the last line clamp to the end of the text.  Returns `None`
    /// only when the text and the index disagree (the index is stale).
    pub fn offset(&self, text: &str, position: Position) -> Option<usize> {
        if text.len() != self.len {
            return None;
        }
        let line = position.line as usize;
        let Some(&line_start) = self.line_starts.get(line) else {
            return Some(self.len);
        };
        let line_end = self.line_end(line);
        let line_text = &text[line_start..line_end];

        let mut utf16_col = 0u32;
        for (idx, ch) in line_text.char_indices() {
            if utf16_col >= position.character {
                return Some(line_start + idx);
            }
            utf16_col += ch.len_utf16() as u32;
        }
        Some(line_end)
    }

    /// Convert a byte offset to an LSP position.
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = clamp_to_char_boundary(text, offset.min(text.len()));
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let character: usize = text[line_start..offset]
            .chars()
            .map(char::len_utf16)
            .sum();
        Position {
            line: line as u32,
            character: character as u32,
        }
    }

    pub fn range(&self, text: &str, range: TextRange) -> Range {
        Range {
            start: self.position(text, range.start),
            end: self.position(text, range.end),
        }
    }

    /// Byte offset of the end of `line`, excluding its line terminator.
    fn line_end(&self, line: usize) -> usize {
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.len);
        end.max(self.line_starts[line])
    }
}

/// Convert an LSP Position (line, character) to a byte offset in content.
///
/// Convenience wrapper for callers that do not keep a [`LineIndex`].
pub fn position_to_byte_offset(content: &str, position: Position) -> usize {
    LineIndex::new(content)
        .offset(content, position)
        .unwrap_or(content.len())
}

/// Move `offset` backwards until it lands on a UTF-8 character boundary.
pub fn clamp_to_char_boundary(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Characters that may appear in an element or attribute name.
pub fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

/// Start of the run of name characters that ends at `offset`.
pub fn name_start_before(text: &str, offset: usize) -> usize {
    let offset = clamp_to_char_boundary(text, offset);
    text[..offset]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_name_char(c))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(offset)
}

/// End of the run of name characters that starts at `offset`.
pub fn name_end_after(text: &str, offset: usize) -> usize {
    let offset = clamp_to_char_boundary(text, offset);
    text[offset..]
        .char_indices()
        .find(|&(_, c)| !is_name_char(c))
        .map(|(idx, _)| offset + idx)
        .unwrap_or(text.len())
}

/// Apply a text replacement, clamping the range to the text and to
/// character boundaries.
pub fn apply_edit(text: &str, range: TextRange, new_text: &str) -> String {
    let start = clamp_to_char_boundary(text, range.start);
    let end = clamp_to_char_boundary(text, range.end).max(start);
    let mut out = String::with_capacity(text.len() - (end - start) + new_text.len());
    out.push_str(&text[..start]);
    out.push_str(new_text);
    out.push_str(&text[end..]);
    out
}
