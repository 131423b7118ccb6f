use crate::document::{Range, TextDocument};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A formatting edit: replace a character span of the original document.
///
/// Offsets address the document as it was when the formatter ran. Edits from
/// one run never overlap and are kept in the order the formatter emitted them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "TextEdit does nothing until applied"]
pub struct TextEdit {
    /// Line/column range, built from the document's own position mapping
    pub range: Range,
    /// Starting character offset (inclusive)
    pub char_start: usize,
    /// Ending character offset (exclusive)
    pub char_end: usize,
    /// Replacement text; empty for pure deletions
    pub new_text: String,
}

impl TextEdit {
    /// Build an edit over `[char_start, char_end)` of `document`.
    pub fn new(
        document: &impl TextDocument,
        char_start: usize,
        char_end: usize,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            range: Range::new(
                document.position_at(char_start),
                document.position_at(char_end),
            ),
            char_start,
            char_end,
            new_text: new_text.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Invalid character range: [{char_start}, {char_end}) in text of length {text_len}")]
    InvalidRange {
        char_start: usize,
        char_end: usize,
        text_len: usize,
    },

    #[error("Overlapping edits at [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Apply a whole edit set to `text` and return the result.
///
/// Either every edit applies or none does: ranges and overlap are checked
/// before anything is spliced. Edits are applied bottom-to-top so earlier
/// offsets stay valid.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(text.to_string());
    }

    // Byte offset of every character boundary, including the end
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    // Descending by position; equal positions apply the later-emitted edit
    // first so insertions at one point keep their emission order.
    let mut indexed: Vec<(usize, &TextEdit)> = edits.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        b.char_start
            .cmp(&a.char_start)
            .then(b.char_end.cmp(&a.char_end))
            .then(ib.cmp(ia))
    });
    let ordered: Vec<&TextEdit> = indexed.into_iter().map(|(_, edit)| edit).collect();

    for edit in &ordered {
        if edit.char_start > edit.char_end || edit.char_end > char_len {
            return Err(EditError::InvalidRange {
                char_start: edit.char_start,
                char_end: edit.char_end,
                text_len: char_len,
            });
        }
    }

    // Sorted descending: the earlier edit must end before the later one starts
    for window in ordered.windows(2) {
        let (later, earlier) = (window[0], window[1]);
        if earlier.char_end > later.char_start {
            return Err(EditError::Overlap {
                first_start: earlier.char_start,
                first_end: earlier.char_end,
                second_start: later.char_start,
                second_end: later.char_end,
            });
        }
    }

    let mut result = text.to_string();
    for edit in ordered {
        let start = boundaries[edit.char_start];
        let end = boundaries[edit.char_end];
        result.replace_range(start..end, &edit.new_text);
    }

    Ok(result)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the file is left untouched.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Position, SourceDocument};
    use std::fs;

    fn edit(doc: &SourceDocument, start: usize, end: usize, text: &str) -> TextEdit {
        TextEdit::new(doc, start, end, text)
    }

    #[test]
    fn test_edit_builds_range_from_document() {
        let doc = SourceDocument::new("ab\ncd");
        let e = edit(&doc, 1, 4, "X");
        assert_eq!(e.range.start, Position::new(0, 1));
        assert_eq!(e.range.end, Position::new(1, 1));
        assert_eq!((e.char_start, e.char_end), (1, 4));
    }

    #[test]
    fn test_apply_single_insertion() {
        let doc = SourceDocument::new("int main(){return 0;}");
        let result = apply_edits(doc.text(), &[edit(&doc, 10, 10, "\n")]).unwrap();
        assert_eq!(result, "int main()\n{return 0;}");
    }

    #[test]
    fn test_apply_uses_character_offsets() {
        let doc = SourceDocument::new("é  = 1;");
        // collapse the two spaces after 'é'
        let result = apply_edits(doc.text(), &[edit(&doc, 1, 3, " ")]).unwrap();
        assert_eq!(result, "é = 1;");
    }

    #[test]
    fn test_apply_batch_in_any_order() {
        let doc = SourceDocument::new("line1\nline2\nline3\n");
        let edits = vec![
            edit(&doc, 0, 5, "LINE1"),
            edit(&doc, 12, 17, "LINE3"),
            edit(&doc, 6, 11, "LINE2"),
        ];
        let result = apply_edits(doc.text(), &edits).unwrap();
        assert_eq!(result, "LINE1\nLINE2\nLINE3\n");
    }

    #[test]
    fn test_adjacent_insertions_and_replacement() {
        let doc = SourceDocument::new("ab");
        let edits = vec![edit(&doc, 1, 1, "-"), edit(&doc, 1, 2, "B")];
        assert_eq!(apply_edits(doc.text(), &edits).unwrap(), "a-B");
    }

    #[test]
    fn test_insertions_at_same_point_keep_order() {
        let doc = SourceDocument::new("ab");
        let edits = vec![edit(&doc, 1, 1, "x"), edit(&doc, 1, 1, "y")];
        assert_eq!(apply_edits(doc.text(), &edits).unwrap(), "axyb");
    }

    #[test]
    fn test_overlap_is_rejected() {
        let doc = SourceDocument::new("hello world");
        let edits = vec![edit(&doc, 0, 5, "x"), edit(&doc, 3, 8, "y")];
        assert!(matches!(
            apply_edits(doc.text(), &edits),
            Err(EditError::Overlap { .. })
        ));
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let doc = SourceDocument::new("abc");
        let bad = TextEdit {
            range: Range::default(),
            char_start: 2,
            char_end: 9,
            new_text: String::new(),
        };
        assert!(matches!(
            apply_edits(doc.text(), &[bad]),
            Err(EditError::InvalidRange { text_len: 3, .. })
        ));
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.nss");
        fs::write(&file_path, b"original content").unwrap();

        write_atomic(&file_path, b"formatted content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "formatted content");
    }
}
