//! Byte-offset to character-offset translation.
//!
//! Formatters report positions as offsets into the UTF-8 encoding of the
//! document, while the document model addresses text in characters (Unicode
//! scalar values). [`ByteOffsetTranslator`] converts between the two.
//!
//! Replacements arrive in ascending offset order, so the translator keeps a
//! single anchor `(last_byte, last_char)` and only decodes the bytes between
//! the anchor and the requested offset. An offset behind the anchor falls back
//! to decoding from the start of the text. Total cost for an ordered stream is
//! `O(text length + replacements)` instead of quadratic.
//!
//! A translator is scoped to one document and one formatting run. Create a new
//! one per request; never share one between documents.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OffsetError {
    #[error("byte span [{byte_offset}, {byte_offset}+{byte_length}) is outside text of {text_len} bytes")]
    OutOfBounds {
        byte_offset: usize,
        byte_length: usize,
        text_len: usize,
    },
}

/// A character-indexed span produced by [`ByteOffsetTranslator::translate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharSpan {
    pub offset: usize,
    pub length: usize,
}

impl CharSpan {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Translates byte offsets into character offsets for one document.
#[derive(Debug, Clone)]
pub struct ByteOffsetTranslator<'a> {
    bytes: &'a [u8],
    last_byte: usize,
    last_char: usize,
}

impl<'a> ByteOffsetTranslator<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            last_byte: 0,
            last_char: 0,
        }
    }

    /// Translate a `(byte_offset, byte_length)` pair into characters.
    ///
    /// The anchor moves to `byte_offset` on every call. The length is always
    /// decoded from scratch.
    pub fn translate(
        &mut self,
        byte_offset: usize,
        byte_length: usize,
    ) -> Result<CharSpan, OffsetError> {
        let end = byte_offset
            .checked_add(byte_length)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(OffsetError::OutOfBounds {
                byte_offset,
                byte_length,
                text_len: self.bytes.len(),
            })?;

        let offset = if byte_offset >= self.last_byte {
            self.last_char + count_chars(&self.bytes[self.last_byte..byte_offset])
        } else {
            count_chars(&self.bytes[..byte_offset])
        };
        self.last_byte = byte_offset;
        self.last_char = offset;

        let length = count_chars(&self.bytes[byte_offset..end]);

        Ok(CharSpan { offset, length })
    }

    /// Current anchor as `(byte, char)`.
    pub fn anchor(&self) -> (usize, usize) {
        (self.last_byte, self.last_char)
    }
}

/// Count decoded characters in a UTF-8 byte slice.
///
/// Invalid or truncated sequences count as U+FFFD replacement characters, the
/// same way a lossy decode would render them.
pub fn count_chars(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.chars().count(),
        Err(_) => String::from_utf8_lossy(bytes).chars().count(),
    }
}

/// Byte offset of the character at `char_offset`, clamped to the text length.
pub fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Convert a character range into a `(byte_offset, byte_length)` pair.
///
/// This is the direction used when asking the formatter to restrict itself to
/// part of the document. Both ends clamp to the end of the text.
pub fn byte_span(text: &str, char_start: usize, char_end: usize) -> (usize, usize) {
    let start = char_to_byte(text, char_start);
    let end = char_to_byte(text, char_end.max(char_start));
    (start, end - start)
}
