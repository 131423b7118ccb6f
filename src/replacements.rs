//! Streaming parser for the formatter's replacement XML.
//!
//! The formatter writes a document of the form
//!
//! ```xml
//! <?xml version='1.0'?>
//! <replacements xml:space='preserve' incomplete_format='false'>
//! <replacement offset='10' length='0'>&#10;</replacement>
//! </replacements>
//! ```
//!
//! where `offset` and `length` are UTF-8 byte positions in the input. Each
//! `<replacement>` becomes one [`TextEdit`] as soon as its end tag is read, so
//! edits are produced while the child process is still writing.
//!
//! [`ReplacementParser`] is the state machine; [`parse_stream`] drives it from
//! an async reader and [`parse_str`] from an in-memory string.

use crate::document::TextDocument;
use crate::edit::TextEdit;
use crate::offset::{ByteOffsetTranslator, CharSpan, OffsetError};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tracing::{trace, warn};

const ROOT_TAG: &[u8] = b"replacements";
const REPLACEMENT_TAG: &[u8] = b"replacement";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unexpected tag {name}.")]
    UnexpectedTag { name: String },

    #[error("Malformed output: <replacement> opened inside another <replacement>")]
    NestedReplacement,

    #[error("Malformed output: <replacement> outside of <replacements>")]
    ReplacementOutsideRoot,

    #[error("Malformed output: unexpected closing tag {name}")]
    UnexpectedClose { name: String },

    #[error("replacement is missing the '{attribute}' attribute")]
    MissingAttribute { attribute: &'static str },

    #[error("replacement attribute '{attribute}' is not a byte count: {value:?}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },

    #[error("unknown entity reference &{name};")]
    UnknownEntity { name: String },

    #[error("formatter output ended inside an open element")]
    Truncated,

    #[error("formatter output is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("replacement out of range: {0}")]
    Offset(#[from] OffsetError),

    #[error("malformed replacement XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed character data: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Idle,
    InReplacements,
    InReplacement,
}

/// A replacement whose end tag has not been seen yet.
#[derive(Debug)]
struct PendingEdit {
    byte_offset: usize,
    byte_length: usize,
    span: CharSpan,
    text: String,
}

/// Converts replacement XML events into character-indexed edits.
///
/// Owns the byte-offset translator for one formatting run, so its anchor
/// cache never outlives the document it was built for.
pub struct ReplacementParser<'d, D: TextDocument> {
    document: &'d D,
    translator: ByteOffsetTranslator<'d>,
    state: ParserState,
    pending: Option<PendingEdit>,
    edits: Vec<TextEdit>,
    incomplete_format: bool,
}

impl<'d, D: TextDocument> ReplacementParser<'d, D> {
    pub fn new(document: &'d D) -> Self {
        Self {
            document,
            translator: ByteOffsetTranslator::new(document.text()),
            state: ParserState::Idle,
            pending: None,
            edits: Vec::new(),
            incomplete_format: false,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Edits finalized so far, in emission order.
    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    /// Whether the formatter flagged its output as incomplete.
    pub fn incomplete_format(&self) -> bool {
        self.incomplete_format
    }

    /// Feed one XML event. Returns `Ok(false)` once the end of input is seen.
    pub fn handle_event(&mut self, event: Event<'_>) -> Result<bool, ProtocolError> {
        match event {
            Event::Start(start) => self.open(&start)?,
            Event::Empty(start) => {
                self.open(&start)?;
                self.close(start.name().as_ref())?;
            }
            Event::End(end) => self.close(end.name().as_ref())?,
            Event::Text(text) => {
                if self.state == ParserState::InReplacement {
                    let raw = std::str::from_utf8(&text)?;
                    let unescaped = quick_xml::escape::unescape(raw)?;
                    self.push_text(&unescaped);
                }
            }
            Event::CData(data) => {
                if self.state == ParserState::InReplacement {
                    let raw = data.into_inner();
                    self.push_text(std::str::from_utf8(&raw)?);
                }
            }
            Event::GeneralRef(reference) => {
                if self.state == ParserState::InReplacement {
                    let name = std::str::from_utf8(reference.as_ref())?;
                    let resolved = resolve_reference(name)?;
                    self.push_text(&resolved);
                }
            }
            Event::Eof => {
                if self.state != ParserState::Idle {
                    return Err(ProtocolError::Truncated);
                }
                return Ok(false);
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        Ok(true)
    }

    /// Consume the parser, returning all edits.
    pub fn finish(self) -> Result<Vec<TextEdit>, ProtocolError> {
        if self.state != ParserState::Idle {
            return Err(ProtocolError::Truncated);
        }
        if self.incomplete_format {
            warn!("formatter reported incomplete formatting; applying partial edits");
        }
        Ok(self.edits)
    }

    fn open(&mut self, start: &BytesStart<'_>) -> Result<(), ProtocolError> {
        let name = start.name();
        match (self.state, name.as_ref()) {
            (ParserState::Idle, ROOT_TAG) => {
                if let Some(attr) = start.try_get_attribute("incomplete_format")? {
                    self.incomplete_format = attr.value.as_ref() == b"true";
                }
                self.state = ParserState::InReplacements;
            }
            (ParserState::InReplacements, REPLACEMENT_TAG) => {
                let byte_offset = read_usize(start, "offset")?;
                let byte_length = read_usize(start, "length")?;
                let span = self.translator.translate(byte_offset, byte_length)?;
                self.pending = Some(PendingEdit {
                    byte_offset,
                    byte_length,
                    span,
                    text: String::new(),
                });
                self.state = ParserState::InReplacement;
            }
            (ParserState::InReplacement, _) => return Err(ProtocolError::NestedReplacement),
            (ParserState::Idle, REPLACEMENT_TAG) => {
                return Err(ProtocolError::ReplacementOutsideRoot)
            }
            (_, other) => {
                return Err(ProtocolError::UnexpectedTag {
                    name: String::from_utf8_lossy(other).into_owned(),
                })
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), ProtocolError> {
        match (self.state, name) {
            (ParserState::InReplacement, REPLACEMENT_TAG) => {
                let pending = self.pending.take().ok_or(ProtocolError::Truncated)?;
                trace!(
                    byte_offset = pending.byte_offset,
                    byte_length = pending.byte_length,
                    char_offset = pending.span.offset,
                    char_length = pending.span.length,
                    "replacement"
                );
                self.edits.push(TextEdit::new(
                    self.document,
                    pending.span.offset,
                    pending.span.end(),
                    pending.text,
                ));
                self.state = ParserState::InReplacements;
            }
            (ParserState::InReplacements, ROOT_TAG) => {
                self.state = ParserState::Idle;
            }
            (_, other) => {
                return Err(ProtocolError::UnexpectedClose {
                    name: String::from_utf8_lossy(other).into_owned(),
                })
            }
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(pending) = self.pending.as_mut() {
            pending.text.push_str(text);
        }
    }
}

fn read_usize(start: &BytesStart<'_>, attribute: &'static str) -> Result<usize, ProtocolError> {
    let attr = start
        .try_get_attribute(attribute)?
        .ok_or(ProtocolError::MissingAttribute { attribute })?;
    let value = std::str::from_utf8(&attr.value)?;
    value
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidAttribute {
            attribute,
            value: value.to_string(),
        })
}

/// Resolve a character (`#10`, `#x0A`) or predefined (`amp`) entity name.
fn resolve_reference(name: &str) -> Result<String, ProtocolError> {
    let unknown = || ProtocolError::UnknownEntity {
        name: name.to_string(),
    };

    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| unknown())?;
        return char::from_u32(code)
            .map(String::from)
            .ok_or_else(unknown);
    }

    resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(unknown)
}

fn new_reader<R>(reader: R) -> Reader<R> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(false);
    reader
}

/// Parse replacement XML from an async byte stream as it arrives.
pub async fn parse_stream<D, R>(document: &D, reader: R) -> Result<Vec<TextEdit>, ProtocolError>
where
    D: TextDocument,
    R: AsyncBufRead + Unpin,
{
    let mut reader = new_reader(reader);
    let mut parser = ReplacementParser::new(document);
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into_async(&mut buf).await?;
        if !parser.handle_event(event)? {
            break;
        }
        buf.clear();
    }

    parser.finish()
}

/// Parse a complete replacement XML document.
pub fn parse_str<D: TextDocument>(document: &D, xml: &str) -> Result<Vec<TextEdit>, ProtocolError> {
    let mut reader = new_reader(xml.as_bytes());
    let mut parser = ReplacementParser::new(document);

    loop {
        let event = reader.read_event()?;
        if !parser.handle_event(event)? {
            break;
        }
    }

    parser.finish()
}
