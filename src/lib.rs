//! Format Bridge: editor-side driver for clang-format compatible formatters
//!
//! The formatter is run as an external process with
//! `-output-replacements-xml`. Its output is a stream of byte-offset
//! replacements, which this crate turns into character-indexed
//! [`TextEdit`]s against the document that was sent.
//!
//! # Architecture
//!
//! - [`offset`]: byte offsets in the UTF-8 text to character offsets, with a
//!   single monotonic anchor so in-order replacements decode in linear time
//! - [`replacements`]: streaming parser for the replacement XML
//! - [`driver`]: spawns the formatter, feeds stdin, parses stdout as it
//!   arrives, and decides the outcome from stderr and the exit status
//! - [`resolver`]: finds the formatter executable on `PATH`
//! - [`config`]: TOML configuration with `${workspaceRoot}`-style variables
//! - [`edit`]: applies a batch of edits to text and writes files atomically
//!
//! # Example
//!
//! ```no_run
//! use format_bridge::{apply_edits, Formatter, FormatterConfig, SourceDocument, TextDocument, VariableContext};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let formatter = Formatter::new(FormatterConfig::default(), VariableContext::from_env(None));
//! let document = SourceDocument::open("scripts/main.nss")?;
//!
//! let edits = formatter.format_document(&document).await?.into_edits();
//! let formatted = apply_edits(document.text(), &edits)?;
//! println!("{formatted}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod driver;
pub mod edit;
pub mod log;
pub mod offset;
pub mod replacements;
pub mod resolver;

// Re-exports
pub use config::{
    load_for_workspace, load_from_path, load_from_str, ConfigError, FormatterConfig, StyleSpec,
    ValidationError, VariableContext,
};
pub use document::{Position, Range, SourceDocument, TextDocument};
pub use driver::{FormatError, FormatOutcome, Formatter, SkipReason};
pub use edit::{apply_edits, write_atomic, EditError, TextEdit};
pub use offset::{ByteOffsetTranslator, CharSpan, OffsetError};
pub use replacements::{parse_str, parse_stream, ParserState, ProtocolError, ReplacementParser};
pub use resolver::ExecutableResolver;
