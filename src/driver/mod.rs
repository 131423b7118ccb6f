//! Formatting requests against an external formatter.
//!
//! [`Formatter`] turns a document (and optionally a range of it) into a list
//! of [`TextEdit`]s by running a clang-format compatible executable:
//!
//! 1. Skip disabled configurations and ignored files
//! 2. Build `-output-replacements-xml -style=... [-offset= -length=]`
//! 3. Run the formatter with the document on stdin, parsing its replacement
//!    XML as it streams out
//! 4. Resolve from stderr and the exit status
//!
//! Edits are only returned once the whole run succeeded; nothing partial
//! escapes a failed or cancelled run.
//!
//! # Example
//!
//! ```no_run
//! use format_bridge::config::{FormatterConfig, VariableContext};
//! use format_bridge::document::SourceDocument;
//! use format_bridge::driver::{FormatOutcome, Formatter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let formatter = Formatter::new(FormatterConfig::default(), VariableContext::from_env(None));
//! let document = SourceDocument::open("scripts/nw_s0_fireball.nss")?;
//!
//! if let FormatOutcome::Edits(edits) = formatter.format_document(&document).await? {
//!     println!("{} edits", edits.len());
//! }
//! # Ok(())
//! # }
//! ```

mod errors;
mod invocation;

pub use errors::FormatError;

use crate::config::{is_ignored, FormatterConfig, VariableContext};
use crate::document::{Range, TextDocument};
use crate::edit::TextEdit;
use crate::offset::byte_span;
use crate::resolver::ExecutableResolver;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of a formatting request that did not fail.
#[derive(Debug)]
#[must_use = "FormatOutcome carries the edits to apply"]
pub enum FormatOutcome {
    /// Edits in formatter order; empty when the document is already formatted
    Edits(Vec<TextEdit>),
    /// Nothing was run
    Skipped(SkipReason),
}

impl FormatOutcome {
    pub fn into_edits(self) -> Vec<TextEdit> {
        match self {
            FormatOutcome::Edits(edits) => edits,
            FormatOutcome::Skipped(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `enabled = false` in the configuration
    Disabled,
    /// The document is under one of the ignored paths
    Ignored(PathBuf),
    /// The formatter executable could not be found
    ExecutableNotFound(PathBuf),
}

/// Runs formatting requests for one configuration.
///
/// Holds the executable resolver, so resolved paths are cached for as long as
/// the formatter lives. Each request gets its own offset translator.
#[derive(Debug)]
pub struct Formatter {
    config: FormatterConfig,
    variables: VariableContext,
    resolver: ExecutableResolver,
}

impl Formatter {
    pub fn new(config: FormatterConfig, variables: VariableContext) -> Self {
        Self {
            config,
            variables,
            resolver: ExecutableResolver::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: ExecutableResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn variables(&self) -> &VariableContext {
        &self.variables
    }

    /// Resolved formatter executable for this platform.
    pub fn executable(&self) -> PathBuf {
        let configured = self.variables.expand(self.config.executable_for_platform());
        self.resolver.resolve(&configured)
    }

    /// Directory the formatter runs in.
    ///
    /// A configured override must exist. Otherwise the first existing
    /// directory of: the document's directory, the workspace root, the current
    /// directory. Unsaved documents may name a directory that is not on disk.
    pub fn working_dir(&self, document: &impl TextDocument) -> Result<PathBuf, FormatError> {
        if let Some(dir) = &self.config.working_dir {
            let path = PathBuf::from(self.variables.expand(dir));
            if !path.is_dir() {
                return Err(FormatError::MissingWorkingDir { path });
            }
            return Ok(path);
        }

        let document_dir = document
            .path()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty());
        let found = document_dir
            .into_iter()
            .chain(self.variables.workspace_root.as_deref())
            .find(|dir| dir.is_dir());

        Ok(match (found, &self.variables.cwd) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(cwd)) => cwd.clone(),
            (None, None) => PathBuf::from("."),
        })
    }

    /// Formatter arguments for `document`, restricted to `range` if given.
    pub fn build_args(
        &self,
        document: &impl TextDocument,
        range: Option<Range>,
    ) -> Result<Vec<String>, FormatError> {
        let mut args = vec![
            "-output-replacements-xml".to_string(),
            format!("-style={}", self.config.style.to_arg()?),
        ];

        if let Some(range) = range {
            let start = document.offset_at(range.start);
            let end = document.offset_at(range.end);
            let (offset, length) = byte_span(document.text(), start, end);
            args.push(format!("-offset={offset}"));
            args.push(format!("-length={length}"));
        }

        if self.config.assume_filename {
            if let Some(path) = document.path() {
                args.push(format!("-assume-filename={}", path.display()));
            }
        }

        args.extend(self.config.extra_args.iter().cloned());
        Ok(args)
    }

    /// Format the whole document.
    pub async fn format_document<D: TextDocument>(
        &self,
        document: &D,
    ) -> Result<FormatOutcome, FormatError> {
        self.format(document, None, std::future::pending()).await
    }

    /// Format only `range` of the document.
    pub async fn format_range<D: TextDocument>(
        &self,
        document: &D,
        range: Range,
    ) -> Result<FormatOutcome, FormatError> {
        self.format(document, Some(range), std::future::pending())
            .await
    }

    /// Format `document`, abandoning the run when `cancel` completes first.
    ///
    /// On cancellation the formatter process is killed and
    /// [`FormatError::Cancelled`] is returned.
    pub async fn format<D, C>(
        &self,
        document: &D,
        range: Option<Range>,
        cancel: C,
    ) -> Result<FormatOutcome, FormatError>
    where
        D: TextDocument,
        C: Future<Output = ()>,
    {
        if !self.config.enabled {
            return Ok(FormatOutcome::Skipped(SkipReason::Disabled));
        }

        if let Some(path) = document.path() {
            if is_ignored(
                self.variables.workspace_root.as_deref(),
                path,
                &self.config.ignored_paths,
            ) {
                debug!(path = %path.display(), "document is in an ignored path");
                return Ok(FormatOutcome::Skipped(SkipReason::Ignored(
                    path.to_path_buf(),
                )));
            }
        }

        let program = self.executable();
        let args = self.build_args(document, range)?;
        let cwd = self.working_dir(document)?;

        match invocation::run(&program, &args, &cwd, document, cancel).await {
            Ok(edits) => Ok(FormatOutcome::Edits(edits)),
            // an existing program failing with ENOENT (bad interpreter line) is a
            // spawn failure, not a missing formatter
            Err(FormatError::Spawn { path, source })
                if source.kind() == std::io::ErrorKind::NotFound && !path.is_file() =>
            {
                info!(
                    "The {} command is not available. Check the `executable` setting and make sure the formatter is installed.",
                    path.display()
                );
                Ok(FormatOutcome::Skipped(SkipReason::ExecutableNotFound(path)))
            }
            Err(e) => Err(e),
        }
    }
}
