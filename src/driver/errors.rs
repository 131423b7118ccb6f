use crate::replacements::ProtocolError;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    /// The formatter wrote diagnostics; its output is not trusted.
    #[error("Cannot format due to syntax errors.")]
    Syntax { stderr: String },

    #[error("formatter produced malformed replacements: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("formatter exited with {status}")]
    ProcessFailed { status: ExitStatus },

    #[error("failed to start formatter {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("working directory {} does not exist", path.display())]
    MissingWorkingDir { path: PathBuf },

    #[error("I/O error talking to formatter: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid style configuration: {0}")]
    Style(#[from] serde_json::Error),

    #[error("Cancelation requested.")]
    Cancelled,
}

impl FormatError {
    /// Cancellation is requested by the caller and is not a defect.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FormatError::Cancelled)
    }

    /// The formatter's diagnostics, if this failure carries any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            FormatError::Syntax { stderr } => Some(stderr),
            _ => None,
        }
    }
}
