//! One formatter run: spawn, feed stdin, stream stdout into the replacement
//! parser, collect stderr, and decide the result from the exit status.
//!
//! All four activities are joined inside a single future, so nothing runs on
//! another task and the whole run can be abandoned at any await point.

use super::FormatError;
use crate::document::TextDocument;
use crate::edit::TextEdit;
use crate::replacements::{self, ProtocolError};
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, error};

pub(crate) async fn run<D, C>(
    program: &Path,
    args: &[String],
    cwd: &Path,
    document: &D,
    cancel: C,
) -> Result<Vec<TextEdit>, FormatError>
where
    D: TextDocument,
    C: Future<Output = ()>,
{
    debug!(program = %program.display(), ?args, cwd = %cwd.display(), "spawning formatter");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| FormatError::Spawn {
            path: program.to_path_buf(),
            source,
        })?;

    let (stdin, stdout, stderr) = match take_stdio(&mut child) {
        Ok(stdio) => stdio,
        Err(e) => {
            kill(&mut child).await;
            return Err(e.into());
        }
    };

    let run = async {
        let (written, parsed, errors) = tokio::join!(
            write_input(stdin, document.text()),
            parse_output(stdout, document),
            read_errors(stderr),
        );
        let status = child.wait().await;
        (written, parsed, errors, status)
    };

    let finished = tokio::select! {
        biased;
        () = cancel => None,
        finished = run => Some(finished),
    };

    let Some((written, parsed, errors, status)) = finished else {
        debug!("cancellation requested, killing formatter");
        kill(&mut child).await;
        return Err(FormatError::Cancelled);
    };

    let stderr = errors?;
    if !stderr.is_empty() {
        error!(program = %program.display(), "formatter reported errors:\n{stderr}");
        return Err(FormatError::Syntax { stderr });
    }

    let status = status?;
    if !status.success() {
        return Err(FormatError::ProcessFailed { status });
    }

    written?;
    let edits = parsed?;
    debug!(edits = edits.len(), "formatter finished");
    Ok(edits)
}

fn take_stdio(child: &mut Child) -> io::Result<(ChildStdin, ChildStdout, ChildStderr)> {
    let missing = |name: &str| io::Error::new(io::ErrorKind::BrokenPipe, format!("formatter {name} unavailable"));
    let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
    let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;
    Ok((stdin, stdout, stderr))
}

/// Write the whole document, then close stdin so the formatter sees EOF.
async fn write_input(mut stdin: ChildStdin, text: &str) -> io::Result<()> {
    let result = stdin.write_all(text.as_bytes()).await;
    drop(stdin);
    match result {
        // the formatter stopped reading; its exit status and stderr say why
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("formatter closed stdin early");
            Ok(())
        }
        other => other,
    }
}

async fn parse_output<D: TextDocument>(
    stdout: ChildStdout,
    document: &D,
) -> Result<Vec<TextEdit>, ProtocolError> {
    let mut reader = BufReader::new(stdout);
    let parsed = replacements::parse_stream(document, &mut reader).await;
    if parsed.is_err() {
        // keep draining so a chatty formatter cannot block on a full pipe
        let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
    }
    parsed
}

async fn read_errors(mut stderr: ChildStderr) -> io::Result<String> {
    let mut buf = Vec::new();
    stderr.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("failed to kill formatter: {e}");
    }
}
