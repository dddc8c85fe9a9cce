//! Child-process spawning with streamed output.
//!
//! Stdout and stderr are read concurrently and handed to a callback chunk by
//! chunk, in arrival order. A chunk that ends in the middle of a UTF-8
//! sequence is held back until the rest arrives.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::PipelineError;

const READ_BUF_SIZE: usize = 8 * 1024;

/// Program, arguments, and working directory of one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `program arg1 arg2`, for log lines.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One piece of output from a running child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Stdout(String),
    Stderr(String),
    /// Reading one of the pipes failed. The other keeps being read.
    ReadError(String),
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitInfo {
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0)) && self.signal.is_none()
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;
        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Spawn `spec`, feed every output chunk to `on_event`, and wait for exit.
///
/// If `on_event` returns an error the child is killed and the error is
/// returned.
///
/// # Errors
///
/// Returns [`PipelineError::Spawn`] if the process cannot be started or
/// waited on, or whatever `on_event` returns.
pub async fn run_streaming<F>(
    spec: &CommandSpec,
    mut on_event: F,
) -> Result<ExitInfo, PipelineError>
where
    F: FnMut(OutputEvent) -> Result<(), PipelineError>,
{
    let spawn_err = |source| PipelineError::Spawn {
        program: spec.program.clone(),
        source,
    };

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(spawn_err)?;

    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(spawn_err(std::io::Error::other("child pipes were not captured")));
    };

    let mut out_buf = vec![0u8; READ_BUF_SIZE];
    let mut err_buf = vec![0u8; READ_BUF_SIZE];
    let mut out_text = Utf8Chunker::default();
    let mut err_text = Utf8Chunker::default();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => match read {
                Ok(0) => {
                    out_open = false;
                    if let Some(rest) = out_text.finish() {
                        on_event(OutputEvent::Stdout(rest))?;
                    }
                }
                Ok(n) => {
                    if let Some(text) = out_text.push(&out_buf[..n]) {
                        on_event(OutputEvent::Stdout(text))?;
                    }
                }
                Err(error) => {
                    out_open = false;
                    on_event(OutputEvent::ReadError(format!("stdout: {error}")))?;
                }
            },
            read = stderr.read(&mut err_buf), if err_open => match read {
                Ok(0) => {
                    err_open = false;
                    if let Some(rest) = err_text.finish() {
                        on_event(OutputEvent::Stderr(rest))?;
                    }
                }
                Ok(n) => {
                    if let Some(text) = err_text.push(&err_buf[..n]) {
                        on_event(OutputEvent::Stderr(text))?;
                    }
                }
                Err(error) => {
                    err_open = false;
                    on_event(OutputEvent::ReadError(format!("stderr: {error}")))?;
                }
            },
        }
    }

    let status = child.wait().await.map_err(spawn_err)?;
    Ok(ExitInfo::from(status))
}

/// Run `spec` and log its output line by line, tagged with `tag`.
///
/// Stdout lines are logged at info, stderr lines at warn.
///
/// # Errors
///
/// Returns [`PipelineError::Spawn`] if the process cannot be started.
pub async fn run_logged(spec: &CommandSpec, tag: &str) -> Result<ExitInfo, PipelineError> {
    let mut out_lines = LineBuffer::default();
    let mut err_lines = LineBuffer::default();

    let exit = run_streaming(spec, |event| {
        match event {
            OutputEvent::Stdout(text) => {
                for line in out_lines.push(&text) {
                    tracing::info!(repo = tag, "{line}");
                }
            }
            OutputEvent::Stderr(text) => {
                for line in err_lines.push(&text) {
                    tracing::warn!(repo = tag, "{line}");
                }
            }
            OutputEvent::ReadError(error) => tracing::warn!(repo = tag, %error, "output lost"),
        }
        Ok(())
    })
    .await?;

    if let Some(line) = out_lines.finish() {
        tracing::info!(repo = tag, "{line}");
    }
    if let Some(line) = err_lines.finish() {
        tracing::warn!(repo = tag, "{line}");
    }
    Ok(exit)
}

/// Decodes a byte stream into text without splitting multi-byte characters.
#[derive(Debug, Default)]
struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // Incomplete sequence at the end: hold it back.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            // Genuinely invalid bytes: give up on exactness.
            Err(_) => self.pending.len(),
        };
        if valid == 0 {
            return None;
        }
        let rest = self.pending.split_off(valid);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        Some(text)
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(text)
    }
}

/// Splits streamed text into complete lines.
#[derive(Debug, Default)]
struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    fn push(&mut self, text: &str) -> Vec<String> {
        self.partial.push_str(text);
        let Some(last_newline) = self.partial.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);
        complete
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.partial);
        let line = line.trim_end();
        (!line.is_empty()).then(|| line.to_owned())
    }
}
