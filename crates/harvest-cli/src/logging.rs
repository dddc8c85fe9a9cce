//! Process-wide logging: a compact terminal layer on stderr and a JSON-lines
//! file layer, one file per day under the configured log directory.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter override, in `EnvFilter` syntax.
const LOG_ENV: &str = "HARVEST_LOG";

/// Keeps the log file open for the life of `main`. Dropping it flushes.
pub struct LogGuard {
    pub log_path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = file.flush();
    }
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            guard: self.file.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Holds the file lock for one event.
struct SharedFileGuard<'a> {
    guard: MutexGuard<'a, File>,
}

impl Write for SharedFileGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.guard.flush()
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log directory or file cannot be opened, or if a subscriber
/// is already installed.
pub fn init(log_dir: &Path, quiet: bool, verbose: bool) -> anyhow::Result<LogGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join(log_file_name(Utc::now().date_naive()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;
    let file = Arc::new(Mutex::new(file));

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level(quiet, verbose)));

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(SharedFileWriter {
            file: Arc::clone(&file),
        })
        .with_target(true);

    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(terminal_layer)
        .with(json_layer)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(LogGuard { log_path, file })
}

fn default_level(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

fn log_file_name(day: NaiveDate) -> String {
    format!("harvest-{}.jsonl", day.format("%Y%m%d"))
}
