//! Per-run log file handling and failure-chain rendering.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::schema::TracebackFormat;
use crate::error::{PipelineError, RdekitError};

/// Per-run log sink with deferred file creation: the log file (and its
/// directory) materialize on the first write, never earlier. File names are
/// timestamped per run so repeat runs cannot collide.
#[derive(Debug, Clone)]
pub struct RunLogger {
    path: PathBuf,
    inner: Arc<Mutex<Option<File>>>,
}

impl RunLogger {
    /// Plans a `rdesys_YYYYMMDD_HHMMSS.log` file under `logs_dir`.
    pub fn new(logs_dir: &Path) -> Self {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        Self {
            path: logs_dir.join(format!("rdesys_{stamp}.log")),
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Installs a `tracing` subscriber writing to this log. Returns false
    /// when another subscriber is already installed (embedding hosts and
    /// test harnesses set their own).
    pub fn install(&self) -> bool {
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_target(false)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    }

    /// Appends one line, creating the file on first use.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut handle = LogHandle {
            inner: Arc::clone(&self.inner),
            path: self.path.clone(),
        };
        handle.write_all(line.as_bytes())?;
        handle.write_all(b"\n")
    }
}

pub struct LogHandle {
    inner: Arc<Mutex<Option<File>>>,
    path: PathBuf,
}

impl Write for LogHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log lock poisoned"))?;

        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            *guard = Some(file);
        }

        guard.as_mut().expect("opened above").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(file) = guard.as_mut() {
                return file.flush();
            }
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RunLogger {
    type Writer = LogHandle;

    fn make_writer(&'a self) -> Self::Writer {
        LogHandle {
            inner: Arc::clone(&self.inner),
            path: self.path.clone(),
        }
    }
}

/// Renders a tile failure chain according to `traceback.format`.
pub fn render_traceback(error: &PipelineError, format: TracebackFormat) -> String {
    match format {
        TracebackFormat::Compact => compact_chain(error),
        TracebackFormat::Full => full_chain(error),
        TracebackFormat::Duplex => format!("{}\n{}", compact_chain(error), full_chain(error)),
    }
}

fn compact_chain(error: &PipelineError) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(" | ")
}

fn full_chain(error: &PipelineError) -> String {
    let mut text = format!(
        "Tile {} failed in processor '{}'\n",
        error.tile_index, error.processor
    );
    let mut depth = 0;
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(cause) = current {
        text.push_str(&format!("  {depth}: {cause}\n"));
        current = cause.source();
        depth += 1;
    }
    text
}

/// One-line human summary for stderr, with the documentation link when the
/// error carries one.
pub fn failure_summary(error: &RdekitError) -> String {
    match error {
        RdekitError::Config(config) => format!("{config}\nSee: {}", config.doc_url()),
        other => other.to_string(),
    }
}
