//! Trace of intermediate pipeline artifacts (relevant-file lists, per-file
//! analyses, undecodable responses). Writing the trace never fails the caller.

use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Sink for diagnostic text lines
pub trait TraceLogger: Send + Sync {
    fn log_detail(&self, text: &str);
}

/// Discards everything; the default when no trace is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceLogger;

impl TraceLogger for NoopTraceLogger {
    fn log_detail(&self, _text: &str) {}
}

/// Shared no-op logger
pub fn noop() -> Arc<dyn TraceLogger> {
    Arc::new(NoopTraceLogger)
}

/// Appends one JSON object per line: `{"timestamp": ..., "detail": ...}`
pub struct FileTraceLogger {
    file: Mutex<File>,
    log_path: PathBuf,
}

impl FileTraceLogger {
    /// Open (or create) the trace file in append mode
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            log_path: path.to_path_buf(),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

impl TraceLogger for FileTraceLogger {
    fn log_detail(&self, text: &str) {
        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "detail": text,
        });

        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(guard, "{}", entry).and_then(|_| guard.flush()) {
            warn!(
                "Failed to write trace entry to {}: {}",
                self.log_path.display(),
                e
            );
        }
    }
}

/// Keeps lines in memory, for tests and in-process inspection
#[derive(Debug, Default)]
pub struct MemoryTraceLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryTraceLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl TraceLogger for MemoryTraceLogger {
    fn log_detail(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}
