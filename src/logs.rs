//! Leveled progress log for pipeline runs.
//!
//! Entries are mirrored to stderr and retained in a global sink so a
//! caller (or a test) can inspect what a run reported.

use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Log level for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Global log sink.
pub static PROGRESS: Lazy<ProgressLog> = Lazy::new(ProgressLog::new);

/// Collects entries and mirrors them to stderr.
pub struct ProgressLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => " ✓ ",
            LogLevel::Warning => " ! ",
            LogLevel::Error => " ✗ ",
        };
        eprintln!("{}{}", prefix, entry.message);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    /// Drain everything logged so far.
    pub fn take(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    PROGRESS.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    PROGRESS.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    PROGRESS.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    PROGRESS.log(LogEntry::new(LogLevel::Error, msg));
}
