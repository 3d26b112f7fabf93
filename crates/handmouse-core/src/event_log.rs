//! Bounded, newest-first event log.
//!
//! Entries are kept in a [`VecDeque`] with the newest entry at the front.
//! Pushing past capacity pops the oldest entry off the back, so both
//! insertion and eviction are O(1).

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Default number of entries retained by an [`EventLog`].
pub const MAX_LOG_ENTRIES: usize = 50;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One notable event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self::at(Local::now(), message, severity)
    }

    pub fn at(timestamp: DateTime<Local>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp,
            message: message.into(),
            severity,
        }
    }

    /// `HH:MM:SS` wall-clock time of the entry.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.time_label(), self.message)
    }
}

/// Chronological record capped at a fixed entry count.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }
}

impl EventLog {
    /// Log holding at most `capacity` entries. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_LOG_ENTRIES) + 1),
            capacity,
        }
    }

    /// Insert `entry` as the newest and return the evicted oldest entry, if any.
    pub fn push(&mut self, entry: LogEntry) -> Option<LogEntry> {
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Entries newest-first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn oldest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
