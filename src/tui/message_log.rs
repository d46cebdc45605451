//! Message log — bounded buffer of recent status messages shown to the user.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

/// How serious a message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// A timestamped message.
#[derive(Debug, Clone)]
pub struct Message {
    pub timestamp: SystemTime,
    pub severity: Severity,
    pub text: String,
}

impl Message {
    /// Whether the message is older than `ttl`.
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.timestamp.elapsed().map_or(false, |age| age > ttl)
    }
}

/// Circular buffer of recent messages.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<Message>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push a message, evicting the oldest if at capacity.
    pub fn push(&mut self, severity: Severity, text: impl Into<String>) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Message {
            timestamp: SystemTime::now(),
            severity,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Severity::Info, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Severity::Error, text);
    }

    /// The newest message.
    pub fn latest(&self) -> Option<&Message> {
        self.entries.back()
    }

    /// The N most recent messages (newest last).
    pub fn recent(&self, n: usize) -> Vec<&Message> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(50)
    }
}
