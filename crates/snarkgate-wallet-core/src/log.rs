use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;

use crate::domain::TimestampMs;

pub const LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: TimestampMs,
    pub event: String,
    pub payload: Option<Value>,
}

/// Rolling diagnostic log: newest entry first, capacity bounded.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, event: impl Into<String>) {
        self.push_with_payload(event, None);
    }

    pub fn push_with_payload(&mut self, event: impl Into<String>, payload: Option<Value>) {
        self.entries.push_front(LogEntry {
            at: TimestampMs::now(),
            event: event.into(),
            payload,
        });
        self.entries.truncate(LOG_CAPACITY);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
