//! Bounded, timestamped run log.
//!
//! Entries are stamped with the time since the run started and mirrored to
//! `tracing`, so the narrative callers read from the status snapshot is the
//! same one operators see on stderr.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One run log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Time since run start
    pub elapsed: Duration,
    pub level: LogLevel,
    pub message: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.elapsed.as_secs();
        write!(
            f,
            "[{:02}:{:02}:{:02}] {}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            self.message
        )
    }
}

/// Ring buffer of the most recent `capacity` entries.
#[derive(Debug, Clone)]
pub struct RunLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl RunLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest when full.
    pub fn push(&mut self, elapsed: Duration, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            elapsed,
            level,
            message,
        });
    }

    /// Last `n` entries formatted, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).map(|e| e.to_string()).collect()
    }

    /// All retained entries formatted, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_entry_format() {
        let entry = LogEntry {
            elapsed: Duration::from_secs(3_725),
            level: LogLevel::Info,
            message: "Step 1 completed".to_string(),
        };
        assert_eq!(entry.to_string(), "[01:02:05] Step 1 completed");
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut log = RunLog::new(3);
        for i in 0..5 {
            log.push(Duration::ZERO, LogLevel::Info, format!("m{}", i));
        }
        assert_eq!(log.len(), 3);
        let lines = log.lines();
        assert!(lines[0].ends_with("m2"));
        assert!(lines[2].ends_with("m4"));
    }

    #[test]
    fn test_tail() {
        let mut log = RunLog::new(100);
        for i in 0..30 {
            log.push(Duration::ZERO, LogLevel::Warn, format!("m{}", i));
        }
        let tail = log.tail(20);
        assert_eq!(tail.len(), 20);
        assert!(tail[0].ends_with("m10"));
        assert_eq!(log.tail(50).len(), 30);
    }

    proptest! {
        #[test]
        fn prop_retains_newest_entries(capacity in 1usize..50, pushes in 0usize..200, n in 0usize..60) {
            let mut log = RunLog::new(capacity);
            for i in 0..pushes {
                log.push(Duration::from_secs(i as u64), LogLevel::Info, format!("m{}", i));
            }

            prop_assert_eq!(log.len(), pushes.min(capacity));
            let lines = log.lines();
            if let Some(last) = lines.last() {
                let expected = format!("m{}", pushes - 1);
                prop_assert!(last.ends_with(&expected));
            }

            let tail = log.tail(n);
            prop_assert_eq!(tail.len(), n.min(lines.len()));
            prop_assert_eq!(&tail[..], &lines[lines.len() - tail.len()..]);
        }
    }
}
