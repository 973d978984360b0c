//! An in-memory ring buffer fed by a `tracing` layer, backing `GET /api/logs` (§4.11). The
//! log-tail boundary described in the overview gets one concrete, always-available
//! implementation here rather than shelling out to grep a log file.

use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const DEFAULT_CAPACITY: usize = 1000;

/// Thread-safe bounded buffer of formatted log lines, newest last.
pub struct LogRingBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogRingBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { lines: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock().expect("lock poisoned");
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// The most recent `limit` lines, oldest first.
    #[must_use]
    pub fn tail(&self, limit: usize) -> Vec<String> {
        let lines = self.lines.lock().expect("lock poisoned");
        let skip = lines.len().saturating_sub(limit);
        lines.iter().skip(skip).cloned().collect()
    }
}

impl Default for LogRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// A `tracing_subscriber` layer that appends every event to a shared [`LogRingBuffer`] instead
/// of (or alongside) writing to a terminal.
pub struct RingBufferLayer {
    buffer: std::sync::Arc<LogRingBuffer>,
}

impl RingBufferLayer {
    #[must_use]
    pub fn new(buffer: std::sync::Arc<LogRingBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for RingBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        let line = format!(
            "{} {} {}: {}",
            chrono::Utc::now().to_rfc3339(),
            metadata.level(),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        self.buffer.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_returns_most_recent_lines_in_order() {
        let buffer = LogRingBuffer::new(3);
        buffer.push("a".to_string());
        buffer.push("b".to_string());
        buffer.push("c".to_string());
        buffer.push("d".to_string());
        assert_eq!(buffer.tail(2), vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn tail_caps_at_configured_capacity() {
        let buffer = LogRingBuffer::new(2);
        for i in 0..5 {
            buffer.push(i.to_string());
        }
        assert_eq!(buffer.tail(10), vec!["3".to_string(), "4".to_string()]);
    }
}
