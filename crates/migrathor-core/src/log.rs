//! Operator-facing log sink.
//!
//! Diagnostics go through `tracing` directly. The sink receives the handful
//! of messages an operator should see even without a subscriber installed:
//! history table creation and failures while committing, rolling back or
//! closing handles.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Receives operator-facing messages.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &dyn fmt::Display);
}

/// Forwards every message to `tracing` at info level. This is the default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &dyn fmt::Display) {
        tracing::info!(target: "migrathor", "{}", message);
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _message: &dyn fmt::Display) {}
}

/// Keeps every message in memory. Useful for tests and for callers that
/// render the messages themselves.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &dyn fmt::Display) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

impl<F> LogSink for F
where
    F: Fn(&dyn fmt::Display) + Send + Sync,
{
    fn log(&self, message: &dyn fmt::Display) {
        self(message)
    }
}
