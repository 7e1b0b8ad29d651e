//! Caller-facing run narration.
//!
//! The engine reports progress through an injected [`LogSink`] so the
//! concrete destination (console, GUI panel, file) stays outside the core.
//! Internal diagnostics go through `tracing` as usual.

use std::sync::Mutex;

/// Severity of a narration message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Short label used by text-based sinks.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "OK",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Destination for run narration messages.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Sink that forwards narration to the `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!("{message}"),
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// Sink that buffers messages in memory, for tests and probes.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all captured messages.
    pub fn take(&self) -> Vec<(LogLevel, String)> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str) {
        self.messages.lock().unwrap().push((level, message.to_string()));
    }
}
