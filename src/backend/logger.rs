//! Diagnostic channel for the backend
//!
//! Generated code never reports problems itself; recoverable fallbacks are logged as warnings and
//! invariant violations as errors.

use std::fmt;
use std::sync::Mutex;

/// Logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

pub trait Logger {
    /// Log a message at the specified level
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Logger that writes `[level] message` lines to stderr
pub struct StderrLogger {
    min_level: LogLevel,
}

impl StderrLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    pub fn warn_and_above() -> Self {
        Self::new(LogLevel::Warn)
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level >= self.min_level {
            eprintln!("[{level}] {message}");
        }
    }
}

/// Logger that discards all messages
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Logger that collects messages in memory
pub struct BufferedLogger {
    messages: Mutex<Vec<(LogLevel, String)>>,
    min_level: LogLevel,
}

impl BufferedLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            min_level,
        }
    }

    pub fn all() -> Self {
        Self::new(LogLevel::Debug)
    }

    /// Get all logged messages
    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// Number of messages logged at exactly `level`
    pub fn count(&self, level: LogLevel) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    /// Whether a message at `level` contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

impl Logger for BufferedLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level >= self.min_level {
            self.messages
                .lock()
                .unwrap()
                .push((level, message.to_string()));
        }
    }
}

/// Helper to create a reference to a logger that can be passed around
pub type LoggerRef<'a> = &'a dyn Logger;
