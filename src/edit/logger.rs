//! Edit event logger
//!
//! Every engine step and integrity side effect is reported here. Output can
//! go to stdout, to an in-memory buffer, or both; documents default to the
//! buffer so library use stays quiet. Only lines the verbosity allows are
//! captured, and the buffer keeps at most `capacity` of the newest ones.

use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::ops::Deref;

/// Captured lines kept before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// Verbosity level for edit output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Nothing
    Silent = 0,
    /// Only outcomes of compound operations
    Minimal = 1,
    /// Perform / undo / redo steps (default)
    #[default]
    Normal = 2,
    /// Every resolver side effect
    Verbose = 3,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Output only to stdout
    Stdout,
    /// Capture only to in-memory buffer (default)
    #[default]
    Memory,
    /// Both stdout and in-memory buffer
    Both,
}

/// A captured log line
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    /// Optional category (e.g. "history", "integrity", "clone")
    pub category: Option<String>,
}

/// Read-only view of captured entries
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LogEntry>>,
}

impl<'a> LogGuard<'a> {
    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.guard.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl<'a> Deref for LogGuard<'a> {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Logger owned by a document
///
/// Logging takes `&self` so mutations can report while the document is only
/// borrowed immutably (usage scans, clone planning).
pub struct EditLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    capacity: usize,
    log_buffer: RefCell<Vec<LogEntry>>,
}

impl EditLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        EditLogger {
            verbosity,
            output_mode: OutputMode::default(),
            capacity: DEFAULT_LOG_CAPACITY,
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the buffer bound; excess old entries are dropped right away
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        Self::trim(self.log_buffer.get_mut(), capacity);
    }

    fn trim(buffer: &mut Vec<LogEntry>, capacity: usize) {
        let excess = buffer.len().saturating_sub(capacity);
        if excess > 0 {
            buffer.drain(..excess);
        }
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    /// Captured entries
    ///
    /// ```ignore
    /// let undo_lines = doc.logger.logs().iter()
    ///     .filter(|e| e.category.as_deref() == Some("history"))
    ///     .count();
    /// ```
    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }

    pub fn clear_logs(&self) {
        self.log_buffer.borrow_mut().clear();
    }

    /// Print buffered entries the verbosity allows, then clear the buffer
    pub fn flush_buffer(&self) {
        let buffer = self.log_buffer.borrow();
        for entry in buffer.iter() {
            if entry.level <= self.verbosity {
                Self::log_to_stdout(entry.level, &entry.message);
            }
        }
        drop(buffer);
        self.clear_logs();
    }

    #[inline]
    fn log_to_stdout(level: VerbosityLevel, message: &str) {
        if level == VerbosityLevel::Minimal {
            println!("{}", message);
        } else {
            println!("  {}", message);
        }
    }

    fn emit(&self, level: VerbosityLevel, category: Option<&str>, message: &str) {
        if level > self.verbosity || level == VerbosityLevel::Silent {
            return;
        }

        if self.is_capturing() && self.capacity > 0 {
            let mut buffer = self.log_buffer.borrow_mut();
            Self::trim(&mut buffer, self.capacity - 1);
            buffer.push(LogEntry {
                level,
                message: message.to_string(),
                category: category.map(str::to_string),
            });
        }

        if matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both) {
            Self::log_to_stdout(level, message);
        }
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        self.emit(VerbosityLevel::Minimal, None, message);
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        self.emit(VerbosityLevel::Normal, None, message);
    }

    #[inline]
    pub fn verbose(&self, message: &str) {
        self.emit(VerbosityLevel::Verbose, None, message);
    }

    /// Log with a category tag
    #[inline]
    pub fn categorized(&self, level: VerbosityLevel, category: &str, message: &str) {
        self.emit(level, Some(category), message);
    }
}

impl Default for EditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("capacity", &self.capacity)
            .field("log_count", &self.log_buffer.borrow().len())
            .finish()
    }
}

// Settings carry over, captured lines do not.
impl Clone for EditLogger {
    fn clone(&self) -> Self {
        EditLogger {
            verbosity: self.verbosity,
            output_mode: self.output_mode,
            capacity: self.capacity,
            log_buffer: RefCell::new(Vec::new()),
        }
    }
}
