//! Diagnostic sinks
//!
//! Parse failures never reach the caller of an evaluation. They are formatted
//! into a single line and handed to a [`DiagnosticSink`] instead.

use std::cell::RefCell;

/// Receives one formatted diagnostic per parse failure
pub trait DiagnosticSink {
    fn report(&self, diagnostic: &str);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn report(&self, diagnostic: &str) {
        (**self).report(diagnostic)
    }
}

/// Forwards diagnostics to the `log` facade at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: &str) {
        log::error!("{diagnostic}");
    }
}

/// Keeps diagnostics in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: RefCell<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics reported so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    /// Remove and return every stored diagnostic
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &str) {
        self.messages.borrow_mut().push(diagnostic.to_string());
    }
}
