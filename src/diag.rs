//! Diagnostic sink shared by every pipeline stage.
//!
//! Lexing, parsing, and evaluation all report non-fatal problems here and
//! then keep going; only the parser has a separate fatal path. Each
//! diagnostic renders as a single line.

use std::fmt::Display;

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &dyn Display);
}

/// Production sink: one line per diagnostic on stderr.
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: &dyn Display) {
        eprintln!("{diagnostic}");
    }
}

/// Sink that keeps rendered diagnostics in memory so tests can assert on
/// them.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub messages: Vec<String>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: &dyn Display) {
        self.messages.push(diagnostic.to_string());
    }
}
