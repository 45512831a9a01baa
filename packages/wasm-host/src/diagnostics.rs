//! Abort diagnostics reported by the guest through `env.abort`.

use std::fmt;
use std::sync::{Arc, Mutex};

/// What the guest passed to `abort`, with both strings already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortDiagnostic {
    pub message: String,
    pub filename: String,
    pub line: i32,
    pub column: i32,
}

impl fmt::Display for AbortDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wasm called abort! Message: {}, File: {}, Line: {}, Column: {}",
            self.message, self.filename, self.line, self.column
        )
    }
}

/// Where abort diagnostics go. Implementations must not panic; the guest
/// call that triggered the abort is still in progress.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: AbortDiagnostic);
}

/// Prints each diagnostic on its own line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl DiagnosticSink for StdoutSink {
    fn report(&self, diagnostic: AbortDiagnostic) {
        println!("{diagnostic}");
    }
}

/// Keeps diagnostics in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<AbortDiagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AbortDiagnostic> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: AbortDiagnostic) {
        if let Ok(mut records) = self.records.lock() {
            records.push(diagnostic);
        }
    }
}
