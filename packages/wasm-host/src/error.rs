//! Error taxonomy for the host.
//!
//! Every variant is fatal to a run. Guest aborts are not errors: they are
//! reported through [`crate::diagnostics::DiagnosticSink`] instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    /// The module binary could not be read.
    #[error("failed to read the WebAssembly module file {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The binary failed validation or compilation.
    #[error("failed to compile module: {0}")]
    Compile(String),

    /// Import/export mismatch, missing import, or a failing start function.
    #[error("failed to instantiate the module: {0}")]
    Instantiation(String),

    /// A required export is absent or has the wrong kind.
    #[error("export `{name}` not found (expected {expected})")]
    ExportNotFound { name: String, expected: &'static str },

    #[error("failed to allocate {size} bytes in guest memory: {reason}")]
    Allocation { size: usize, reason: String },

    #[error("failed to deallocate guest offset {offset}: {reason}")]
    Deallocation { offset: u32, reason: String },

    /// The guest trapped while executing an export.
    #[error("guest trapped in `{export}`: {trap}")]
    GuestTrap { export: String, trap: String },

    /// ABI mismatch or a non-trap failure while calling into the guest.
    #[error("failed to call `{export}`: {reason}")]
    Call { export: String, reason: String },
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Classify a failed guest call: wasm traps become [`HostError::GuestTrap`],
/// everything else (host import errors, ABI problems) [`HostError::Call`].
pub(crate) fn classify_call_error(export: &str, err: anyhow::Error) -> HostError {
    match err.downcast_ref::<wasmtime::Trap>() {
        Some(trap) => HostError::GuestTrap {
            export: export.to_string(),
            trap: trap.to_string(),
        },
        None => HostError::Call {
            export: export.to_string(),
            reason: format!("{err:#}"),
        },
    }
}

/// Failures raised inside host imports. These are returned to wasmtime,
/// which turns them into a guest trap.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("`{import}` called before the instance was bound")]
    InstanceNotBound { import: &'static str },

    #[error("`{import}` requires the guest to export `memory`")]
    MemoryNotExported { import: &'static str },

    #[error("instance slot already bound")]
    AlreadyBound,
}
