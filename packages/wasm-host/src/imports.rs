//! Host functions the guest imports.
//!
//! The import table is a [`Linker`] built before instantiation. Imports that
//! need the guest's memory reach the instance through a slot in the store
//! data that is filled exactly once, right after instantiation succeeds.

use std::cell::OnceCell;
use std::sync::Arc;

use tracing::warn;
use wasmtime::{Caller, Instance, Linker};

use crate::codec::{self, StringDecoding};
use crate::diagnostics::{AbortDiagnostic, DiagnosticSink};
use crate::error::ImportError;

/// Namespace of every host import.
pub const ENV_MODULE: &str = "env";

/// Store data shared with host imports.
pub struct HostState {
    instance: OnceCell<Instance>,
    sink: Arc<dyn DiagnosticSink>,
    decoding: StringDecoding,
}

impl HostState {
    pub fn new(sink: Arc<dyn DiagnosticSink>, decoding: StringDecoding) -> Self {
        Self {
            instance: OnceCell::new(),
            sink,
            decoding,
        }
    }

    /// Fill the instance slot. Fails if it was already filled.
    pub fn bind(&self, instance: Instance) -> Result<(), ImportError> {
        self.instance
            .set(instance)
            .map_err(|_| ImportError::AlreadyBound)
    }

    /// The bound instance, or `None` while instantiation is still running.
    pub fn instance(&self) -> Option<Instance> {
        self.instance.get().copied()
    }

    pub fn decoding(&self) -> StringDecoding {
        self.decoding
    }
}

/// Register all host imports.
pub fn register_imports(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(ENV_MODULE, "abort", host_abort)?;
    Ok(())
}

/// `env.abort(message, filename, line, column)`.
///
/// Decodes both strings from the live memory view and hands the record to
/// the sink. Returns normally; whatever the guest does afterwards is up to
/// the guest.
fn host_abort(
    mut caller: Caller<'_, HostState>,
    message_ptr: i32,
    filename_ptr: i32,
    line: i32,
    column: i32,
) -> anyhow::Result<()> {
    let instance = caller
        .data()
        .instance()
        .ok_or(ImportError::InstanceNotBound { import: "abort" })?;
    let memory = instance
        .get_memory(&mut caller, "memory")
        .ok_or(ImportError::MemoryNotExported { import: "abort" })?;

    let decoding = caller.data().decoding();
    let view = memory.data(&caller);
    let diagnostic = AbortDiagnostic {
        message: codec::decode_with(decoding, view, guest_address(message_ptr)),
        filename: codec::decode_with(decoding, view, guest_address(filename_ptr)),
        line,
        column,
    };

    warn!(
        abort_message = %diagnostic.message,
        file = %diagnostic.filename,
        line,
        column,
        "guest called abort"
    );
    caller.data().sink.report(diagnostic);
    Ok(())
}

/// Guest pointers are unsigned; reinterpret the raw i32 bits.
fn guest_address(ptr: i32) -> usize {
    ptr as u32 as usize
}
