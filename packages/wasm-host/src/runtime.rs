//! Orchestration: load → compile → instantiate → round trips.
//!
//! Every step depends on the previous one succeeding and any failure ends
//! the run. There are no retries.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use wasmtime::{Config, Engine, Linker, Module, Store};

use crate::allocator::{free_guest, write_string_to_guest};
use crate::config::HostConfig;
use crate::diagnostics::DiagnosticSink;
use crate::error::{HostError, Result};
use crate::guest::GuestInstance;
use crate::imports::{register_imports, HostState};
use crate::offset::GuestOffset;

pub const GREET_EXPORT: &str = "greet";
pub const ADD_EXPORT: &str = "add";

/// Outputs of one full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub greeting: String,
    pub sum: i32,
}

/// Engine plus the import table, shared by every instance it creates.
pub struct HostRuntime {
    engine: Engine,
    linker: Linker<HostState>,
    config: HostConfig,
}

impl HostRuntime {
    pub fn new(config: HostConfig) -> Result<Self> {
        let mut wasm_config = Config::new();
        if let Some(max) = config.max_wasm_stack {
            wasm_config.max_wasm_stack(max);
        }
        let engine = Engine::new(&wasm_config)
            .map_err(|err| HostError::Compile(format!("failed to create engine: {err:#}")))?;

        let mut linker = Linker::new(&engine);
        register_imports(&mut linker).map_err(|err| {
            HostError::Instantiation(format!("failed to register imports: {err:#}"))
        })?;

        Ok(Self {
            engine,
            linker,
            config,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Compile a binary (or WAT text) into a module.
    pub fn compile(&self, bytes: &[u8]) -> Result<Module> {
        let module = Module::new(&self.engine, bytes)
            .map_err(|err| HostError::Compile(format!("{err:#}")))?;
        debug!(phase = "compiled", "module compiled");
        Ok(module)
    }

    /// Instantiate `module`, bind the instance slot the imports read, and
    /// resolve the allocator and memory exports.
    pub fn instantiate(
        &self,
        module: &Module,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<GuestInstance> {
        let mut store = Store::new(&self.engine, HostState::new(sink, self.config.decoding));
        let instance = self
            .linker
            .instantiate(&mut store, module)
            .map_err(|err| HostError::Instantiation(format!("{err:#}")))?;
        debug!(phase = "instantiated", "module instantiated");

        let guest = GuestInstance::bind(store, instance)?
            .with_terminated_strings(self.config.terminate_strings);
        debug!(phase = "memory-bound", "guest exports resolved");
        Ok(guest)
    }

    /// Run the whole sequence against the configured module path.
    pub fn run(&self, sink: Arc<dyn DiagnosticSink>) -> Result<RunReport> {
        let bytes = load_module_bytes(&self.config.module_path)?;
        let module = self.compile(&bytes)?;
        let mut guest = self.instantiate(&module, sink)?;

        let greeting = greet_round_trip(&mut guest, &self.config.greet_name)?;
        let (a, b) = self.config.addends;
        let sum = add(&mut guest, a, b)?;

        info!(%greeting, sum, "run complete");
        Ok(RunReport { greeting, sum })
    }
}

/// Read the module binary. Nothing is compiled if this fails.
pub fn load_module_bytes(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|source| HostError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), len = bytes.len(), "module loaded");
    Ok(bytes)
}

pub fn greet_round_trip(guest: &mut GuestInstance, name: &str) -> Result<String> {
    string_round_trip(guest, GREET_EXPORT, name)
}

/// allocate → write → invoke → decode → free for a guest export of shape
/// `(offset: i32) -> offset: i32`.
///
/// Only the argument is freed. The returned string belongs to the guest.
pub fn string_round_trip(guest: &mut GuestInstance, export: &str, input: &str) -> Result<String> {
    let func = guest.resolve_function::<i32, i32>(export)?;

    let input_offset = write_string_to_guest(guest, input)?;
    debug!(phase = "written", %input_offset, export, "argument in guest memory");

    let raw = guest.call(export, &func, input_offset.to_guest())?;
    let output_offset = GuestOffset::from_guest(raw).ok_or_else(|| HostError::Call {
        export: export.to_string(),
        reason: format!("returned {raw}, which is not a guest offset"),
    })?;
    debug!(phase = "invoked", %output_offset, export, "guest returned");

    let output = guest.read_string(output_offset);
    debug!(phase = "decoded", len = output.len(), export, "result decoded");

    free_guest(guest, input_offset)?;
    debug!(phase = "freed", export, "argument released");
    Ok(output)
}

pub fn add(guest: &mut GuestInstance, a: i32, b: i32) -> Result<i32> {
    let func = guest.resolve_function::<(i32, i32), i32>(ADD_EXPORT)?;
    guest.call(ADD_EXPORT, &func, (a, b))
}
