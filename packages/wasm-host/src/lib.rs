//! Host side of a WebAssembly guest that exchanges UTF-16 strings.
//!
//! # Architecture
//! - `codec`: guest string layout (UTF-16LE, zero-unit terminated)
//! - `allocator`: strings in and out of guest memory via `allocate`/`deallocate`
//! - `imports`: host functions the guest calls (`env.abort`)
//! - `guest`: export resolution and calls, owns the store
//! - `runtime`: load → compile → instantiate → round trips

pub mod allocator;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod guest;
pub mod imports;
pub mod offset;
pub mod runtime;

pub use allocator::{free_guest, write_string_to_guest};
pub use codec::{decode_string, decode_string_utf16, encode_string, StringDecoding};
pub use config::HostConfig;
pub use diagnostics::{AbortDiagnostic, DiagnosticSink, MemorySink, StdoutSink};
pub use error::{HostError, Result};
pub use guest::GuestInstance;
pub use offset::GuestOffset;
pub use runtime::{HostRuntime, RunReport};
