use std::ffi::OsString;
use std::path::PathBuf;

use crate::codec::StringDecoding;

/// Module loaded when no path is given on the command line.
pub const DEFAULT_MODULE_PATH: &str = "build/release.wasm";

/// Host configuration. Logging is configured separately through `RUST_LOG`.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub module_path: PathBuf,
    /// Argument for the `greet` round trip.
    pub greet_name: String,
    /// Operands for `add`.
    pub addends: (i32, i32),
    pub decoding: StringDecoding,
    /// Allocate two extra bytes and write a zero code unit after strings
    /// passed to the guest.
    pub terminate_strings: bool,
    pub max_wasm_stack: Option<usize>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from(DEFAULT_MODULE_PATH),
            greet_name: "Jamal".to_string(),
            addends: (3, 4),
            decoding: StringDecoding::default(),
            terminate_strings: false,
            max_wasm_stack: None,
        }
    }
}

impl HostConfig {
    /// Build from process arguments (program name first). The only
    /// recognized argument is an optional module path.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut config = Self::default();
        if let Some(path) = args.into_iter().nth(1) {
            config.module_path = PathBuf::from(path);
        }
        config
    }

    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_path = path.into();
        self
    }
}
