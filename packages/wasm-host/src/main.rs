use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wasm_host::{HostConfig, HostRuntime, StdoutSink};

fn main() -> anyhow::Result<()> {
    // stdout is reserved for program output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = HostConfig::from_args(std::env::args_os());
    let module_path = config.module_path.clone();
    let runtime = HostRuntime::new(config).context("failed to set up the WebAssembly engine")?;
    let report = runtime
        .run(Arc::new(StdoutSink))
        .with_context(|| format!("run of {} failed", module_path.display()))?;

    println!("Rust - WebAssembly Example");
    println!("[greet] Output: {}", report.greeting);
    println!("[add] Result: {}", report.sum);
    Ok(())
}
