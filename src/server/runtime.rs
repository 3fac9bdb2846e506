// Runtime module
// Builds the tokio runtime and bounds how long it may linger on exit

use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Multi-thread runtime with `workers` threads (tokio's default when unset)
pub fn build_runtime(workers: Option<usize>) -> std::io::Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = workers {
        builder.worker_threads(workers);
    }
    builder.build()
}

/// Drive `future` to completion, then shut the runtime down.
///
/// Blocking tasks still running after `grace` (a coder stuck inside a chunk)
/// are left behind instead of holding the process open.
pub fn run_with_grace<F: Future>(runtime: Runtime, future: F, grace: Duration) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    output
}
