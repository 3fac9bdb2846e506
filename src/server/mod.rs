// Server module entry
// Listener creation, connection serving, accept loop and shutdown signals

pub mod connection;
pub mod listener;
pub mod runtime;
pub mod signal;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used items
pub use listener::create_reusable_listener;
pub use runtime::{build_runtime, run_with_grace};
pub use server_loop::start_server_loop;
pub use signal::start_signal_handler;
