//! Logger module
//!
//! Thin facade over `tracing` used across the server:
//! - Server lifecycle logging
//! - Access logging with multiple formats (target `access`)
//! - Error and warning logging

mod format;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber
///
/// `RUST_LOG` wins over `logging.level` when set. Should be called once at
/// application startup.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, repo_root: &Path) {
    tracing::info!("Coder server started on http://{addr}");
    tracing::info!("  - POST http://{addr}/chat");
    tracing::info!("  - GET  http://{addr}/file?file_path=<path>");
    tracing::info!("Repository root: {}", repo_root.display());
    tracing::info!(
        "Coder command: {} {}",
        config.coder.command,
        config.coder.args.join(" ")
    );
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if config.coder.serialize_requests {
        tracing::info!("Coder calls are serialized");
    }
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::warn!("Failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}

pub fn log_shutdown_requested(signal: &str) {
    tracing::info!("{signal} received, shutting down");
}

pub fn log_shutdown_complete(remaining: usize) {
    if remaining == 0 {
        tracing::info!("Server stopped");
    } else {
        tracing::warn!("Server stopped with {remaining} connection(s) still open");
    }
}
