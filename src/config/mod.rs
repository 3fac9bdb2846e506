// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, CoderConfig, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Default configuration file name (extension is inferred)
pub const DEFAULT_CONFIG_FILE: &str = "coder-server";

/// Values supplied on the command line; they win over file and environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub repo: Option<String>,
}

impl Config {
    /// Load configuration: defaults, then the config file, then `CODER_SERVER__*`
    /// environment variables, then command-line overrides.
    ///
    /// The default file is optional; an explicitly named one must exist.
    pub fn load(overrides: &Overrides) -> Result<Self, config::ConfigError> {
        let file = match overrides.config_file.as_deref() {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("performance.shutdown_timeout", 10)?
            .set_default("http.server_name", "coder-server")?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("coder.command", "aider")?
            .set_default("coder.serialize_requests", false)?
            .set_default("coder.stream_buffer", 16)?
            .add_source(file)
            .add_source(config::Environment::with_prefix("CODER_SERVER").separator("__"))
            .set_override_option("server.host", overrides.host.clone())?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .set_override_option("coder.repo", overrides.repo.clone())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
