use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use coder_server::coder::{self, Coder};
use coder_server::config::{self, AppState};
use coder_server::{logger, server};

#[derive(Parser)]
#[command(name = "coder-server", version)]
#[command(about = "Serve a coding assistant over HTTP: streamed chat and repository files")]
struct Cli {
    /// Configuration file (default: ./coder-server.toml if present)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Repository root (default: the Git top-level of the current directory)
    #[arg(long)]
    repo: Option<String>,

    /// Arguments passed through to the coder command
    #[arg(last = true)]
    coder_args: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            config_file: self.config.clone(),
            host: self.host.clone(),
            port: self.port,
            repo: self.repo.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::Config::load(&cli.overrides()).context("failed to load configuration")?;
    logger::init(&cfg.logging)?;

    let runtime = server::build_runtime(cfg.server.workers)?;
    let grace = Duration::from_secs(cfg.performance.shutdown_timeout);
    server::run_with_grace(runtime, async_main(cfg, cli.coder_args), grace)
}

async fn async_main(cfg: config::Config, coder_args: Vec<String>) -> anyhow::Result<()> {
    let coder = coder::build_coder(&cfg.coder, &coder_args).context("failed to set up the coder")?;
    let addr = cfg.get_socket_addr().map_err(anyhow::Error::msg)?;
    let listener = server::create_reusable_listener(addr)
        .with_context(|| format!("failed to bind {addr}"))?;

    logger::log_server_start(&addr, &cfg, coder.repo_root());
    let state = Arc::new(AppState::new(cfg, Arc::new(coder)));

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));
    server::start_server_loop(listener, state, shutdown).await
}
