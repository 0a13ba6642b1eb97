//! GitHub reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  GITHUB PROXY                    │
//!                      │                                                  │
//!   Client Request     │  ┌─────────┐   ┌───────────┐   ┌─────────────┐   │
//!   ───────────────────┼─▶│  http   │──▶│  routing  │──▶│  security   │   │
//!                      │  │ server  │   │ extractor │   │  whitelist  │   │
//!                      │  └─────────┘   │ + hosts   │   └──────┬──────┘   │
//!                      │                └───────────┘          │          │
//!                      │                                       ▼          │
//!   Client Response    │  ┌──────────┐                  ┌─────────────┐   │
//!   ◀──────────────────┼──│ response │◀─────────────────│ http client │◀──┼── github.com
//!                      │  │ rewrite  │                  │  (reqwest)  │   │   & friends
//!                      │  └──────────┘                  └─────────────┘   │
//!                      │                                                  │
//!                      │   config (+reload) · observability · lifecycle   │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use github_proxy::config::env::all_env_vars;
use github_proxy::config::loader::load_effective;
use github_proxy::config::watcher::ConfigWatcher;
use github_proxy::lifecycle::signals::spawn_signal_handler;
use github_proxy::observability::{logging, metrics};
use github_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "github-proxy", version, about = "Reverse proxy for GitHub hosts")]
struct Args {
    /// TOML configuration file; watched for changes when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_effective(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "github-proxy starting");
    tracing::debug!(variables = ?all_env_vars(), "Environment overrides consulted");

    let whitelist = match config.access.whitelist.trim() {
        "" => "not set",
        raw => raw,
    };
    tracing::info!(
        bind_address = %config.listener.bind_address,
        whitelist = %whitelist,
        redirect = ?config.upstream.redirect,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must stay alive for reloads to keep flowing.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
