use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use github_proxy::config::loader::load_effective;
use github_proxy::routing::extractor::InboundTarget;
use github_proxy::Gate;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the GitHub proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the proxy answers
    Ping,
    /// Show the running whitelist and host set
    Debug,
    /// Evaluate a destination against a local configuration without contacting upstream
    Check {
        /// Request target as a client would send it, e.g. `/https://github.com/o/r`
        destination: String,

        /// TOML configuration file (defaults plus environment when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Ping => {
            let res = reqwest::get(format!("{}/ping", base)).await?;
            let status = res.status();
            let text = res.text().await?;
            if status.is_success() {
                println!("{}", text.trim());
            } else {
                eprintln!("Error: proxy returned status {}", status);
                std::process::exit(1);
            }
        }
        Commands::Debug => {
            let res = reqwest::get(format!("{}/debug", base)).await?;
            print_response(res).await?;
        }
        Commands::Check { destination, config } => {
            let config = load_effective(config.as_deref())?;
            let gate = Gate::from_config(&config);
            let report = check(&gate, &destination);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report["admitted"] != true {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

/// Run the admission pipeline for a client-style request target.
fn check(gate: &Gate, destination: &str) -> Value {
    let target = if destination.starts_with('/') {
        destination.to_string()
    } else {
        format!("/{}", destination)
    };
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target.as_str(), None),
    };

    match gate.admit(&InboundTarget::new(path, query)) {
        Ok(admitted) => json!({
            "admitted": true,
            "url": admitted.url.as_str(),
            "host_class": admitted.class.as_str(),
            "key": admitted.key.map(|k| k.to_string()),
        }),
        Err(e) => json!({
            "admitted": false,
            "status": e.status().as_u16(),
            "reason": e.reason(),
            "error": e.to_string(),
        }),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
