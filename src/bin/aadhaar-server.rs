#![forbid(unsafe_code)]
//! HTTP server for AadhaarChain

use aadhaarchain::api::{run_api_server, ApiNode};
use aadhaarchain::config::{load_config, load_config_from, validate};
use aadhaarchain::service::VerificationService;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aadhaar-server", about = "Serve the Aadhaar verification ledger over HTTP")]
struct Args {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding server.host
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding server.port and PORT
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    validate(&config)?;

    info!(
        difficulty = config.ledger.difficulty,
        reveal_otp = config.otp.reveal_in_response,
        "Starting AadhaarChain"
    );
    if config.otp.reveal_in_response {
        warn!("OTP codes are returned in API responses; disable otp.reveal_in_response once delivery is wired up");
    }

    let service = Arc::new(VerificationService::from_config(&config.ledger)?);

    // Sweep expired credentials that nobody came back for.
    let sweeper = service.clone();
    let purge_every = Duration::from_secs(config.otp.purge_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_every);
        loop {
            interval.tick().await;
            let purged = sweeper.otp_store().purge_expired();
            if purged > 0 {
                info!(purged, "otp.purged");
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let node = Arc::new(ApiNode::new(service, config.otp.reveal_in_response));
    run_api_server(node, addr).await?;

    Ok(())
}
