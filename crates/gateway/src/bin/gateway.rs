//! Gateway process.
//!
//! Usage:
//!   crosschain-gateway [--config <FILE>]
//!
//! The config path falls back to `CROSSCHAIN_GATEWAY_CONFIG`, then to
//! `gateway.json`. Log verbosity follows `RUST_LOG` (default `info`).

use crosschain_gateway::{Gateway, GatewayConfig};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "gateway.json";

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}

fn print_help() {
    eprintln!(
        r#"crosschain-gateway - routing front door

USAGE:
    crosschain-gateway [OPTIONS]

OPTIONS:
    -c, --config <FILE>     Path to config file (JSON) [default: gateway.json]
    -h, --help              Print help

ENVIRONMENT:
    CROSSCHAIN_GATEWAY_CONFIG   Path to config file
    RUST_LOG                    Log filter [default: info]
"#
    );
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if has_flag("-h") || has_flag("--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = parse_arg("--config")
        .or_else(|| parse_arg("-c"))
        .or_else(|| std::env::var("CROSSCHAIN_GATEWAY_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = GatewayConfig::from_file(&config_path)?;
    let listen_addr = config.listen_addr();

    let gateway = Gateway::build(config).await?;
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, config = %config_path, "Listening");

    gateway.serve(listener, shutdown_signal()).await?;
    Ok(())
}
