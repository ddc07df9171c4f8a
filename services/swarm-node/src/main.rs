use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use swarmlink_core::logging;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod cli;
mod error;
mod node;

use cli::Cli;
use error::NodeError;
use node::Node;

const NODE_PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct NodeVersionHandshake {
    version: &'static str,
    protocol_version: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version_json {
        return match print_handshake() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e:#}");
                ExitCode::FAILURE
            }
        };
    }

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn print_handshake() -> anyhow::Result<()> {
    let handshake = NodeVersionHandshake {
        version: env!("CARGO_PKG_VERSION"),
        protocol_version: NODE_PROTOCOL_VERSION,
    };
    let json = serde_json::to_string(&handshake).context("serializing version handshake")?;
    println!("{json}");
    Ok(())
}

async fn run(cli: Cli) -> Result<(), NodeError> {
    let config = node::load_config(&cli)?;
    let fleet = node::assemble_fleet(&cli, &config)?;

    let cancel = CancellationToken::new();
    let node = Node::start(&config, fleet, cancel.clone()).await?;
    info!(addr = %node.local_addr, "Swarm node running; press Ctrl-C to stop");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    node.shutdown().await
}
