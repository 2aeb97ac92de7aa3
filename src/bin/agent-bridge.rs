// ABOUTME: Agent bridge binary entry point
// ABOUTME: Parses CLI overrides, loads environment configuration, initializes logging, runs the server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Agent Bridge Server Binary
//!
//! Serves the browser client and relays its prompts to the external agent API.

use std::path::PathBuf;

use agent_bridge::{config::ServerConfig, logging, server::BridgeServer};
use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "agent-bridge")]
#[command(about = "WebSocket bridge between browser clients and a conversational agent API")]
pub struct Args {
    /// Override listen port
    #[arg(long)]
    port: Option<u16>,

    /// Override static asset directory
    #[arg(long)]
    public_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(public_dir) = args.public_dir {
        config.public_dir = public_dir;
    }

    info!("{}", config.summary());

    if let Err(e) = BridgeServer::new(config).run().await {
        error!("Server error: {e:#}");
        return Err(e);
    }
    Ok(())
}
