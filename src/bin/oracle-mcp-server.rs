// ABOUTME: Binary entry point — loads configuration, assembles server resources, runs the stdio dispatcher.
// ABOUTME: stdout is reserved for JSON-RPC frames; every diagnostic here goes through `tracing` to stderr.
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![recursion_limit = "256"]
#![forbid(unsafe_code)]

//! # Oracle MCP Server Binary
//!
//! Starts a single-peer, stdio-transport Model Context Protocol server
//! exposing a curated set of Oracle Database operations. Reads its
//! connection, pool, and policy settings entirely from the environment
//! (see [`oracle_mcp_server::config::environment`]).

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use oracle_mcp_server::config::ServerConfig;
use oracle_mcp_server::mcp::dispatcher::Dispatcher;
use oracle_mcp_server::mcp::resources::ServerResources;
use oracle_mcp_server::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "oracle-mcp-server")]
#[command(about = "Model Context Protocol server for Oracle Database")]
struct Args {
    /// Override the `tracing` env-filter directive (defaults to `LOG_LEVEL` or "info").
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args_or_default();
    let config = setup_configuration(&args)?;
    run(config).await
}

/// Parse command line arguments, falling back to defaults if the process
/// was launched with arguments this binary doesn't recognize (an MCP host
/// may pass through extra flags).
fn parse_args_or_default() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("argument parsing failed: {error}");
            eprintln!("continuing with environment-derived configuration");
            Args { log_level: None }
        }
    }
}

fn setup_configuration(args: &Args) -> Result<ServerConfig> {
    let mut config = ServerConfig::from_env()?;
    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone();
    }
    logging::init(&config.log_level).map_err(|error| anyhow::anyhow!(error))?;
    info!(
        edition = ?config.oracle.edition,
        exposure = ?config.exposure,
        pool_max = config.pool.max_size,
        "oracle-mcp-server starting"
    );
    Ok(config)
}

async fn run(config: ServerConfig) -> Result<()> {
    let resources = ServerResources::builder(Arc::new(config)).build_arc()?;
    info!("tool catalog registered: {} tools", resources.registry.len());

    let dispatcher = Dispatcher::new(resources);
    if let Err(error) = dispatcher.run().await {
        error!(%error, "dispatcher exited with an error");
        return Err(anyhow::anyhow!(error));
    }

    Ok(())
}
