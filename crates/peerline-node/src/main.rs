//! peerline node binary
//!
//! Starts a node on the given listen address and reads commands from stdin.
//! Logs go to stderr; stdout is the operator console.

use anyhow::Result;
use peerline_node::cli::Cli;
use peerline_node::{parse_listen_addr, CommandLoop, ConsoleObserver, Node, NodeConfig};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();
    let config = cli.node_config()?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli, config));
    // A stdin read may still be parked on a blocking thread.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli, config: NodeConfig) -> Result<()> {
    let listen = parse_listen_addr(&cli.listen)?;
    let node = Arc::new(Node::with_tcp_host(config)?);

    let addr = node.start(&listen, Arc::new(ConsoleObserver)).await?;
    println!("Node is listening on: {}", addr);

    let mut command_loop = CommandLoop::new(Arc::clone(&node));
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = command_loop.run(stdin, tokio::io::stdout()) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    node.shutdown();
    tracing::info!("peerline node stopped");
    Ok(())
}
