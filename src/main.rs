use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use smsrouter::bootstrap::Server;
use smsrouter::broker::MemoryQueue;
use smsrouter::config::Config;
use smsrouter::events::TracingSink;
use smsrouter::gateway::MockGateway;
use smsrouter::telemetry::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(name = "smsrouter")]
#[command(author, version, about = "SMS router between a message queue and an SMPP gateway")]
struct Args {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = Config::load(&args.config)?;

    init_tracing(&TracingConfig::from(&config.telemetry))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting smsrouter"
    );

    if args.validate {
        info!("configuration is valid");
        return Ok(());
    }

    let Some(mock) = config.gateway.mock.clone() else {
        bail!("no gateway backend configured; set gateway.mock to run against the mock gateway");
    };

    let queue = MemoryQueue::new();
    let gateway = Arc::new(MockGateway::new(&mock));
    let sink = Arc::new(TracingSink);

    let server = Server::new(config, queue, gateway, sink)?;
    server.run().await?;

    Ok(())
}
