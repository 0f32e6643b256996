use std::sync::Arc;

use clap::Parser;
use ws_lobby::{Coordinator, ServerConfig};

/// wl_server - lobby coordinator daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the listener to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// WebSocket upgrade path for game connections
    #[arg(short, long, default_value = "/ws/game")]
    path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = ServerConfig::new()
        .with_bind_addr(args.bind)
        .with_ws_path(args.path);
    let coordinator = Arc::new(Coordinator::new());

    ws_lobby::serve(config, coordinator).await?;
    Ok(())
}
