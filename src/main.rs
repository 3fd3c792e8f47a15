use std::sync::Arc;
use swap_send_mcp_server::{server, Config, McpServer};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting Swap & Send MCP Server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {}", e);
            Config::default()
        }
    };

    let mcp_server = match McpServer::from_config(&config) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            error!("Failed to initialize MCP server: {}", e);
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&config.listen_addr).await?;

    info!("MCP server listening on {}", listener.local_addr()?);
    info!("Available tools: swap, send, getBalances");

    server::serve(listener, mcp_server).await
}
