//! Newline-delimited JSON-RPC over TCP.

use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use super::mcp::{JsonRpcRequest, McpServer};

/// Accepts connections forever, one task per connection.
pub async fn serve(listener: TcpListener, mcp_server: Arc<McpServer>) -> eyre::Result<()> {
    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let mcp_server = Arc::clone(&mcp_server);
        info!("Accepted connection from {}", peer_addr);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, mcp_server).await {
                error!("Error handling connection from {}: {}", peer_addr, e);
            }
        });
    }
}

pub async fn handle_connection(socket: TcpStream, mcp_server: Arc<McpServer>) -> eyre::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    while buf_reader.read_line(&mut line).await? > 0 {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            line.clear();
            continue;
        }

        let reply = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                info!("Received request: {} (id: {:?})", request.method, request.id);
                match mcp_server.handle_request(request).await {
                    Some(response) => Some(serde_json::to_string(&response)?),
                    None => None,
                }
            }
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                let error_response = json!({
                    "jsonrpc": "2.0",
                    "error": {
                        "code": -32700,
                        "message": "Parse error",
                        "data": e.to_string()
                    },
                    "id": null
                });
                Some(error_response.to_string())
            }
        };

        if let Some(reply) = reply {
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        line.clear();
    }

    Ok(())
}
