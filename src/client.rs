//! Client side of the MCP dispatcher.
//!
//! `McpClient` starts disconnected. `connect` runs the handshake
//! (`initialize`, `notifications/initialized`, `tools/list`,
//! `resources/list`) and caches both catalogs; tool calls and resource reads
//! before that fail with `NotConnected`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Result, WalletError};
use crate::server::{JsonRpcRequest, JsonRpcResponse, McpServer, ResourceDefinition, PROTOCOL_VERSION};
use crate::tools::{ToolDefinition, ToolResult};

/// Carries one JSON-RPC message to a server. Notifications return `None`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: JsonRpcRequest) -> Result<Option<JsonRpcResponse>>;

    /// Re-establishes a dropped connection; a no-op while it is healthy.
    async fn reconnect(&self) -> Result<()> {
        Ok(())
    }
}

/// Calls straight into a server living in the same process.
pub struct InProcessTransport {
    server: Arc<McpServer>,
}

impl InProcessTransport {
    pub fn new(server: Arc<McpServer>) -> Self {
        InProcessTransport { server }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<Option<JsonRpcResponse>> {
        Ok(self.server.handle_request(request).await)
    }
}

struct TcpConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TcpConnection {
    async fn open(addr: &str, timeout: Duration) -> Result<Self> {
        let socket = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| WalletError::ExternalCallFailure(format!("Timed out connecting to {}", addr)))?
            .map_err(|e| WalletError::ExternalCallFailure(format!("Cannot connect to {}: {}", addr, e)))?;
        let (reader, writer) = socket.into_split();

        info!("Connected to MCP server at {}", addr);
        Ok(TcpConnection {
            reader: BufReader::new(reader),
            writer,
        })
    }

    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<Option<JsonRpcResponse>> {
        let line = serde_json::to_string(request).map_err(|e| WalletError::ProtocolError(e.to_string()))?;
        let io_error = |e: std::io::Error| WalletError::ExternalCallFailure(format!("MCP connection error: {}", e));

        self.writer.write_all(line.as_bytes()).await.map_err(io_error)?;
        self.writer.write_all(b"\n").await.map_err(io_error)?;
        self.writer.flush().await.map_err(io_error)?;

        if request.is_notification() {
            return Ok(None);
        }

        let mut response_line = String::new();
        let read = self.reader.read_line(&mut response_line).await.map_err(io_error)?;
        if read == 0 {
            return Err(WalletError::ExternalCallFailure(
                "MCP server closed the connection".to_string(),
            ));
        }

        serde_json::from_str(response_line.trim())
            .map(Some)
            .map_err(|e| WalletError::ProtocolError(format!("Invalid response: {}", e)))
    }
}

/// Newline-delimited JSON over one TCP connection.
///
/// Any failed exchange drops the connection: a reply that arrives after a
/// timeout must never be read as the answer to a later request. Sends then
/// fail until `reconnect` dials again.
pub struct TcpTransport {
    addr: String,
    connection: Mutex<Option<TcpConnection>>,
    timeout: Duration,
}

impl TcpTransport {
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let connection = TcpConnection::open(addr, timeout).await?;
        Ok(TcpTransport {
            addr: addr.to_string(),
            connection: Mutex::new(Some(connection)),
            timeout,
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<Option<JsonRpcResponse>> {
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or_else(|| {
            WalletError::ExternalCallFailure(format!(
                "Connection to {} was dropped; reconnect first",
                self.addr
            ))
        })?;

        let outcome = match tokio::time::timeout(self.timeout, connection.exchange(&request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(WalletError::ExternalCallFailure(format!(
                "Timed out waiting for {} after {:?}",
                request.method, self.timeout
            ))),
        };

        if let Err(e) = &outcome {
            warn!("Dropping connection to {}: {}", self.addr, e);
            *guard = None;
        }
        outcome
    }

    async fn reconnect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(TcpConnection::open(&self.addr, self.timeout).await?);
        }
        Ok(())
    }
}

#[derive(Default)]
struct ClientState {
    connected: bool,
    tools: Vec<ToolDefinition>,
    resources: Vec<ResourceDefinition>,
}

pub struct McpClient {
    transport: Box<dyn Transport>,
    next_id: AtomicU64,
    state: RwLock<ClientState>,
}

impl McpClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        McpClient {
            transport,
            next_id: AtomicU64::new(0),
            state: RwLock::new(ClientState::default()),
        }
    }

    pub fn in_process(server: Arc<McpServer>) -> Self {
        Self::new(Box::new(InProcessTransport::new(server)))
    }

    pub async fn tcp(addr: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::new(Box::new(TcpTransport::connect(addr, timeout).await?)))
    }

    /// Runs the handshake and caches the catalogs. Safe to call again, and
    /// redials a dropped TCP connection.
    pub async fn connect(&self) -> Result<()> {
        self.transport.reconnect().await?;
        let init = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": "swap-send-client", "version": env!("CARGO_PKG_VERSION") }
                }),
            )
            .await?;
        if init.is_null() {
            return Err(WalletError::ProtocolError("Empty initialize result".to_string()));
        }

        self.transport
            .send(JsonRpcRequest::new("notifications/initialized", json!({}), None))
            .await?;

        let tools = self.request("tools/list", json!({})).await?;
        let tools: Vec<ToolDefinition> = decode_list(&tools, "tools")?;
        let resources = self.request("resources/list", json!({})).await?;
        let resources: Vec<ResourceDefinition> = decode_list(&resources, "resources")?;

        info!(
            "Connected to Swap & Send MCP Server ({} tools, {} resources)",
            tools.len(),
            resources.len()
        );

        let mut state = self.state.write().await;
        state.tools = tools;
        state.resources = resources;
        state.connected = true;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    pub async fn tools(&self) -> Vec<ToolDefinition> {
        self.state.read().await.tools.clone()
    }

    pub async fn resources(&self) -> Vec<ResourceDefinition> {
        self.state.read().await.resources.clone()
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        self.ensure_connected().await?;
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| WalletError::ProtocolError(format!("Invalid tool result: {}", e)))
    }

    /// The raw `resources/read` result: `{contents: [...]}`, or
    /// `{error: {...}}` for an unknown URI.
    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        self.ensure_connected().await?;
        self.request("resources/read", json!({ "uri": uri })).await
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(WalletError::NotConnected)
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!("Sending {} (id {})", method, id);

        let response = self
            .transport
            .send(JsonRpcRequest::new(method, params, Some(id)))
            .await?
            .ok_or_else(|| WalletError::ProtocolError(format!("No response to {}", method)))?;

        if response.id != Value::from(id) {
            warn!("{} (id {}) answered with id {}", method, id, response.id);
            return Err(WalletError::ProtocolError(format!(
                "Response id {} does not match request id {}",
                response.id, id
            )));
        }

        if let Some(error) = response.error {
            warn!("{} failed: {} ({})", method, error.message, error.code);
            return Err(WalletError::ProtocolError(format!(
                "{} failed with {}: {}",
                method, error.code, error.message
            )));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(result: &Value, field: &str) -> Result<Vec<T>> {
    match result.get(field) {
        Some(items) => serde_json::from_value(items.clone())
            .map_err(|e| WalletError::ProtocolError(format!("Invalid {} list: {}", field, e))),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::WalletSeed;
    use crate::server::{serve, BALANCES_URI};
    use crate::wallet::WalletState;
    use tokio::net::TcpListener;

    fn server() -> Arc<McpServer> {
        Arc::new(McpServer::new(WalletState::new(WalletSeed::builtin()).unwrap()))
    }

    #[tokio::test]
    async fn test_call_before_connect_fails() {
        let client = McpClient::in_process(server());
        assert!(!client.is_connected().await);

        let err = client.call_tool("getBalances", json!({})).await.unwrap_err();
        assert_eq!(err, WalletError::NotConnected);
        let err = client.read_resource(BALANCES_URI).await.unwrap_err();
        assert_eq!(err, WalletError::NotConnected);
    }

    #[tokio::test]
    async fn test_connect_caches_catalogs() {
        let client = McpClient::in_process(server());
        client.connect().await.unwrap();

        assert!(client.is_connected().await);
        let names: Vec<String> = client.tools().await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["swap", "send", "getBalances"]);
        assert_eq!(client.resources().await.len(), 2);
    }

    #[tokio::test]
    async fn test_send_through_client() {
        let client = McpClient::in_process(server());
        client.connect().await.unwrap();

        let result = client
            .call_tool(
                "send",
                json!({"token": "LINK", "amount": 50, "recipient": "0x1111111111"}),
            )
            .await
            .unwrap();
        assert!(!result.is_error);
        let payload = result.payload().unwrap();
        assert_eq!(payload["remainingBalance"], json!(50.0));
        assert!(payload["txHash"].as_str().unwrap().starts_with("0x"));
    }

    #[tokio::test]
    async fn test_unknown_tool_through_client() {
        let client = McpClient::in_process(server());
        client.connect().await.unwrap();

        let result = client.call_tool("foo", json!({})).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.payload().unwrap()["code"], "ToolNotFound");
    }

    #[tokio::test]
    async fn test_read_unknown_resource_returns_error_object() {
        let client = McpClient::in_process(server());
        client.connect().await.unwrap();

        let result = client.read_resource("wallet://nothing").await.unwrap();
        assert_eq!(result["error"]["message"], "Resource not found");
    }

    #[tokio::test]
    async fn test_tcp_transport_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(serve(listener, server()));

        let client = McpClient::tcp(&addr, Duration::from_secs(5)).await.unwrap();
        client.connect().await.unwrap();

        let result = client.call_tool("getBalances", json!({})).await.unwrap();
        let payload = result.payload().unwrap();
        assert_eq!(payload["success"], true);
        assert_eq!(payload["totalTokens"], 7);

        let pools = client.read_resource(crate::server::POOLS_URI).await.unwrap();
        assert_eq!(pools["contents"][0]["uri"], crate::server::POOLS_URI);
    }

    /// Answers every request with `{"answerTo": method}` under the request's
    /// id, holding back the first reply it ever sends by `delay`.
    async fn slow_server(delay: Duration) -> String {
        use std::sync::atomic::AtomicBool;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let delayed = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                let delayed = delayed.clone();
                tokio::spawn(async move {
                    let (reader, mut writer) = socket.into_split();
                    let mut lines = BufReader::new(reader).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        let request: JsonRpcRequest = serde_json::from_str(&line).unwrap();
                        let Some(id) = request.id else { continue };
                        if !delayed.swap(true, Ordering::SeqCst) {
                            tokio::time::sleep(delay).await;
                        }
                        let reply = json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "result": { "answerTo": request.method }
                        });
                        let _ = writer.write_all(format!("{}\n", reply).as_bytes()).await;
                    }
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_late_reply_is_never_read_as_the_next_answer() {
        let addr = slow_server(Duration::from_millis(300)).await;
        let client = McpClient::tcp(&addr, Duration::from_millis(100)).await.unwrap();

        let err = client.request("tools/call", json!({})).await.unwrap_err();
        assert!(matches!(err, WalletError::ExternalCallFailure(_)));

        // The connection is dropped, so the late tools/call reply cannot leak.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let err = client.request("resources/read", json!({})).await.unwrap_err();
        assert!(matches!(err, WalletError::ExternalCallFailure(_)));

        client.connect().await.unwrap();
        let result = client.request("resources/read", json!({})).await.unwrap();
        assert_eq!(result["answerTo"], "resources/read");
    }

    struct WrongIdTransport;

    #[async_trait]
    impl Transport for WrongIdTransport {
        async fn send(&self, request: JsonRpcRequest) -> Result<Option<JsonRpcResponse>> {
            Ok(request.id.map(|_| JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: Some(json!({ "answerTo": "something else" })),
                error: None,
                id: json!(99),
            }))
        }
    }

    #[tokio::test]
    async fn test_mismatched_response_id_is_rejected() {
        let client = McpClient::new(Box::new(WrongIdTransport));
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, WalletError::ProtocolError(_)));
        assert!(!client.is_connected().await);
    }
}
