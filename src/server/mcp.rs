use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, WalletError};
use crate::seed::WalletSeed;
use crate::tools::{tool_definitions, BalanceTool, SendTool, SwapTool, ToolCall, ToolResult};
use crate::wallet::{SharedWallet, WalletState};

pub const PROTOCOL_VERSION: &str = "2025-03-26";

pub const BALANCES_URI: &str = "wallet://balances";
pub const POOLS_URI: &str = "dex://pools";

/// JSON-RPC 2.0 Request format. A missing `id` marks a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Value, id: Option<u64>) -> Self {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: id.map(Value::from),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 Response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: String) -> Self {
        JsonRpcError {
            code,
            message,
            data: None,
        }
    }
}

/// MCP resource definition, as advertised by `resources/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn resource_definitions() -> Vec<ResourceDefinition> {
    vec![
        ResourceDefinition {
            uri: BALANCES_URI.to_string(),
            name: "Token Balances".to_string(),
            description: Some("Current wallet token balances".to_string()),
        },
        ResourceDefinition {
            uri: POOLS_URI.to_string(),
            name: "Liquidity Pools".to_string(),
            description: Some("Available liquidity pools for swapping".to_string()),
        },
    ]
}

/// MCP server exposing the swap, send and balance tools over one wallet.
pub struct McpServer {
    wallet: SharedWallet,
    swap_tool: SwapTool,
    send_tool: SendTool,
    balance_tool: BalanceTool,
}

impl McpServer {
    pub fn new(wallet: WalletState) -> Self {
        let wallet = wallet.into_shared();
        McpServer {
            swap_tool: SwapTool::new(wallet.clone()),
            send_tool: SendTool::new(wallet.clone()),
            balance_tool: BalanceTool::new(wallet.clone()),
            wallet,
        }
    }

    /// Seeds the wallet from the configured seed file, or the built-in seed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let seed = WalletSeed::load(config.seed_file.as_deref())?;
        let wallet = WalletState::new(seed)?;
        info!(
            "MCP server seeded with {} tokens and {} pools",
            wallet.tokens().len(),
            wallet.pools().len()
        );
        Ok(McpServer::new(wallet))
    }

    pub fn wallet(&self) -> SharedWallet {
        self.wallet.clone()
    }

    /// Handle a JSON-RPC message. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(
            "Handling MCP request: {} with params: {:?}",
            request.method, request.params
        );

        let id = match request.id {
            Some(id) => id,
            None => {
                match request.method.as_str() {
                    "notifications/initialized" => info!("Client finished initialization"),
                    other => debug!("Ignoring notification: {}", other),
                }
                return None;
            }
        };

        let response = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize(&request.params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "resources/list" => Ok(json!({ "resources": resource_definitions() })),
            "tools/call" => self.handle_tool_call(&request.params).await,
            "resources/read" => self.handle_resource_read(&request.params).await,
            _ => Err(JsonRpcError::new(
                -32601,
                format!("Method not found: {}", request.method),
            )),
        };

        Some(match response {
            Ok(result) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: Some(result),
                error: None,
                id,
            },
            Err(err) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(err),
                id,
            },
        })
    }

    fn handle_initialize(&self, params: &Value) -> Value {
        if let Some(client) = params.get("clientInfo") {
            info!("Initialize from client: {}", client);
        }

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": true },
                "resources": { "listChanged": true }
            },
            "serverInfo": {
                "name": "Swap & Send Server",
                "version": env!("CARGO_PKG_VERSION"),
                "description": "Simple token swap and send functionality"
            }
        })
    }

    async fn handle_tool_call(&self, params: &Value) -> std::result::Result<Value, JsonRpcError> {
        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| JsonRpcError::new(-32602, "Missing or invalid 'name' parameter".to_string()))?;

        let result = self.call_tool(tool_name, params.get("arguments").cloned()).await;

        serde_json::to_value(&result)
            .map_err(|e| JsonRpcError::new(-32603, format!("Internal error: {}", e)))
    }

    /// Runs a tool. Every failure comes back as an error envelope.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolResult {
        let outcome = match ToolCall::parse(name, arguments) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => Err(e),
        };

        outcome.unwrap_or_else(|e| {
            warn!("Tool {} failed: {}", name, e);
            ToolResult::error(&e)
        })
    }

    async fn dispatch(&self, call: ToolCall) -> Result<ToolResult> {
        match call {
            ToolCall::Swap(request) => {
                let response = self.swap_tool.swap(request).await?;
                Ok(ToolResult::success(&response))
            }
            ToolCall::Send(request) => {
                let response = self.send_tool.send(request).await?;
                Ok(ToolResult::success(&response))
            }
            ToolCall::GetBalances(request) => {
                let response = self.balance_tool.get_balances(request).await;
                Ok(ToolResult::success(&response))
            }
        }
    }

    async fn handle_resource_read(&self, params: &Value) -> std::result::Result<Value, JsonRpcError> {
        let uri = params
            .get("uri")
            .and_then(|v| v.as_str())
            .ok_or_else(|| JsonRpcError::new(-32602, "Missing or invalid 'uri' parameter".to_string()))?;

        match self.read_resource(uri).await {
            Ok(text) => Ok(json!({
                "contents": [{
                    "uri": uri,
                    "mimeType": "application/json",
                    "text": text
                }]
            })),
            Err(WalletError::ResourceNotFound(_)) => Ok(json!({
                "error": { "code": -32602, "message": "Resource not found" }
            })),
            Err(e) => Err(JsonRpcError::new(-32603, format!("Internal error: {}", e))),
        }
    }

    /// JSON text of a resource snapshot.
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        let text = match uri {
            BALANCES_URI => serde_json::to_string(&self.balance_tool.tokens().await),
            POOLS_URI => serde_json::to_string(&self.balance_tool.pools().await),
            _ => return Err(WalletError::ResourceNotFound(uri.to_string())),
        };
        text.map_err(|e| WalletError::ProtocolError(e.to_string()))
    }
}
