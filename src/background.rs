//! Action-tagged message router sitting between a UI and the wallet
//! assistant. Every message gets a `{success, ...}` reply; nothing escapes
//! as an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::assistant::Assistant;
use crate::client::McpClient;
use crate::error::{Result, WalletError};
use crate::llm::ChatProvider;
use crate::rpc::{ChainProvider, NetworkStatus};
use crate::server::ResourceDefinition;
use crate::settings::SettingsStore;
use crate::tools::ToolDefinition;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action")]
pub enum MessageRequest {
    #[serde(rename = "sendMessage")]
    SendMessage {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "setApiKey")]
    SetApiKey {
        #[serde(default, rename = "apiKey")]
        api_key: Option<String>,
    },
    #[serde(rename = "getTools")]
    GetTools {},
    #[serde(rename = "getResources")]
    GetResources {},
    #[serde(rename = "connectMCP")]
    ConnectMcp {},
    #[serde(rename = "callTool")]
    CallTool {
        #[serde(default, rename = "toolName")]
        tool_name: Option<String>,
        #[serde(default)]
        args: Option<Value>,
    },
    #[serde(rename = "readResource")]
    ReadResource {
        #[serde(default)]
        uri: Option<String>,
    },
    #[serde(rename = "getNetworkStatus")]
    GetNetworkStatus {
        #[serde(default)]
        address: Option<String>,
    },
}

const ACTIONS: &[&str] = &[
    "sendMessage",
    "setApiKey",
    "getTools",
    "getResources",
    "connectMCP",
    "callTool",
    "readResource",
    "getNetworkStatus",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkStatus>,
}

impl MessageResponse {
    fn ok() -> Self {
        MessageResponse {
            success: true,
            ..Default::default()
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        MessageResponse {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

pub struct Background {
    client: Arc<McpClient>,
    assistant: Assistant,
    chain: Arc<dyn ChainProvider>,
}

impl Background {
    pub fn new(
        client: Arc<McpClient>,
        llm: Arc<dyn ChatProvider>,
        settings: Arc<dyn SettingsStore>,
        chain: Arc<dyn ChainProvider>,
    ) -> Self {
        Background {
            assistant: Assistant::new(client.clone(), llm, settings),
            client,
            chain,
        }
    }

    /// Startup hook: connect to the MCP server once.
    pub async fn on_installed(&self) -> bool {
        info!("Swap & Send assistant starting");
        self.connect().await
    }

    async fn connect(&self) -> bool {
        match self.client.connect().await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to connect to MCP server: {}", e);
                false
            }
        }
    }

    /// Routes a raw JSON message.
    pub async fn handle_value(&self, message: Value) -> MessageResponse {
        let action = message
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if !ACTIONS.contains(&action.as_str()) {
            warn!("Unknown action: {:?}", action);
            return MessageResponse::failure("Unknown action");
        }

        match serde_json::from_value::<MessageRequest>(message) {
            Ok(request) => self.handle(request).await,
            Err(e) => MessageResponse::failure(format!("Invalid {} message: {}", action, e)),
        }
    }

    pub async fn handle(&self, request: MessageRequest) -> MessageResponse {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Background message failed: {}", e);
                MessageResponse::failure(e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: MessageRequest) -> Result<MessageResponse> {
        let response = match request {
            MessageRequest::SendMessage { message } => match non_empty(message) {
                Some(message) => MessageResponse {
                    response: Some(self.assistant.process_message(&message).await),
                    ..MessageResponse::ok()
                },
                None => MessageResponse::failure("No message provided"),
            },
            MessageRequest::SetApiKey { api_key } => match non_empty(api_key) {
                Some(api_key) => {
                    self.assistant.set_api_key(&api_key).await?;
                    MessageResponse::ok()
                }
                None => MessageResponse::failure("No API key provided"),
            },
            MessageRequest::GetTools {} => MessageResponse {
                tools: Some(self.client.tools().await),
                connected: Some(self.client.is_connected().await),
                ..MessageResponse::ok()
            },
            MessageRequest::GetResources {} => MessageResponse {
                resources: Some(self.client.resources().await),
                connected: Some(self.client.is_connected().await),
                ..MessageResponse::ok()
            },
            MessageRequest::ConnectMcp {} => MessageResponse {
                success: self.connect().await,
                ..Default::default()
            },
            MessageRequest::CallTool { tool_name, args } => match non_empty(tool_name) {
                Some(name) => {
                    let args = args.unwrap_or_else(|| Value::Object(Default::default()));
                    let result = self.client.call_tool(&name, args).await?;
                    MessageResponse {
                        result: Some(
                            serde_json::to_value(result)
                                .map_err(|e| WalletError::ProtocolError(e.to_string()))?,
                        ),
                        ..MessageResponse::ok()
                    }
                }
                None => MessageResponse::failure("No tool name provided"),
            },
            MessageRequest::ReadResource { uri } => match non_empty(uri) {
                Some(uri) => MessageResponse {
                    result: Some(self.client.read_resource(&uri).await?),
                    ..MessageResponse::ok()
                },
                None => MessageResponse::failure("No URI provided"),
            },
            MessageRequest::GetNetworkStatus { address } => {
                let status = self.chain.network_status(address.as_deref()).await?;
                MessageResponse {
                    network: Some(status),
                    ..MessageResponse::ok()
                }
            }
        };
        Ok(response)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ChatTool};
    use crate::seed::WalletSeed;
    use crate::server::McpServer;
    use crate::settings::{MemorySettings, OPENAI_API_KEY};
    use crate::wallet::WalletState;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;

    struct EchoChat;

    #[async_trait]
    impl ChatProvider for EchoChat {
        async fn complete(
            &self,
            _api_key: &str,
            messages: &[ChatMessage],
            _tools: &[ChatTool],
        ) -> Result<ChatMessage> {
            let last = messages.last().and_then(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatMessage {
                role: "assistant".to_string(),
                content: Some(format!("echo: {}", last)),
                tool_calls: None,
                tool_call_id: None,
            })
        }
    }

    struct FixedChain {
        reachable: bool,
    }

    #[async_trait]
    impl ChainProvider for FixedChain {
        async fn chain_id(&self) -> Result<u64> {
            if self.reachable {
                Ok(88882)
            } else {
                Err(WalletError::ExternalCallFailure("Failed to get chain id".to_string()))
            }
        }

        async fn block_number(&self) -> Result<u64> {
            Ok(1_000)
        }

        async fn native_balance(&self, _address: &str) -> Result<Decimal> {
            Ok(Decimal::new(15, 1))
        }

        fn rpc_url(&self) -> &str {
            "https://spicy-rpc.chiliz.com"
        }
    }

    fn background(reachable: bool) -> (Background, Arc<MemorySettings>) {
        let server = Arc::new(McpServer::new(WalletState::new(WalletSeed::builtin()).unwrap()));
        let settings = Arc::new(MemorySettings::new());
        let background = Background::new(
            Arc::new(McpClient::in_process(server)),
            Arc::new(EchoChat),
            settings.clone(),
            Arc::new(FixedChain { reachable }),
        );
        (background, settings)
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let (background, _) = background(true);
        let response = background.handle_value(json!({"action": "selfDestruct"})).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Unknown action"));

        let response = background.handle_value(json!({"message": "no action"})).await;
        assert_eq!(response.error.as_deref(), Some("Unknown action"));
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let (background, _) = background(true);
        let cases = [
            (json!({"action": "sendMessage"}), "No message provided"),
            (json!({"action": "setApiKey", "apiKey": ""}), "No API key provided"),
            (json!({"action": "callTool"}), "No tool name provided"),
            (json!({"action": "readResource"}), "No URI provided"),
        ];
        for (message, expected) in cases {
            let response = background.handle_value(message).await;
            assert!(!response.success);
            assert_eq!(response.error.as_deref(), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_call_tool_before_connect_reports_error() {
        let (background, _) = background(true);
        let response = background
            .handle_value(json!({"action": "callTool", "toolName": "getBalances"}))
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Not connected to MCP server"));
    }

    #[tokio::test]
    async fn test_connect_then_list_and_call() {
        let (background, _) = background(true);
        assert!(background.on_installed().await);

        let tools = background.handle_value(json!({"action": "getTools"})).await;
        assert_eq!(tools.connected, Some(true));
        assert_eq!(tools.tools.unwrap().len(), 3);

        let call = background
            .handle_value(json!({"action": "callTool", "toolName": "getBalances"}))
            .await;
        assert!(call.success);
        let text = call.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
        let payload: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(payload["success"], true);
    }

    #[tokio::test]
    async fn test_connect_mcp_action() {
        let (background, _) = background(true);
        let response = background.handle_value(json!({"action": "connectMCP"})).await;
        assert!(response.success);
        let resources = background.handle_value(json!({"action": "getResources"})).await;
        assert_eq!(resources.resources.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_set_api_key_then_chat() {
        let (background, settings) = background(true);
        background.on_installed().await;

        let response = background
            .handle_value(json!({"action": "setApiKey", "apiKey": "sk-test"}))
            .await;
        assert!(response.success);
        assert_eq!(
            settings.get(OPENAI_API_KEY).await.unwrap(),
            Some("sk-test".to_string())
        );

        let reply = background
            .handle_value(json!({"action": "sendMessage", "message": "hello"}))
            .await;
        assert!(reply.success);
        assert_eq!(reply.response.as_deref(), Some("echo: hello"));
    }

    #[tokio::test]
    async fn test_network_status() {
        let (background, _) = background(true);
        let response = background
            .handle_value(json!({"action": "getNetworkStatus", "address": "0xabc"}))
            .await;
        let network = response.network.unwrap();
        assert_eq!(network.chain_id, 88882);
        assert_eq!(network.native_balance, Some(Decimal::new(15, 1)));
    }

    #[tokio::test]
    async fn test_network_failure_is_reported() {
        let (background, _) = background(false);
        let response = background.handle_value(json!({"action": "getNetworkStatus"})).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("chain id"));
    }

    #[tokio::test]
    async fn test_network_status_over_rpc_client() {
        use crate::rpc::RpcClient;
        use mockito::Matcher;
        use std::time::Duration;

        let mut node = mockito::Server::new_async().await;
        let _chain_id = node
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "eth_chainId"})))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":0,"result":"0x15b32"}"#)
            .create_async()
            .await;
        let _block = node
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "eth_blockNumber"})))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":0,"result":"0x3e8"}"#)
            .create_async()
            .await;

        let server = Arc::new(McpServer::new(WalletState::new(WalletSeed::builtin()).unwrap()));
        let background = Background::new(
            Arc::new(McpClient::in_process(server)),
            Arc::new(EchoChat),
            Arc::new(MemorySettings::new()),
            Arc::new(RpcClient::new(node.url(), Duration::from_secs(5)).unwrap()),
        );

        let response = background.handle_value(json!({"action": "getNetworkStatus"})).await;
        assert!(response.success, "{:?}", response.error);
        let network = response.network.unwrap();
        assert_eq!(network.chain_id, 88882);
        assert_eq!(network.block_number, 1_000);
        assert_eq!(network.rpc_url, node.url());
        assert_eq!(network.native_balance, None);
    }
}
