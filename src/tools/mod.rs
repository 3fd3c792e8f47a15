pub mod balance;
pub mod send;
pub mod swap;

pub use balance::{BalanceTool, BalancesRequest};
pub use send::{SendRequest, SendTool};
pub use swap::{SwapRequest, SwapTool};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, WalletError};

/// MCP tool definition, as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// The tool catalog advertised to the LLM.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "swap".to_string(),
            description: "Swap tokens using AMM (x*y=k) formula".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tokenIn": {
                        "type": "string",
                        "description": "Input token symbol (e.g., ETH, USDC)"
                    },
                    "tokenOut": {
                        "type": "string",
                        "description": "Output token symbol (e.g., ETH, USDC)"
                    },
                    "amountIn": {
                        "type": "number",
                        "exclusiveMinimum": 0,
                        "description": "Amount of input token to swap"
                    },
                    "slippage": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 1,
                        "default": 0.005,
                        "description": "Slippage tolerance (0.005 = 0.5%, default: 0.005)"
                    }
                },
                "required": ["tokenIn", "tokenOut", "amountIn"]
            }),
        },
        ToolDefinition {
            name: "send".to_string(),
            description: "Send tokens to a recipient address".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "token": {
                        "type": "string",
                        "description": "Token symbol to send (e.g., ETH, USDC)"
                    },
                    "amount": {
                        "type": "number",
                        "exclusiveMinimum": 0,
                        "description": "Amount of tokens to send"
                    },
                    "recipient": {
                        "type": "string",
                        "minLength": 10,
                        "description": "Recipient wallet address"
                    }
                },
                "required": ["token", "amount", "recipient"]
            }),
        },
        ToolDefinition {
            name: "getBalances".to_string(),
            description: "Get current token balances".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Swap(SwapRequest),
    Send(SendRequest),
    GetBalances(BalancesRequest),
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| WalletError::InvalidArguments(e.to_string()))
}

impl ToolCall {
    /// Resolves a tool name and its raw arguments.
    ///
    /// Unknown names fail with `ToolNotFound`; malformed or out-of-range
    /// arguments fail with `InvalidArguments` and never reach the wallet.
    pub fn parse(name: &str, arguments: Option<Value>) -> Result<Self> {
        let arguments = match arguments {
            None | Some(Value::Null) => json!({}),
            Some(value) => value,
        };

        match name {
            "swap" => {
                let request: SwapRequest = parse_arguments(arguments)?;
                request.validate()?;
                Ok(ToolCall::Swap(request))
            }
            "send" => {
                let request: SendRequest = parse_arguments(arguments)?;
                request.validate()?;
                Ok(ToolCall::Send(request))
            }
            "getBalances" => Ok(ToolCall::GetBalances(parse_arguments(arguments)?)),
            _ => Err(WalletError::ToolNotFound(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Swap(_) => "swap",
            ToolCall::Send(_) => "send",
            ToolCall::GetBalances(_) => "getBalances",
        }
    }
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result envelope of `tools/call`: always JSON text content, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(text) => ToolResult::text(text, false),
            Err(e) => ToolResult::error(&WalletError::ProtocolError(e.to_string())),
        }
    }

    pub fn error(err: &WalletError) -> Self {
        let body = json!({
            "success": false,
            "error": err.to_string(),
            "code": err.code(),
        });
        ToolResult::text(body.to_string(), true)
    }

    fn text(text: String, is_error: bool) -> Self {
        ToolResult {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text,
            }],
            is_error,
        }
    }

    /// Text of the first content block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| c.text.as_str())
    }

    /// First content block parsed back into JSON.
    pub fn payload(&self) -> Result<Value> {
        let text = self
            .first_text()
            .ok_or_else(|| WalletError::ProtocolError("Tool result has no content".to_string()))?;
        serde_json::from_str(text).map_err(|e| WalletError::ProtocolError(e.to_string()))
    }
}
