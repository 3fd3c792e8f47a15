//! Chat-completion collaborator: turns a user message plus the tool catalog
//! into either a reply or a tool selection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{Result, WalletError};
use crate::tools::ToolDefinition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: &str) -> Self {
        Self::plain("user", content)
    }

    pub fn tool(tool_call_id: &str, content: &str) -> Self {
        ChatMessage {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::plain("tool", content)
        }
    }

    fn plain(role: &str, content: &str) -> Self {
        ChatMessage {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// The first tool the model asked for, if any.
    pub fn first_tool_call(&self) -> Option<&ChatToolCall> {
        self.tool_calls.as_ref().and_then(|calls| calls.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl From<&ToolDefinition> for ChatTool {
    fn from(tool: &ToolDefinition) -> Self {
        ChatTool {
            kind: function_kind(),
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ChatTool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// One completion. An empty `tools` slice disables tool selection.
    async fn complete(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
        tools: &[ChatTool],
    ) -> Result<ChatMessage>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::ConfigError(format!("Cannot build HTTP client: {}", e)))?;

        Ok(OpenAiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.llm_base_url, &config.llm_model, config.request_timeout())
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
        tools: &[ChatTool],
    ) -> Result<ChatMessage> {
        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(tools), Some("auto"))
        };
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            tools,
            tool_choice,
        };

        debug!(
            "Requesting chat completion ({} messages, model {})",
            messages.len(),
            self.model
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion request failed: {}", e);
                WalletError::ExternalCallFailure(format!("LLM request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Chat completion returned {}: {}", status, detail);
            return Err(WalletError::ExternalCallFailure(format!(
                "LLM returned {}",
                status
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            WalletError::ExternalCallFailure(format!("Invalid LLM response: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| WalletError::ExternalCallFailure("LLM returned no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_definitions;
    use mockito::Matcher;
    use serde_json::json;

    fn client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new(base_url, "gpt-3.5-turbo", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_chat_tool_from_definition() {
        let tools: Vec<ChatTool> = tool_definitions().iter().map(ChatTool::from).collect();
        let json = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "swap");
        assert_eq!(json["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_tool_message_serialization() {
        let json = serde_json::to_value(ChatMessage::tool("call_1", "{}")).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
    }

    #[tokio::test]
    async fn test_completion_with_tool_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-3.5-turbo", "tool_choice": "auto"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {
                                    "name": "getBalances",
                                    "arguments": "{}"
                                }
                            }]
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tools: Vec<ChatTool> = tool_definitions().iter().map(ChatTool::from).collect();
        let reply = client(&server.url())
            .complete("sk-test", &[ChatMessage::user("what do I hold?")], &tools)
            .await
            .unwrap();

        mock.assert_async().await;
        let call = reply.first_tool_call().unwrap();
        assert_eq!(call.function.name, "getBalances");
    }

    #[tokio::test]
    async fn test_http_error_is_external_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"bad key"}}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete("sk-wrong", &[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ExternalCallFailure");
    }

    #[tokio::test]
    async fn test_empty_choices_is_external_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete("sk-test", &[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::ExternalCallFailure(_)));
    }
}
