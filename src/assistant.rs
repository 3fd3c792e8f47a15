//! One chat round trip: the model picks a tool, the dispatcher runs it, and
//! a follow-up completion phrases the result.

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::client::McpClient;
use crate::error::{Result, WalletError};
use crate::llm::{ChatMessage, ChatProvider, ChatTool};
use crate::settings::{SettingsStore, OPENAI_API_KEY};

pub const SYSTEM_PROMPT: &str = "You are a helpful DeFi assistant with access to swap and send tools. \
You can help users swap tokens using AMM pools, send tokens to recipients, and check balances. \
Always be clear about transaction details and risks.";

pub const NO_ANSWER: &str = "Sorry, I could not process your request.";
pub const PROCESSING_FAILED: &str = "Sorry, there was an error processing your request.";

pub struct Assistant {
    client: Arc<McpClient>,
    llm: Arc<dyn ChatProvider>,
    settings: Arc<dyn SettingsStore>,
}

impl Assistant {
    pub fn new(
        client: Arc<McpClient>,
        llm: Arc<dyn ChatProvider>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Assistant {
            client,
            llm,
            settings,
        }
    }

    pub async fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.settings.set(OPENAI_API_KEY, api_key).await
    }

    /// Never fails: any error becomes a fixed apology.
    pub async fn process_message(&self, message: &str) -> String {
        match self.converse(message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error processing message: {}", e);
                PROCESSING_FAILED.to_string()
            }
        }
    }

    async fn converse(&self, message: &str) -> Result<String> {
        let api_key = self.settings.require(OPENAI_API_KEY).await?;
        let tools: Vec<ChatTool> = self.client.tools().await.iter().map(ChatTool::from).collect();
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(message)];

        let reply = self.llm.complete(&api_key, &messages, &tools).await?;

        let call = match reply.first_tool_call() {
            Some(call) => call.clone(),
            None => return Ok(answer_or_default(reply.content)),
        };

        info!("Assistant selected tool {}", call.function.name);
        let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
            WalletError::InvalidArguments(format!("Model produced invalid arguments: {}", e))
        })?;
        let result = self.client.call_tool(&call.function.name, arguments).await?;

        messages.push(reply);
        messages.push(ChatMessage::tool(&call.id, result.first_text().unwrap_or_default()));

        let follow_up = self.llm.complete(&api_key, &messages, &[]).await?;
        Ok(answer_or_default(follow_up.content))
    }
}

fn answer_or_default(content: Option<String>) -> String {
    content
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| NO_ANSWER.to_string())
}
