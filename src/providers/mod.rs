mod anthropic;
mod factory;
mod ollama;
mod open_ai;
mod slot;

pub use anthropic::AnthropicProvider;
pub use factory::{ProviderFactory, ProviderKind};
pub use ollama::OllamaProvider;
pub use open_ai::OpenAIProvider;
pub use slot::{ChatInstaller, ChatSlot};

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error;

/// Reply from a chat back-end, shaped as `{ message: { content } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatReply {
    pub fn text(content: impl Into<String>) -> Self {
        ChatReply {
            message: Some(ChatMessage {
                content: Some(content.into()),
            }),
        }
    }

    /// Message content, or the empty string when the reply carried none
    pub fn content(&self) -> &str {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .unwrap_or("")
    }
}

/// Unified trait for all chat back-ends
#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Send a single user prompt and return the assistant reply
    async fn chat(&self, prompt: &str) -> Result<ChatReply, Box<dyn Error + Send + Sync>>;
}
