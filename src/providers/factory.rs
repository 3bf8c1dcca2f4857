//! Build the chat back-end named in `[chat]` and hand it to a [`ChatSlot`].

use crate::config::{ChatConfig, ProviderConfig};
use crate::providers::{
    AnthropicProvider, ChatCapability, ChatInstaller, OllamaProvider, OpenAIProvider,
};
use log::error;
use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;

/// Chat back-ends that can be built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(format!("Unknown chat provider: {}", name)),
        }
    }
}

pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the named chat back-end. Disabled entries are refused.
    pub fn create(
        provider_name: &str,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ChatCapability>, Box<dyn Error + Send + Sync>> {
        let kind: ProviderKind = provider_name.parse()?;
        if !config.enabled {
            return Err(format!("Chat provider '{}' is disabled", provider_name).into());
        }

        Ok(match kind {
            ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(config)?),
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
            ProviderKind::Ollama => Arc::new(OllamaProvider::new(config)?),
        })
    }

    /// Build the back-end named by `chat.default_provider`.
    pub fn get_default_provider(
        config: &ChatConfig,
    ) -> Result<Arc<dyn ChatCapability>, Box<dyn Error + Send + Sync>> {
        let provider_name = &config.default_provider;
        let provider_config = config.providers.get(provider_name).ok_or_else(|| {
            format!(
                "Chat provider '{}' has no [chat.providers.{}] section",
                provider_name, provider_name
            )
        })?;

        Self::create(provider_name, provider_config)
    }

    /// Build the default back-end and install it into the slot.
    ///
    /// On failure the installer is dropped, so waiters on the slot resolve to
    /// `CapabilityUnavailable` instead of waiting forever. Returns whether a
    /// capability was installed.
    pub fn install_default(config: &ChatConfig, installer: ChatInstaller) -> bool {
        match Self::get_default_provider(config) {
            Ok(capability) => {
                installer.install(capability);
                true
            }
            Err(e) => {
                error!("Chat provider unavailable: {}", e);
                false
            }
        }
    }
}
