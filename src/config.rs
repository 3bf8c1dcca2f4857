use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

/// Top-level configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Segmentation endpoint settings
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    /// Image preprocessing settings
    #[serde(default)]
    pub image: ImageConfig,
    /// Chat back-end settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Settings for the food segmentation API
#[derive(Debug, Deserialize, Clone)]
pub struct SegmentationConfig {
    /// Bearer token (can also be set via LOGMEAL_API_TOKEN)
    pub api_token: Option<String>,
    /// Scheme and host of the API
    #[serde(default = "default_segmentation_base_url")]
    pub base_url: String,
    /// Value of the `language` query parameter
    #[serde(default = "default_language")]
    pub language: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: default_segmentation_base_url(),
            language: default_language(),
            timeout: default_timeout(),
        }
    }
}

impl SegmentationConfig {
    /// Config value first, then the LOGMEAL_API_TOKEN environment variable
    pub fn resolve_token(&self) -> Option<String> {
        self.resolve_token_with(std::env::var("LOGMEAL_API_TOKEN").ok())
    }

    /// Token selection with the environment value passed in.
    pub fn resolve_token_with(&self, env_token: Option<String>) -> Option<String> {
        self.api_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or(env_token)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Bounds and encoding for the image preprocessor
#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    /// JPEG quality, 1-100
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Log a warning when the encoded image is larger than this
    #[serde(default = "default_size_warning_bytes")]
    pub size_warning_bytes: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
            size_warning_bytes: default_size_warning_bytes(),
        }
    }
}

/// Chat back-end selection
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Provider to use when not specified
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
        }
    }
}

/// Configuration for a specific chat provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    pub enabled: bool,
    /// Model identifier (e.g., "gpt-4o-mini", "claude-3-5-haiku-latest")
    pub model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key for authentication (can also be set via environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
}

// Default value functions
fn default_segmentation_base_url() -> String {
    "https://api.logmeal.com".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_dimension() -> u32 {
    512
}

fn default_jpeg_quality() -> u8 {
    crate::preprocess::DEFAULT_JPEG_QUALITY
}

fn default_size_warning_bytes() -> usize {
    crate::preprocess::SIZE_WARNING_BYTES
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with SNAPDISH__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: SNAPDISH__SEGMENTATION__API_TOKEN
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// See [`AppConfig::load`] for the precedence rules.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: SNAPDISH__IMAGE__MAX_WIDTH
        .add_source(
            Environment::with_prefix("SNAPDISH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
