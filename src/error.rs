use thiserror::Error;

/// Errors that can occur while running an upload through the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The uploaded bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Re-encoding the scaled bitmap as JPEG failed
    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Segmentation endpoint answered with a non-success status
    #[error("HTTP error {status}")]
    Http { status: u16 },

    /// Could not reach the segmentation endpoint
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Chat capability has not been installed yet
    #[error("Chat capability is not available")]
    CapabilityUnavailable,

    /// The chat capability call itself failed
    #[error("Chat request failed: {0}")]
    Chat(String),

    /// No bearer token for the segmentation endpoint
    #[error("Segmentation API token not found in config or environment")]
    MissingToken,

    /// Builder configuration error
    #[error("Builder error: {0}")]
    Builder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The blocking preprocessing task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),

    /// A newer upload was started while this one was in flight
    #[error("Upload #{sequence} was superseded by a newer upload")]
    Superseded { sequence: u64 },
}
