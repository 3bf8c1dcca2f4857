//! Detect the ingredients in a food photo and suggest dishes made from them.
//!
//! An upload runs through three stages: [`preprocess`] shrinks and
//! re-encodes the photo, [`segmentation`] asks the LogMeal API which foods
//! are on it, and [`suggest`] asks a chat back-end for dishes that use only
//! those foods. [`UploadController`] drives the stages and keeps the view a
//! front-end renders.

pub mod builder;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod providers;
pub mod segmentation;
pub mod suggest;

pub use builder::UploadControllerBuilder;
pub use config::{load_config, AppConfig};
pub use controller::{FlowState, UploadController, UploadReport, UploadView};
pub use error::PipelineError;
pub use model::{ImageAsset, IngredientSet, ProcessedImage, RecipeName};
pub use providers::{ChatCapability, ChatInstaller, ChatReply, ChatSlot, ProviderFactory};
pub use segmentation::{IngredientDetector, LogMealClient};

/// Run a single file through a freshly configured pipeline.
///
/// Loads configuration, builds the default chat provider and the LogMeal
/// client, and returns the upload report.
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let report = snapdish::detect_and_suggest("fridge.jpg").await?;
/// println!("{:?}", report.recipes);
/// # Ok(())
/// # }
/// ```
pub async fn detect_and_suggest(path: &str) -> Result<UploadReport, Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    let capability = ProviderFactory::get_default_provider(&config.chat)?;

    let controller = UploadController::builder()
        .config(&config)
        .chat(ChatSlot::installed(capability))
        .build()?;

    let asset = read_asset(path).await?;
    Ok(controller.handle_upload(asset).await?)
}

/// Read an image file into an [`ImageAsset`], guessing its media type from
/// the extension.
pub async fn read_asset(path: &str) -> Result<ImageAsset, std::io::Error> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let media_type = ImageAsset::media_type_for(&file_name);
    Ok(ImageAsset::new(bytes, media_type, file_name))
}
