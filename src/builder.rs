use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, ImageConfig, SegmentationConfig};
use crate::controller::UploadController;
use crate::error::PipelineError;
use crate::providers::ChatSlot;
use crate::segmentation::{IngredientDetector, LogMealClient};

/// Builder for configuring an [`UploadController`]
#[derive(Default)]
pub struct UploadControllerBuilder {
    segmentation: SegmentationConfig,
    image: ImageConfig,
    detector: Option<Arc<dyn IngredientDetector>>,
    chat: Option<ChatSlot>,
}

impl UploadControllerBuilder {
    /// Start from loaded configuration
    ///
    /// # Example
    /// ```no_run
    /// use snapdish::{AppConfig, UploadController};
    ///
    /// let config = AppConfig::load().unwrap();
    /// let builder = UploadController::builder().config(&config);
    /// ```
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.segmentation = config.segmentation.clone();
        self.image = config.image.clone();
        self
    }

    /// Set the bearer token for the segmentation API
    ///
    /// Without it the token is read from configuration or the
    /// LOGMEAL_API_TOKEN environment variable.
    ///
    /// # Example
    /// ```
    /// use snapdish::UploadController;
    ///
    /// let builder = UploadController::builder().api_token("your-token");
    /// ```
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.segmentation.api_token = Some(token.into());
        self
    }

    /// Point the segmentation client at another host (proxies, tests)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.segmentation.base_url = url.into();
        self
    }

    /// Set a timeout for segmentation requests
    ///
    /// # Example
    /// ```
    /// use snapdish::UploadController;
    /// use std::time::Duration;
    ///
    /// let builder = UploadController::builder().timeout(Duration::from_secs(10));
    /// ```
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.segmentation.timeout = duration.as_secs();
        self
    }

    /// Bound the preprocessed image size
    pub fn max_dimensions(mut self, max_width: u32, max_height: u32) -> Self {
        self.image.max_width = max_width;
        self.image.max_height = max_height;
        self
    }

    /// JPEG quality for the uploaded image, 1-100
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.image.jpeg_quality = quality;
        self
    }

    /// Use a custom ingredient detector instead of the LogMeal client
    pub fn detector(mut self, detector: Arc<dyn IngredientDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Set where the chat capability will appear once it is ready
    ///
    /// # Example
    /// ```
    /// use snapdish::{ChatSlot, UploadController};
    ///
    /// let (installer, slot) = ChatSlot::pending();
    /// let builder = UploadController::builder().chat(slot);
    /// ```
    pub fn chat(mut self, slot: ChatSlot) -> Self {
        self.chat = Some(slot);
        self
    }

    /// Build the controller
    ///
    /// # Errors
    /// Returns `PipelineError` if:
    /// - No chat slot was specified
    /// - No detector was given and no segmentation token can be found
    /// - The HTTP client cannot be created
    pub fn build(self) -> Result<UploadController, PipelineError> {
        let chat = self.chat.ok_or_else(|| {
            PipelineError::Builder("No chat capability specified. Use .chat()".to_string())
        })?;

        let detector = match self.detector {
            Some(detector) => detector,
            None => Arc::new(LogMealClient::new(&self.segmentation)?),
        };

        Ok(UploadController::new(detector, chat, self.image))
    }
}

impl UploadController {
    /// Creates a new builder
    ///
    /// # Example
    /// ```
    /// use snapdish::UploadController;
    ///
    /// let builder = UploadController::builder();
    /// ```
    pub fn builder() -> UploadControllerBuilder {
        UploadControllerBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IngredientSet, ProcessedImage};
    use async_trait::async_trait;

    struct NoIngredients;

    #[async_trait]
    impl IngredientDetector for NoIngredients {
        async fn extract_ingredients(
            &self,
            _image: &ProcessedImage,
        ) -> Result<IngredientSet, PipelineError> {
            Ok(IngredientSet::new())
        }
    }

    #[test]
    fn test_build_without_chat_fails() {
        let result = UploadController::builder()
            .detector(Arc::new(NoIngredients))
            .build();
        match result {
            Err(PipelineError::Builder(message)) => assert!(message.contains(".chat()")),
            _ => panic!("expected builder error"),
        }
    }

    #[test]
    fn test_build_with_token() {
        let (_installer, slot) = ChatSlot::pending();
        let result = UploadController::builder()
            .api_token("test-token")
            .base_url("http://localhost:1")
            .timeout(Duration::from_secs(5))
            .chat(slot)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_build_with_custom_detector() {
        let (_installer, slot) = ChatSlot::pending();
        let controller = UploadController::builder()
            .detector(Arc::new(NoIngredients))
            .max_dimensions(128, 128)
            .jpeg_quality(70)
            .chat(slot)
            .build()
            .unwrap();
        assert!(!controller.snapshot().is_loading());
    }
}
