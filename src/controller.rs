//! Upload flow: preprocess, detect ingredients, suggest dishes.
//!
//! Each upload gets a sequence number. Only the most recently started
//! upload may write to the shared [`UploadView`]; older runs notice they
//! were overtaken at their next stage boundary and stop with
//! [`PipelineError::Superseded`]. In-flight HTTP calls of an overtaken run
//! are not cancelled, their results are simply dropped.

use log::{error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::ImageConfig;
use crate::error::PipelineError;
use crate::model::{ImageAsset, IngredientSet, RecipeName};
use crate::preprocess::preprocess_with;
use crate::providers::ChatSlot;
use crate::segmentation::IngredientDetector;
use crate::suggest::suggest_with;

/// Shown to the user for any failure; the cause goes to the log.
pub const GENERIC_ERROR_MESSAGE: &str = "Failed to recognize ingredients or fetch recipes.";

pub const DETECTING_MESSAGE: &str = "Detecting ingredients...";
pub const SUGGESTING_MESSAGE: &str = "Fetching recipe suggestions...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FlowState {
    #[default]
    Idle,
    Preprocessing,
    Extracting,
    SuggestingRecipes,
}

/// What a front-end renders: the latest upload's progress and results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadView {
    pub state: FlowState,
    /// Sequence number of the upload this view belongs to, 0 before any
    pub sequence: u64,
    pub file_name: Option<String>,
    pub ingredients: IngredientSet,
    pub recipes: Vec<RecipeName>,
    pub loading_message: Option<String>,
    pub error: Option<String>,
}

impl UploadView {
    pub fn is_loading(&self) -> bool {
        self.state != FlowState::Idle
    }
}

/// Results of one finished upload, returned to whoever started it.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub sequence: u64,
    pub ingredients: IngredientSet,
    pub recipes: Vec<RecipeName>,
}

pub struct UploadController {
    detector: Arc<dyn IngredientDetector>,
    chat: ChatSlot,
    image: ImageConfig,
    latest: AtomicU64,
    view: Mutex<UploadView>,
}

impl UploadController {
    pub fn new(detector: Arc<dyn IngredientDetector>, chat: ChatSlot, image: ImageConfig) -> Self {
        UploadController {
            detector,
            chat,
            image,
            latest: AtomicU64::new(0),
            view: Mutex::new(UploadView::default()),
        }
    }

    /// Copy of the current view.
    pub fn snapshot(&self) -> UploadView {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one upload through the whole pipeline.
    ///
    /// Errors are logged and reported in the view as
    /// [`GENERIC_ERROR_MESSAGE`]; the returned error carries the detail.
    /// Ingredients found before a later stage failed stay in the view.
    pub async fn handle_upload(&self, asset: ImageAsset) -> Result<UploadReport, PipelineError> {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Upload #{}: {}", sequence, asset.file_name);

        let file_name = asset.file_name.clone();
        let started = self.apply(sequence, |view| {
            *view = UploadView {
                state: FlowState::Preprocessing,
                sequence,
                file_name: Some(file_name),
                loading_message: Some(DETECTING_MESSAGE.to_string()),
                ..Default::default()
            };
        });

        let result = match started {
            Ok(()) => self.run(sequence, asset).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                let _ = self.apply(sequence, finish);
                Ok(report)
            }
            Err(PipelineError::Superseded { sequence }) => {
                warn!("Upload #{} was superseded, discarding its results", sequence);
                Err(PipelineError::Superseded { sequence })
            }
            Err(e) => {
                error!("Upload #{} failed: {}", sequence, e);
                let _ = self.apply(sequence, |view| {
                    finish(view);
                    view.error = Some(GENERIC_ERROR_MESSAGE.to_string());
                });
                Err(e)
            }
        }
    }

    async fn run(&self, sequence: u64, asset: ImageAsset) -> Result<UploadReport, PipelineError> {
        // Decode and resize are CPU-bound
        let image = self.image.clone();
        let processed = tokio::task::spawn_blocking(move || preprocess_with(&asset, &image))
            .await
            .map_err(|e| PipelineError::Internal(format!("Preprocessing task panicked: {}", e)))??;
        self.apply(sequence, |view| view.state = FlowState::Extracting)?;

        let ingredients = self.detector.extract_ingredients(&processed).await?;
        drop(processed);
        self.apply(sequence, |view| view.ingredients = ingredients.clone())?;

        if ingredients.is_empty() {
            info!("Upload #{}: no ingredients detected", sequence);
            return Ok(UploadReport {
                sequence,
                ingredients,
                recipes: Vec::new(),
            });
        }

        self.apply(sequence, |view| {
            view.state = FlowState::SuggestingRecipes;
            view.loading_message = Some(SUGGESTING_MESSAGE.to_string());
        })?;

        let capability = self.chat.ready().await?;
        let recipes = suggest_with(&ingredients, capability.as_ref()).await?;
        self.apply(sequence, |view| view.recipes = recipes.clone())?;

        Ok(UploadReport {
            sequence,
            ingredients,
            recipes,
        })
    }

    /// Mutate the view if `sequence` is still the latest upload.
    fn apply(
        &self,
        sequence: u64,
        update: impl FnOnce(&mut UploadView),
    ) -> Result<(), PipelineError> {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        if self.latest.load(Ordering::SeqCst) != sequence {
            return Err(PipelineError::Superseded { sequence });
        }
        update(&mut view);
        Ok(())
    }
}

fn finish(view: &mut UploadView) {
    view.state = FlowState::Idle;
    view.loading_message = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessedImage;
    use crate::providers::{ChatCapability, ChatReply};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::error::Error;
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;

    struct FixedDetector(Vec<&'static str>);

    #[async_trait]
    impl IngredientDetector for FixedDetector {
        async fn extract_ingredients(
            &self,
            _image: &ProcessedImage,
        ) -> Result<IngredientSet, PipelineError> {
            Ok(self.0.iter().copied().collect())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl IngredientDetector for FailingDetector {
        async fn extract_ingredients(
            &self,
            _image: &ProcessedImage,
        ) -> Result<IngredientSet, PipelineError> {
            Err(PipelineError::Http { status: 500 })
        }
    }

    #[derive(Default)]
    struct CountingChat {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatCapability for CountingChat {
        fn provider_name(&self) -> &str {
            "counting"
        }

        async fn chat(&self, _prompt: &str) -> Result<ChatReply, Box<dyn Error + Send + Sync>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatReply::text("Omelette\nFrittata"))
        }
    }

    struct BrokenChat;

    #[async_trait]
    impl ChatCapability for BrokenChat {
        fn provider_name(&self) -> &str {
            "broken"
        }

        async fn chat(&self, _prompt: &str) -> Result<ChatReply, Box<dyn Error + Send + Sync>> {
            Err("connection reset".into())
        }
    }

    fn photo() -> ImageAsset {
        photo_sized(32, 24)
    }

    fn photo_sized(width: u32, height: u32) -> ImageAsset {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 160, 60])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        ImageAsset::new(buf, "image/png", "salad.png")
    }

    #[test]
    fn test_initial_view_is_idle() {
        let controller = UploadController::new(
            Arc::new(FixedDetector(vec![])),
            ChatSlot::pending().1,
            ImageConfig::default(),
        );
        let view = controller.snapshot();
        assert_eq!(view.state, FlowState::Idle);
        assert!(!view.is_loading());
        assert_eq!(view.sequence, 0);
    }

    #[tokio::test]
    async fn test_full_run_populates_view() {
        let chat = Arc::new(CountingChat::default());
        let controller = UploadController::new(
            Arc::new(FixedDetector(vec!["egg", "egg", "cheese"])),
            ChatSlot::installed(chat.clone()),
            ImageConfig::default(),
        );

        let report = controller.handle_upload(photo()).await.unwrap();
        assert_eq!(report.sequence, 1);
        assert_eq!(report.ingredients.as_slice(), ["egg", "cheese"]);
        assert_eq!(report.recipes, vec!["Omelette", "Frittata"]);

        let view = controller.snapshot();
        assert_eq!(view.state, FlowState::Idle);
        assert_eq!(view.file_name.as_deref(), Some("salad.png"));
        assert_eq!(view.recipes, vec!["Omelette", "Frittata"]);
        assert!(view.loading_message.is_none());
        assert!(view.error.is_none());
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_ingredients_skips_chat() {
        let chat = Arc::new(CountingChat::default());
        let controller = UploadController::new(
            Arc::new(FixedDetector(vec![])),
            ChatSlot::installed(chat.clone()),
            ImageConfig::default(),
        );

        let report = controller.handle_upload(photo()).await.unwrap();
        assert!(report.ingredients.is_empty());
        assert!(report.recipes.is_empty());
        assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
        assert!(controller.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_chat_failure_keeps_ingredients() {
        let controller = UploadController::new(
            Arc::new(FixedDetector(vec!["bread"])),
            ChatSlot::installed(Arc::new(BrokenChat)),
            ImageConfig::default(),
        );

        let result = controller.handle_upload(photo()).await;
        assert!(matches!(result, Err(PipelineError::Chat(_))));

        let view = controller.snapshot();
        assert_eq!(view.ingredients.as_slice(), ["bread"]);
        assert!(view.recipes.is_empty());
        assert_eq!(view.error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
        assert_eq!(view.state, FlowState::Idle);
    }

    #[tokio::test]
    async fn test_detector_failure_sets_generic_error() {
        let controller = UploadController::new(
            Arc::new(FailingDetector),
            ChatSlot::installed(Arc::new(CountingChat::default())),
            ImageConfig::default(),
        );

        let result = controller.handle_upload(photo()).await;
        assert!(matches!(result, Err(PipelineError::Http { status: 500 })));

        let view = controller.snapshot();
        assert!(view.ingredients.is_empty());
        assert!(view.recipes.is_empty());
        assert_eq!(view.error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_new_upload_clears_previous_error() {
        let controller = UploadController::new(
            Arc::new(FixedDetector(vec![])),
            ChatSlot::pending().1,
            ImageConfig::default(),
        );

        let broken = ImageAsset::new(b"nope".to_vec(), "image/png", "broken.png");
        assert!(matches!(
            controller.handle_upload(broken).await,
            Err(PipelineError::Decode(_))
        ));
        assert!(controller.snapshot().error.is_some());

        controller.handle_upload(photo()).await.unwrap();
        let view = controller.snapshot();
        assert!(view.error.is_none());
        assert_eq!(view.sequence, 2);
    }

    #[tokio::test]
    async fn test_waits_for_chat_capability() {
        let (installer, slot) = ChatSlot::pending();
        let controller = Arc::new(UploadController::new(
            Arc::new(FixedDetector(vec!["apple"])),
            slot,
            ImageConfig::default(),
        ));

        let upload = tokio::spawn({
            let controller = controller.clone();
            async move { controller.handle_upload(photo()).await }
        });

        // Let the run reach the readiness wait
        for _ in 0..100 {
            if controller.snapshot().state == FlowState::SuggestingRecipes {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let view = controller.snapshot();
        assert_eq!(view.state, FlowState::SuggestingRecipes);
        assert_eq!(view.loading_message.as_deref(), Some(SUGGESTING_MESSAGE));

        installer.install(Arc::new(CountingChat::default()));
        let report = upload.await.unwrap().unwrap();
        assert_eq!(report.recipes, vec!["Omelette", "Frittata"]);
    }

    #[tokio::test]
    async fn test_superseded_upload_does_not_touch_view() {
        let (installer, slot) = ChatSlot::pending();
        let controller = Arc::new(UploadController::new(
            Arc::new(FixedDetector(vec!["pear"])),
            slot,
            ImageConfig::default(),
        ));

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.handle_upload(photo()).await }
        });
        for _ in 0..100 {
            if controller.snapshot().state == FlowState::SuggestingRecipes {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let second = tokio::spawn({
            let controller = controller.clone();
            async move { controller.handle_upload(photo()).await }
        });
        for _ in 0..100 {
            if controller.snapshot().sequence == 2
                && controller.snapshot().state == FlowState::SuggestingRecipes
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        installer.install(Arc::new(CountingChat::default()));

        let first = first.await.unwrap();
        assert!(matches!(first, Err(PipelineError::Superseded { sequence: 1 })));
        let second = second.await.unwrap().unwrap();
        assert_eq!(second.sequence, 2);

        let view = controller.snapshot();
        assert_eq!(view.sequence, 2);
        assert_eq!(view.recipes, vec!["Omelette", "Frittata"]);
        assert!(view.error.is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_preprocessing_does_not_block_the_runtime() {
        let controller = Arc::new(UploadController::new(
            Arc::new(FixedDetector(vec!["lettuce"])),
            ChatSlot::installed(Arc::new(CountingChat::default())),
            ImageConfig::default(),
        ));

        let upload = tokio::spawn({
            let controller = controller.clone();
            async move { controller.handle_upload(photo_sized(3000, 2000)).await }
        });

        // On a single-threaded runtime this task only gets scheduled again
        // if the upload yielded while the image was being scaled
        tokio::task::yield_now().await;
        assert_eq!(controller.snapshot().state, FlowState::Preprocessing);
        assert!(!upload.is_finished());

        let report = upload.await.unwrap().unwrap();
        assert_eq!(report.ingredients.as_slice(), ["lettuce"]);
    }
}
