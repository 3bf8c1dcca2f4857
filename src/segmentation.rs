use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::SegmentationConfig;
use crate::error::PipelineError;
use crate::model::{IngredientSet, ProcessedImage};

const SEGMENTATION_PATH: &str = "/v2/image/segmentation/complete/v1.0";

/// Turns a preprocessed photo into the ingredients visible in it
#[async_trait]
pub trait IngredientDetector: Send + Sync {
    async fn extract_ingredients(
        &self,
        image: &ProcessedImage,
    ) -> Result<IngredientSet, PipelineError>;
}

/// Client for the LogMeal food segmentation endpoint
pub struct LogMealClient {
    client: Client,
    api_token: String,
    base_url: String,
    language: String,
}

impl LogMealClient {
    /// Create a new client from configuration
    pub fn new(config: &SegmentationConfig) -> Result<Self, PipelineError> {
        Self::with_token(config, config.resolve_token())
    }

    fn with_token(config: &SegmentationConfig, token: Option<String>) -> Result<Self, PipelineError> {
        let api_token = token.ok_or(PipelineError::MissingToken)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(LogMealClient {
            client,
            api_token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_token: String, base_url: String) -> Self {
        LogMealClient {
            client: Client::new(),
            api_token,
            base_url,
            language: "eng".to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}?language={}",
            self.base_url, SEGMENTATION_PATH, self.language
        )
    }
}

#[async_trait]
impl IngredientDetector for LogMealClient {
    async fn extract_ingredients(
        &self,
        image: &ProcessedImage,
    ) -> Result<IngredientSet, PipelineError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(ProcessedImage::MEDIA_TYPE)?;
        let form = Form::new().part("image", part);

        debug!(
            "Uploading {} ({} bytes) for segmentation",
            image.file_name,
            image.bytes.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Segmentation response: {}", body);

        let ingredients = parse_segmentation_response(&body);
        info!("Detected {} ingredient(s)", ingredients.len());
        Ok(ingredients)
    }
}

/// Pull the top recognition candidate out of every segmented region.
///
/// Unparseable bodies, a missing `segmentation_results` list, and regions
/// without a named candidate all degrade to fewer (or zero) ingredients
/// instead of failing the upload.
pub fn parse_segmentation_response(body: &str) -> IngredientSet {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            warn!("Segmentation response is not valid JSON: {}", e);
            return IngredientSet::new();
        }
    };

    let Some(regions) = json["segmentation_results"].as_array() else {
        warn!("Segmentation response has no segmentation_results list");
        return IngredientSet::new();
    };

    regions
        .iter()
        .filter_map(|region| {
            let name = region["recognition_results"][0]["name"].as_str();
            if name.is_none() {
                debug!("Skipping region without a recognition candidate: {}", region);
            }
            name
        })
        .collect()
}
