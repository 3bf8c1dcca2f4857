//! Downscale and re-encode a user photo before upload.
//!
//! The segmentation service is billed per request and is slow on large
//! payloads, so every upload goes through here first: decode whatever the
//! user picked, shrink it to fit the configured box, write it back out as
//! JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use log::{debug, warn};

use crate::config::ImageConfig;
use crate::error::PipelineError;
use crate::model::{ImageAsset, ProcessedImage};

/// JPEG quality on the encoder's 1–100 scale (0.8 on a 0–1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Encoded images above this size are logged; they are still uploaded.
pub const SIZE_WARNING_BYTES: usize = 1024 * 1024;

/// Preprocess with the default quality and size warning threshold.
pub fn preprocess(
    asset: &ImageAsset,
    max_width: u32,
    max_height: u32,
) -> Result<ProcessedImage, PipelineError> {
    encode_scaled(
        asset,
        max_width,
        max_height,
        DEFAULT_JPEG_QUALITY,
        SIZE_WARNING_BYTES,
    )
}

/// Preprocess using the bounds and quality from configuration.
pub fn preprocess_with(
    asset: &ImageAsset,
    config: &ImageConfig,
) -> Result<ProcessedImage, PipelineError> {
    encode_scaled(
        asset,
        config.max_width,
        config.max_height,
        config.jpeg_quality,
        config.size_warning_bytes,
    )
}

fn encode_scaled(
    asset: &ImageAsset,
    max_width: u32,
    max_height: u32,
    quality: u8,
    warn_above: usize,
) -> Result<ProcessedImage, PipelineError> {
    let img = image::load_from_memory(&asset.bytes).map_err(|e| {
        PipelineError::Decode(format!(
            "{} ({}): {}",
            asset.file_name, asset.media_type, e
        ))
    })?;

    let (width, height) = target_dimensions(img.width(), img.height(), max_width, max_height);
    debug!(
        "Scaling {} from {}x{} to {}x{}",
        asset.file_name,
        img.width(),
        img.height(),
        width,
        height
    );

    let img = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode_image(&rgb).map_err(PipelineError::Encode)?;

    if bytes.len() > warn_above {
        warn!(
            "Image still larger than {} bytes after compression ({} bytes), quality may need adjustment",
            warn_above,
            bytes.len()
        );
    }

    Ok(ProcessedImage {
        bytes,
        width,
        height,
        file_name: asset.file_name.clone(),
    })
}

/// Output size for an image of `width`x`height` fitted into the bounds.
///
/// Landscape and square images are bounded by `max_width` first, portrait
/// ones by `max_height`. If the other side still overflows its own bound
/// (possible when the bounds differ) the image is scaled again by that
/// bound, so both sides always end up inside the box. Images already inside
/// the bounds are never upscaled. Fractional results are truncated and never
/// drop below one pixel.
pub fn target_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let max_width = max_width.max(1);
    let max_height = max_height.max(1);
    let (mut width, mut height) = (width, height);

    if width >= height {
        if width > max_width {
            height = scale(height, max_width, width);
            width = max_width;
        }
    } else if height > max_height {
        width = scale(width, max_height, height);
        height = max_height;
    }

    if height > max_height {
        width = scale(width, max_height, height);
        height = max_height;
    }
    if width > max_width {
        height = scale(height, max_width, width);
        width = max_width;
    }

    (width, height)
}

fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(numerator) / u64::from(denominator);
    (scaled as u32).max(1)
}
