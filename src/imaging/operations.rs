//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::fit_within;
use super::params::{CompressParams, Quality};
use crate::asset::ImageAsset;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, asset: &ImageAsset) -> Result<(u32, u32)> {
    let dims = backend.identify(&asset.bytes)?;
    Ok((dims.width, dims.height))
}

/// Bounds and quality for one compression pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            quality: Quality::default(),
        }
    }
}

/// Plan a compress operation without executing it.
pub fn plan_compress(original: (u32, u32), config: &CompressConfig) -> CompressParams {
    let (width, height) = fit_within(original, (config.max_width, config.max_height));
    CompressParams {
        width,
        height,
        quality: config.quality,
    }
}

/// Down-scale and re-encode an asset.
///
/// Returns a new asset with the same name. The MIME type is whatever the
/// backend actually wrote.
pub fn compress_image(
    backend: &impl ImageBackend,
    asset: &ImageAsset,
    config: &CompressConfig,
) -> Result<ImageAsset> {
    let original = get_dimensions(backend, asset)?;
    let params = plan_compress(original, config);
    let out = backend.compress(&params, &asset.bytes)?;

    tracing::debug!(
        name = %asset.name,
        from = ?original,
        to = ?(params.width, params.height),
        before_kb = asset.size() as f64 / 1024.0,
        after_kb = out.bytes.len() as f64 / 1024.0,
        "compressed image"
    );

    Ok(ImageAsset::new(
        asset.name.clone(),
        Some(out.mime.to_string()),
        out.bytes,
    ))
}
