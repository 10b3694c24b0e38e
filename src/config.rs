//! Configuration module.
//!
//! Handles loading, validating, and merging `wardrobe.toml`. Stock defaults
//! are the base layer; a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_requests = 3          # Transform requests allowed per window
//! window_secs = 120         # Sliding window length
//!
//! [upload]
//! max_file_size = 10485760  # 10 MiB
//! supported_formats = ["image/jpeg", "image/png", "image/webp"]
//!
//! [compression]
//! max_width = 1024
//! max_height = 1024
//! quality = 85              # JPEG quality (1-100)
//!
//! [service]
//! base_url = "https://fal.run"
//! model_id = "fal-ai/nano-banana/edit"
//! timeout_secs = 60
//! output_format = "jpeg"
//! num_images = 1
//! enable_safety_checker = false
//! credential_env = "FAL_KEY"  # Environment variable holding the API key
//! ```
//!
//! The API key itself never goes in this file. Unknown keys are rejected to
//! catch typos early.

use crate::imaging::{CompressConfig, Quality};
use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration loaded from `wardrobe.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WardrobeConfig {
    /// Request admission (sliding window).
    pub limits: LimitsConfig,
    /// What uploads are accepted.
    pub upload: UploadConfig,
    /// Down-scaling applied before upload.
    pub compression: CompressionConfig,
    /// Remote edit service.
    pub service: ServiceConfig,
}

impl WardrobeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_requests == 0 {
            return Err(ConfigError::Validation(
                "limits.max_requests must be positive".into(),
            ));
        }
        if self.limits.window_secs == 0 {
            return Err(ConfigError::Validation(
                "limits.window_secs must be positive".into(),
            ));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "upload.max_file_size must be positive".into(),
            ));
        }
        if self.upload.supported_formats.is_empty() {
            return Err(ConfigError::Validation(
                "upload.supported_formats must not be empty".into(),
            ));
        }
        if self.compression.max_width == 0 || self.compression.max_height == 0 {
            return Err(ConfigError::Validation(
                "compression.max_width and max_height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.compression.quality) {
            return Err(ConfigError::Validation(
                "compression.quality must be 1-100".into(),
            ));
        }
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "service.timeout_secs must be positive".into(),
            ));
        }
        if self.service.num_images == 0 {
            return Err(ConfigError::Validation(
                "service.num_images must be positive".into(),
            ));
        }
        if self.service.credential_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "service.credential_env must name an environment variable".into(),
            ));
        }
        Ok(())
    }
}

/// Sliding-window admission settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window_secs: 120,
        }
    }
}

impl LimitsConfig {
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.max_requests, Duration::from_secs(self.window_secs))
    }
}

/// Upload acceptance rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes.
    pub max_file_size: u64,
    /// Accepted MIME types.
    pub supported_formats: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            supported_formats: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        }
    }
}

/// Pre-upload compression bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            quality: 85,
        }
    }
}

impl CompressionConfig {
    pub fn compress(&self) -> CompressConfig {
        CompressConfig {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: Quality::new(self.quality),
        }
    }
}

/// Remote edit service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub base_url: String,
    pub model_id: String,
    pub timeout_secs: u64,
    /// Default output format ("jpeg" or "png").
    pub output_format: String,
    pub num_images: u32,
    pub enable_safety_checker: bool,
    /// Name of the environment variable holding the API key.
    pub credential_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fal.run".to_string(),
            model_id: "fal-ai/nano-banana/edit".to_string(),
            timeout_secs: 60,
            output_format: "jpeg".to_string(),
            num_images: 1,
            enable_safety_checker: false,
            credential_env: "FAL_KEY".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full endpoint URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.model_id.trim_start_matches('/')
        )
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WardrobeConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<WardrobeConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WardrobeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file
/// is absent.
pub fn load_config(path: &Path) -> Result<WardrobeConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
    }
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `wardrobe.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Wardrobe Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Request admission
# ---------------------------------------------------------------------------
[limits]
# At most this many transform requests...
max_requests = 3
# ...within any sliding window of this many seconds.
window_secs = 120

# ---------------------------------------------------------------------------
# Uploads
# ---------------------------------------------------------------------------
[upload]
# Largest accepted photo, in bytes (10 MiB).
max_file_size = 10485760

# Accepted MIME types. Files without a declared type are matched by extension.
supported_formats = ["image/jpeg", "image/png", "image/webp"]

# ---------------------------------------------------------------------------
# Compression before upload
# ---------------------------------------------------------------------------
[compression]
# Photos are scaled down (never up) to fit inside this box.
max_width = 1024
max_height = 1024

# JPEG quality (1 = worst, 100 = best). PNG stays lossless; WebP becomes JPEG.
quality = 85

# ---------------------------------------------------------------------------
# Edit service
# ---------------------------------------------------------------------------
[service]
base_url = "https://fal.run"
model_id = "fal-ai/nano-banana/edit"

# Give up on a request after this many seconds.
timeout_secs = 60

# Result format ("jpeg" or "png"). `--quality high` asks for png.
output_format = "jpeg"
num_images = 1
enable_safety_checker = false

# Environment variable that holds the API key. A .env file is also read.
credential_env = "FAL_KEY"
"##
}
