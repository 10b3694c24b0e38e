//! Image assets and upload validation.
//!
//! An [`ImageAsset`] is the unit every stage passes along: a name, an
//! optional declared MIME type, and the raw bytes. Stages never mutate an
//! asset in place; compression produces a new one.
//!
//! Validation checks only what is cheap and local (presence, size, declared
//! type). Whether the bytes actually decode is discovered by the
//! compression step, which sniffs the content itself.

use crate::config::UploadConfig;
use crate::imaging::mime_for_extension;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("no image provided")]
    Missing,
    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A binary image payload plus the metadata an upload carries.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub name: String,
    /// MIME type as reported by whoever produced the asset. May be absent.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes,
        }
    }

    /// Read a file from disk. The MIME type is left undeclared, so it is
    /// resolved from the extension.
    pub fn from_path(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, None, bytes))
    }

    /// Byte size of the payload.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The declared MIME type, or one sniffed from the name's extension
    /// when nothing (or an empty string) was declared.
    pub fn mime_type(&self) -> Option<&str> {
        match self.mime.as_deref() {
            Some(m) if !m.trim().is_empty() => Some(m.trim()),
            _ => Path::new(&self.name)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(mime_for_extension),
        }
    }
}

// Keep multi-megabyte payloads out of debug output and logs.
impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Check an upload against the size cap and the type allow-list.
pub fn check_image_file(
    asset: Option<&ImageAsset>,
    upload: &UploadConfig,
) -> Result<(), AssetError> {
    let asset = asset.ok_or(AssetError::Missing)?;

    if asset.size() > upload.max_file_size {
        return Err(AssetError::TooLarge {
            size: asset.size(),
            max: upload.max_file_size,
        });
    }

    let mime = asset
        .mime_type()
        .ok_or_else(|| AssetError::UnsupportedType(format!("unknown ({})", asset.name)))?;
    if !upload
        .supported_formats
        .iter()
        .any(|f| f.eq_ignore_ascii_case(mime))
    {
        return Err(AssetError::UnsupportedType(mime.to_string()));
    }

    Ok(())
}

/// Predicate form of [`check_image_file`].
pub fn validate_image_file(asset: Option<&ImageAsset>, upload: &UploadConfig) -> bool {
    match check_image_file(asset, upload) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "image rejected");
            false
        }
    }
}
