//! Transport encoding: images as base64 `data:` URIs.
//!
//! The edit service takes image references as URLs, and a `data:` URI is
//! the one kind of URL that needs no separate upload. This step is
//! lossless; only compression changes pixels.

use crate::asset::ImageAsset;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// MIME type assumed for bare base64 payloads with no `data:` header.
const DEFAULT_MIME: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("data URI is not base64-encoded")]
    NotBase64Uri,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Encode an asset as `data:<mime>;base64,<payload>`.
pub fn to_data_uri(asset: &ImageAsset) -> String {
    let mime = asset.mime_type().unwrap_or(DEFAULT_MIME);
    format!("data:{mime};base64,{}", STANDARD.encode(&asset.bytes))
}

/// Decode a `data:` URI (or a bare base64 payload) back into an asset.
pub fn from_data_uri(uri: &str, name: &str) -> Result<ImageAsset, EncodingError> {
    let uri = uri.trim();
    let (mime, payload) = match uri.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or(EncodingError::NotBase64Uri)?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or(EncodingError::NotBase64Uri)?;
            let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
            (mime, payload)
        }
        None => (DEFAULT_MIME, uri),
    };

    let bytes = STANDARD.decode(payload)?;
    Ok(ImageAsset::new(name, Some(mime.to_string()), bytes))
}
