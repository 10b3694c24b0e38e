//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::ImageReader::with_guessed_format` (magic bytes) |
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, best compression |
//!
//! The output format follows the decoded content, so a PNG uploaded with a
//! `.jpg` name comes back as PNG. WebP input is transcoded to JPEG: the
//! `image` crate only encodes lossless WebP, which would ignore quality.
//!
//! JPEG input must end its last scan with an end-of-image marker. The
//! decoder fills missing rows of a truncated file with grey instead of
//! failing.

use super::backend::{BackendError, Compressed, Dimensions, ImageBackend};
use super::params::CompressParams;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Formats whose decoders and encoders are compiled in, with the extension
/// and MIME type each is known by.
const SUPPORTED: &[(&str, ImageFormat, &str)] = &[
    ("jpg", ImageFormat::Jpeg, "image/jpeg"),
    ("jpeg", ImageFormat::Jpeg, "image/jpeg"),
    ("png", ImageFormat::Png, "image/png"),
    ("webp", ImageFormat::WebP, "image/webp"),
];

/// Map a file extension (case-insensitive, without the dot) to its MIME type.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    SUPPORTED
        .iter()
        .find(|(e, _, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, _, mime)| *mime)
}

fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    SUPPORTED
        .iter()
        .find(|(_, f, _)| *f == format)
        .map(|(_, _, mime)| *mime)
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// True when an end-of-image marker follows the last start-of-scan.
///
/// Entropy-coded data never contains a bare `FF D9` or `FF DA`, and an
/// embedded EXIF thumbnail sits before the main scan, so only a complete
/// main image passes. Trailing bytes after EOI are allowed.
fn jpeg_is_complete(data: &[u8]) -> bool {
    let last_marker = |marker: u8| data.windows(2).rposition(|w| w[0] == 0xFF && w[1] == marker);
    match (last_marker(0xDA), last_marker(0xD9)) {
        (Some(sos), Some(eoi)) => eoi > sos,
        _ => false,
    }
}

/// Decode an in-memory image, returning it with its sniffed format.
fn load_image(data: &[u8]) -> Result<(DynamicImage, ImageFormat), BackendError> {
    let reader = reader(data)?;
    let format = reader
        .format()
        .ok_or_else(|| BackendError::Decode("unrecognized image format".into()))?;
    if format == ImageFormat::Jpeg && !jpeg_is_complete(data) {
        return Err(BackendError::Decode(
            "JPEG data is truncated (no end-of-image marker)".into(),
        ));
    }
    let img = reader
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok((img, format))
}

/// Format written for a given input format.
fn output_format(input: ImageFormat) -> ImageFormat {
    match input {
        ImageFormat::WebP => ImageFormat::Jpeg,
        other => other,
    }
}

/// Encode `img` as JPEG or PNG.
fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
    quality: u32,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality as u8))
        }
        ImageFormat::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            &mut buf,
            CompressionType::Best,
            PngFilter::Adaptive,
        )),
        other => {
            return Err(BackendError::Encode(format!(
                "unsupported output format: {other:?}"
            )));
        }
    };
    result.map_err(|e| BackendError::Encode(e.to_string()))?;

    if buf.is_empty() {
        return Err(BackendError::EmptyOutput);
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(data)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn compress(&self, params: &CompressParams, data: &[u8]) -> Result<Compressed, BackendError> {
        let (img, input) = load_image(data)?;
        if mime_for_format(input).is_none() {
            return Err(BackendError::Decode(format!(
                "unsupported input format: {input:?}"
            )));
        }
        let format = output_format(input);

        let img = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };

        let bytes = encode_image(&img, format, params.quality.value())?;
        let mime = mime_for_format(format).unwrap_or("image/jpeg");
        Ok(Compressed { bytes, mime })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{synthetic_jpeg, synthetic_png};

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("Png"), Some("image/png"));
        assert_eq!(mime_for_extension("webp"), Some("image/webp"));
        assert_eq!(mime_for_extension("gif"), None);
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let data = synthetic_jpeg(200, 150);
        let dims = RustBackend::new().identify(&data).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn identify_garbage_errors() {
        let result = RustBackend::new().identify(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn compress_resizes_jpeg() {
        let data = synthetic_jpeg(400, 300);
        let backend = RustBackend::new();
        let out = backend
            .compress(
                &CompressParams {
                    width: 200,
                    height: 150,
                    quality: Quality::new(85),
                },
                &data,
            )
            .unwrap();

        assert_eq!(out.mime, "image/jpeg");
        let dims = backend.identify(&out.bytes).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn compress_keeps_png_as_png() {
        let data = synthetic_png(64, 32);
        let out = RustBackend::new()
            .compress(
                &CompressParams {
                    width: 32,
                    height: 16,
                    quality: Quality::new(85),
                },
                &data,
            )
            .unwrap();
        assert_eq!(out.mime, "image/png");
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Png);
    }

    fn synthetic_webp(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                (x * 7 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x ^ y) % 256) as u8,
                255,
            ])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(&mut out))
            .unwrap();
        out
    }

    #[test]
    fn compress_transcodes_webp_to_jpeg() {
        let webp = synthetic_webp(40, 20);
        let backend = RustBackend::new();
        let out = backend
            .compress(
                &CompressParams {
                    width: 20,
                    height: 10,
                    quality: Quality::new(85),
                },
                &webp,
            )
            .unwrap();
        assert_eq!(out.mime, "image/jpeg");
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(
            backend.identify(&out.bytes).unwrap(),
            Dimensions { width: 20, height: 10 }
        );
    }

    #[test]
    fn webp_output_shrinks_with_quality() {
        let webp = synthetic_webp(300, 200);
        let backend = RustBackend::new();
        let params = |q| CompressParams {
            width: 300,
            height: 200,
            quality: Quality::new(q),
        };
        let high = backend.compress(&params(100), &webp).unwrap();
        let low = backend.compress(&params(10), &webp).unwrap();
        assert!(low.bytes.len() < high.bytes.len());
    }

    #[test]
    fn compress_truncated_jpeg_errors() {
        let data = synthetic_jpeg(100, 100);
        let truncated = &data[..data.len() / 3];
        let result = RustBackend::new().compress(
            &CompressParams {
                width: 50,
                height: 50,
                quality: Quality::new(85),
            },
            truncated,
        );
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn jpeg_completeness_check() {
        let data = synthetic_jpeg(64, 64);
        assert!(jpeg_is_complete(&data));
        // Trailing bytes after EOI are tolerated
        let mut padded = data.clone();
        padded.extend_from_slice(&[0, 0, 0, 0]);
        assert!(jpeg_is_complete(&padded));
        assert!(!jpeg_is_complete(&data[..data.len() - 2]));
        assert!(!jpeg_is_complete(&data[..data.len() / 2]));
    }

    #[test]
    fn lower_quality_yields_smaller_jpeg() {
        let data = synthetic_jpeg(300, 300);
        let backend = RustBackend::new();
        let params = |q| CompressParams {
            width: 300,
            height: 300,
            quality: Quality::new(q),
        };
        let high = backend.compress(&params(95), &data).unwrap();
        let low = backend.compress(&params(20), &data).unwrap();
        assert!(low.bytes.len() < high.bytes.len());
    }
}
