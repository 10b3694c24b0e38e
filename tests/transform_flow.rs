//! End-to-end transform flow through the public API.
//!
//! Uses the real pure-Rust imaging backend and a manual clock; only the
//! remote edit service is replaced by an in-process fake.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, RgbImage};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wardrobe::asset::ImageAsset;
use wardrobe::config::{WardrobeConfig, resolve_config, stock_defaults_value};
use wardrobe::encoding::from_data_uri;
use wardrobe::error::ErrorCategory;
use wardrobe::imaging::{ImageBackend, RustBackend};
use wardrobe::rate_limit::{ManualClock, RateLimiter};
use wardrobe::response::ResponseShape;
use wardrobe::service::{Credential, EditRequest, EditService, ServiceError};
use wardrobe::transform::{TransformOptions, Transformer};

/// Answers every call with the payload and keeps the requests it saw.
struct FakeService {
    payload: Value,
    calls: AtomicUsize,
    seen: Mutex<Vec<EditRequest>>,
}

impl FakeService {
    fn new(payload: Value) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EditService for FakeService {
    async fn edit(
        &self,
        _credential: &Credential,
        request: &EditRequest,
    ) -> Result<Value, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.payload.clone())
    }
}

fn photo(name: &str, width: u32, height: u32) -> ImageAsset {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 92)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    ImageAsset::new(name, Some("image/jpeg".into()), bytes)
}

fn config_with(overlay: &str) -> WardrobeConfig {
    let overlay: toml::Value = toml::from_str(overlay).unwrap();
    resolve_config(stock_defaults_value().unwrap(), Some(overlay)).unwrap()
}

#[tokio::test]
async fn uploads_are_bounded_and_ordered() {
    let config = config_with("[compression]\nmax_width = 512\nmax_height = 512\n");
    let clock = ManualClock::default();
    let limiter = Arc::new(RateLimiter::with_clock(config.limits.rate_limit(), clock));
    let transformer = Transformer::new(
        config,
        limiter,
        Arc::new(RustBackend::new()),
        FakeService::new(json!({ "images": [ { "url": "https://cdn.example/out.jpg" } ] })),
        Credential::new("test-key"),
    );

    let person = photo("person.jpg", 1200, 1600);
    let garment = photo("garment.jpg", 900, 300);
    let outcome = transformer
        .transform(Some(&person), Some(&garment), &TransformOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.image, "https://cdn.example/out.jpg");
    assert_eq!(outcome.shape, ResponseShape::Images);

    let seen = transformer.service().seen.lock().unwrap().clone();
    let request = &seen[0];
    assert_eq!(request.image_urls.len(), 2);

    let backend = RustBackend::new();
    let sent_garment = from_data_uri(&request.image_urls[0], "g").unwrap();
    let sent_person = from_data_uri(&request.image_urls[1], "p").unwrap();

    let g = backend.identify(&sent_garment.bytes).unwrap();
    let p = backend.identify(&sent_person.bytes).unwrap();
    assert_eq!((g.width, g.height), (512, 171));
    assert_eq!((p.width, p.height), (384, 512));
}

#[tokio::test]
async fn window_reopens_after_it_elapses() {
    let config = config_with("[limits]\nmax_requests = 2\nwindow_secs = 60\n");
    let clock = ManualClock::default();
    let limiter = Arc::new(RateLimiter::with_clock(
        config.limits.rate_limit(),
        clock.clone(),
    ));
    let transformer = Transformer::new(
        config,
        Arc::clone(&limiter),
        Arc::new(RustBackend::new()),
        FakeService::new(json!({ "data": { "image": "https://cdn.example/x.jpg" } })),
        Credential::new("test-key"),
    );
    let (person, garment) = (photo("p.jpg", 64, 64), photo("g.jpg", 64, 64));
    let opts = TransformOptions::default();

    for _ in 0..2 {
        transformer
            .transform(Some(&person), Some(&garment), &opts)
            .await
            .unwrap();
        clock.advance(Duration::from_secs(10));
    }

    let err = transformer
        .transform(Some(&person), Some(&garment), &opts)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::RateLimited);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(40)));
    assert!(!transformer.availability().is_available());

    clock.advance(Duration::from_secs(40));
    assert_eq!(limiter.remaining_requests(), 1);
    let outcome = transformer
        .transform(Some(&person), Some(&garment), &opts)
        .await
        .unwrap();
    assert_eq!(outcome.shape, ResponseShape::DataImage);
    assert_eq!(transformer.service().calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn oversized_upload_is_rejected_locally() {
    let config = config_with("[upload]\nmax_file_size = 1024\n");
    let transformer = Transformer::new(
        config,
        Arc::new(RateLimiter::new(Default::default())),
        Arc::new(RustBackend::new()),
        FakeService::new(json!({})),
        Credential::new("test-key"),
    );

    let big = photo("big.jpg", 400, 400);
    assert!(big.size() > 1024);
    let err = transformer
        .transform(Some(&big), Some(&photo("g.jpg", 8, 8)), &TransformOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(!err.is_retryable());
    assert_eq!(transformer.service().calls.load(Ordering::SeqCst), 0);
    assert_eq!(transformer.limiter().remaining_requests(), 3);
}
