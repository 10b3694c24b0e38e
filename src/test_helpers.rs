//! Shared test utilities for the wardrobe test suite.
//!
//! Provides synthetic image fixtures and a scriptable [`MockService`] that
//! stands in for the remote edit endpoint.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let person = synthetic_jpeg(1600, 1200);
//! let service = MockService::new(MockBehavior::Respond(json!({ "images": [ { "url": "x" } ] })));
//! // ... hand `service` to a Transformer ...
//! assert_eq!(service.call_count(), 1);
//! ```

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbImage};
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::service::{Credential, EditRequest, EditService, ServiceError};

// =========================================================================
// Image fixtures
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// A valid JPEG of the given size.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A valid PNG of the given size.
pub fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

// =========================================================================
// Mock edit service
// =========================================================================

/// What a [`MockService`] does on every call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this payload immediately.
    Respond(Value),
    /// Sleep, then return the payload.
    Delay(Duration, Value),
    /// Reject with an HTTP status and body.
    Fail(u16, String),
    /// Fail at the transport layer.
    TransportError,
    /// Succeed with a body that is not JSON.
    NotJson,
    /// Never answer.
    Hang,
}

/// Records every request and answers according to its [`MockBehavior`].
pub struct MockService {
    behavior: MockBehavior,
    calls: AtomicUsize,
    requests: Mutex<Vec<EditRequest>>,
}

impl MockService {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<EditRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EditService for MockService {
    async fn edit(
        &self,
        _credential: &Credential,
        request: &EditRequest,
    ) -> Result<Value, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match &self.behavior {
            MockBehavior::Respond(payload) => Ok(payload.clone()),
            MockBehavior::Delay(delay, payload) => {
                tokio::time::sleep(*delay).await;
                Ok(payload.clone())
            }
            MockBehavior::Fail(status, body) => Err(ServiceError::Rejected {
                status: *status,
                body: body.clone(),
            }),
            MockBehavior::TransportError => Err(ServiceError::Transport(
                "error sending request: connection refused".into(),
            )),
            MockBehavior::NotJson => Err(ServiceError::InvalidBody(
                "expected value at line 1 column 1".into(),
            )),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
