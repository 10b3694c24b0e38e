//! The transformation client.
//!
//! [`Transformer::transform`] turns a person photo, a garment photo and a
//! few options into one call to the edit service:
//!
//! ```text
//! Validating → RateChecking → Compressing → Encoding → Calling → Succeeded | Failed
//! ```
//!
//! Steps run strictly in that order. Validation and configuration problems
//! fail before any quota is spent or any byte leaves the machine. Admission
//! uses [`RateLimiter::try_acquire`], so concurrent transforms sharing a
//! limiter cannot over-admit. There is no automatic retry; the caller reads
//! [`TransformError::is_retryable`] and decides.
//!
//! Progress can be observed through an optional channel of
//! [`TransformEvent`]s. Events are advisory: a dropped receiver is ignored.

use crate::asset::{ImageAsset, check_image_file};
use crate::classify::classify;
use crate::config::WardrobeConfig;
use crate::encoding::to_data_uri;
use crate::error::{ErrorCategory, TransformError};
use crate::imaging::{ImageBackend, RustBackend, compress_image};
use crate::rate_limit::{Clock, RateLimiter, SystemClock, denial_message};
use crate::response::{ResponseShape, extract_image};
use crate::service::{Credential, EditRequest, EditService, ServiceError};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

const PROMPT_BASE: &str =
    "Make the clothing from the first image fit on the person from the second image.";
const PROMPT_PRESERVE_FACE: &str =
    "Keep the person's face, body pose, and background from the second image unchanged.";
const PROMPT_NATURAL: &str =
    "Only change the clothing to match the style, color, and design from the first image.";
const PROMPT_STYLIZED: &str =
    "Restyle the clothing after the first image and let its colors and mood carry into the lighting of the whole picture.";

const SUCCESS_MESSAGE: &str = "Outfit applied. This image was generated by the edit service.";

/// Requested output fidelity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QualityHint {
    /// Use the configured output format.
    #[default]
    Standard,
    /// Ask for lossless PNG output.
    High,
}

/// How strongly the garment's look is carried into the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BlendMode {
    /// Swap the clothing only.
    #[default]
    Natural,
    /// Let the garment's style tint the whole picture.
    Stylized,
}

/// Per-call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub quality: QualityHint,
    pub preserve_face: bool,
    pub blend: BlendMode,
    /// Fixed seed for reproducible output; random when absent.
    pub seed: Option<u64>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            quality: QualityHint::Standard,
            preserve_face: true,
            blend: BlendMode::Natural,
            seed: None,
        }
    }
}

/// Build the edit prompt for a set of options.
pub fn build_prompt(options: &TransformOptions) -> String {
    let mut parts = vec![PROMPT_BASE];
    if options.preserve_face {
        parts.push(PROMPT_PRESERVE_FACE);
    }
    parts.push(match options.blend {
        BlendMode::Natural => PROMPT_NATURAL,
        BlendMode::Stylized => PROMPT_STYLIZED,
    });
    parts.join(" ")
}

/// Which input an event or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Person,
    Garment,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Person => "person photo",
            Self::Garment => "garment photo",
        })
    }
}

/// Progress notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformEvent {
    Validating,
    RateChecking,
    Admitted {
        remaining: u32,
    },
    Compressing,
    Compressed {
        role: ImageRole,
        before: u64,
        after: u64,
    },
    Encoding,
    Calling,
    Succeeded {
        url: String,
    },
    Failed {
        category: ErrorCategory,
    },
}

/// A successful transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    /// URL (or `data:` URI) of the generated image.
    pub image: String,
    pub shape: ResponseShape,
    pub message: String,
}

/// Cheap liveness summary; never contacts the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub credential_present: bool,
    pub remaining_requests: u32,
    pub next_slot_in: Duration,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.credential_present && self.remaining_requests > 0
    }
}

/// Orchestrates one transform per call. Cheap to share behind `Arc`.
pub struct Transformer<S, B = RustBackend, C: Clock = SystemClock> {
    config: WardrobeConfig,
    limiter: Arc<RateLimiter<C>>,
    backend: Arc<B>,
    service: S,
    credential: Option<Credential>,
    events: Option<Sender<TransformEvent>>,
}

impl<S, B, C> Transformer<S, B, C>
where
    S: EditService,
    B: ImageBackend + 'static,
    C: Clock,
{
    pub fn new(
        config: WardrobeConfig,
        limiter: Arc<RateLimiter<C>>,
        backend: Arc<B>,
        service: S,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            config,
            limiter,
            backend,
            service,
            credential,
            events: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: Sender<TransformEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn availability(&self) -> Availability {
        Availability {
            credential_present: self.credential.is_some(),
            remaining_requests: self.limiter.remaining_requests(),
            next_slot_in: self.limiter.next_available_in(),
        }
    }

    fn emit(&self, event: TransformEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Run one transform. See the [module docs](self) for the stages.
    pub async fn transform(
        &self,
        person: Option<&ImageAsset>,
        garment: Option<&ImageAsset>,
        options: &TransformOptions,
    ) -> Result<TransformOutcome, TransformError> {
        let result = self.run(person, garment, options).await;
        match &result {
            Ok(outcome) => {
                tracing::info!(shape = ?outcome.shape, "transform succeeded");
                self.emit(TransformEvent::Succeeded {
                    url: outcome.image.clone(),
                });
            }
            Err(err) => {
                tracing::warn!(category = ?err.category(), error = %err, "transform failed");
                self.emit(TransformEvent::Failed {
                    category: err.category(),
                });
            }
        }
        result
    }

    async fn run(
        &self,
        person: Option<&ImageAsset>,
        garment: Option<&ImageAsset>,
        options: &TransformOptions,
    ) -> Result<TransformOutcome, TransformError> {
        self.emit(TransformEvent::Validating);
        let person = self.validated(person, ImageRole::Person)?;
        let garment = self.validated(garment, ImageRole::Garment)?;

        let credential = self.credential.as_ref().ok_or_else(|| {
            TransformError::Configuration(format!(
                "the API key is missing (set {})",
                self.config.service.credential_env
            ))
        })?;

        self.emit(TransformEvent::RateChecking);
        let admission = self.limiter.try_acquire();
        if !admission.allowed {
            let retry_after = admission.retry_after.unwrap_or_default();
            return Err(TransformError::RateLimited {
                retry_after,
                message: admission
                    .message
                    .unwrap_or_else(|| denial_message(retry_after)),
            });
        }
        let remaining = admission.remaining.unwrap_or_default();
        tracing::info!(remaining, "transform admitted");
        self.emit(TransformEvent::Admitted { remaining });

        self.emit(TransformEvent::Compressing);
        let (person, garment) = self.compress_pair(person, garment).await?;

        self.emit(TransformEvent::Encoding);
        let request = EditRequest {
            prompt: build_prompt(options),
            image_urls: vec![to_data_uri(&garment), to_data_uri(&person)],
            num_images: self.config.service.num_images,
            output_format: match options.quality {
                QualityHint::Standard => self.config.service.output_format.clone(),
                QualityHint::High => "png".to_string(),
            },
            seed: options
                .seed
                .unwrap_or_else(|| rand::random_range(0..1_000_000)),
            enable_safety_checker: self.config.service.enable_safety_checker,
        };
        drop((person, garment));

        self.emit(TransformEvent::Calling);
        let call = self.service.edit(credential, &request);
        let payload = match tokio::time::timeout(self.config.service.timeout(), call).await {
            Err(_) => return Err(TransformError::Timeout),
            Ok(Err(ServiceError::InvalidBody(detail))) => {
                tracing::warn!(%detail, "edit service sent a non-JSON success body");
                return Err(TransformError::MalformedResponse);
            }
            Ok(Err(err)) => return Err(classify(&err.to_string())),
            Ok(Ok(payload)) => payload,
        };

        let image = extract_image(&payload).ok_or_else(|| {
            tracing::warn!(%payload, "no known image field in response");
            TransformError::MalformedResponse
        })?;

        Ok(TransformOutcome {
            image: image.url,
            shape: image.shape,
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    fn validated<'a>(
        &self,
        asset: Option<&'a ImageAsset>,
        role: ImageRole,
    ) -> Result<&'a ImageAsset, TransformError> {
        check_image_file(asset, &self.config.upload)
            .map_err(|e| TransformError::Validation(format!("{role}: {e}")))?;
        asset.ok_or_else(|| TransformError::Validation(format!("{role}: no image provided")))
    }

    /// Compress both inputs side by side off the async executor.
    async fn compress_pair(
        &self,
        person: &ImageAsset,
        garment: &ImageAsset,
    ) -> Result<(ImageAsset, ImageAsset), TransformError> {
        let backend = Arc::clone(&self.backend);
        let config = self.config.compression.compress();
        let (person_in, garment_in) = (person.clone(), garment.clone());

        let (person_out, garment_out) = tokio::task::spawn_blocking(move || {
            let backend = backend.as_ref();
            rayon::join(
                || compress_image(backend, &person_in, &config),
                || compress_image(backend, &garment_in, &config),
            )
        })
        .await
        .map_err(|e| TransformError::Unspecified(format!("compression worker failed: {e}")))?;

        let person_out = person_out.map_err(|e| {
            TransformError::Validation(format!("{} could not be read: {e}", ImageRole::Person))
        })?;
        let garment_out = garment_out.map_err(|e| {
            TransformError::Validation(format!("{} could not be read: {e}", ImageRole::Garment))
        })?;

        for (role, before, after) in [
            (ImageRole::Person, person, &person_out),
            (ImageRole::Garment, garment, &garment_out),
        ] {
            self.emit(TransformEvent::Compressed {
                role,
                before: before.size(),
                after: after.size(),
            });
        }

        Ok((person_out, garment_out))
    }
}
