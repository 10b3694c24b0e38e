//! # Wardrobe
//!
//! A virtual try-on client. Given a photo of a person and a photo of a
//! garment, it asks a hosted image-edit model to render the person wearing
//! the garment and hands back the generated image.
//!
//! # Architecture: One Guarded Pipeline
//!
//! Every transform runs the same stages in order, and every stage can stop
//! the pipeline with a classified error:
//!
//! ```text
//! 1. Validate   person + garment  →  size / type checks        (local)
//! 2. Admit      rate limiter      →  slot or RateLimited        (local)
//! 3. Compress   both photos       →  ≤1024×1024 re-encodes      (local, parallel)
//! 4. Encode     compressed bytes  →  data: URIs                 (local)
//! 5. Call       edit service      →  JSON payload               (network, timed out)
//! 6. Extract    JSON payload      →  result image URL           (local)
//! ```
//!
//! The cheap local stages come first so that a bad upload or a missing API
//! key never spends quota or bandwidth.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`transform`] | The pipeline: [`transform::Transformer`] orchestrates all stages |
//! | [`asset`] | `ImageAsset` and upload validation |
//! | [`imaging`] | Pure-Rust decode, bounded resize and re-encode behind a backend trait |
//! | [`encoding`] | Base64 `data:` URI conversion |
//! | [`rate_limit`] | Sliding-window admission with an injectable clock |
//! | [`service`] | The remote edit service trait and its fal.ai client |
//! | [`response`] | Normalizes the service's several success envelopes |
//! | [`classify`] | Maps free-text service failures to error categories |
//! | [`error`] | The `TransformError` taxonomy and user-facing messages |
//! | [`config`] | `wardrobe.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Limiter Is a Value, Not a Global
//!
//! The [`rate_limit::RateLimiter`] is constructed by the caller and shared
//! through `Arc`. Tests build one per case with a manual clock; the CLI
//! builds one per process. Admission checks and records in one step, so two
//! concurrent transforms can never both take the last slot.
//!
//! ## Errors Are Classified Once
//!
//! The remote service reports failures as text. That text is classified in
//! exactly one place ([`classify`]) into a closed set of categories, and
//! everything downstream branches on the category, never on the text.
//!
//! ## No Automatic Retry
//!
//! A transform is a paid call. [`error::TransformError::is_retryable`] tells
//! the caller whether trying again is sensible; the library never does it
//! on its own.

pub mod asset;
pub mod classify;
pub mod config;
pub mod encoding;
pub mod error;
pub mod imaging;
pub mod output;
pub mod rate_limit;
pub mod response;
pub mod service;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;
