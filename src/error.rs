//! Transform failure taxonomy.
//!
//! Every way a transform can fail maps to one [`TransformError`] variant.
//! `Display` is for logs and may carry upstream detail;
//! [`TransformError::user_message`] is what an end user sees and never
//! repeats a vendor payload wholesale.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Longest slice of an unclassified upstream message shown to users.
const PASSTHROUGH_LIMIT: usize = 160;

const RETRY_HINT: &str = "Please wait a moment and try again, or use smaller images.";

/// Coarse failure category, for callers that branch on kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Configuration,
    RateLimited,
    Timeout,
    Network,
    MalformedResponse,
    RemoteService,
    Unspecified,
}

/// What the far side reported, when it reported something recognizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteFailure {
    QuotaExceeded,
    ServerError,
    InvalidInput,
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::QuotaExceeded => "quota exceeded",
            Self::ServerError => "server error",
            Self::InvalidInput => "invalid input",
        })
    }
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("invalid image: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{message}")]
    RateLimited {
        retry_after: Duration,
        message: String,
    },
    #[error("image service timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("image service returned an unrecognized response shape")]
    MalformedResponse,
    #[error("image service failure ({kind}): {detail}")]
    RemoteService { kind: RemoteFailure, detail: String },
    #[error("transform failed: {0}")]
    Unspecified(String),
}

impl TransformError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::Timeout => ErrorCategory::Timeout,
            Self::Network(_) => ErrorCategory::Network,
            Self::MalformedResponse => ErrorCategory::MalformedResponse,
            Self::RemoteService { .. } => ErrorCategory::RemoteService,
            Self::Unspecified(_) => ErrorCategory::Unspecified,
        }
    }

    /// Whether trying the same request again later has a fair chance.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Network(_)
                | Self::RemoteService {
                    kind: RemoteFailure::ServerError,
                    ..
                }
        )
    }

    /// Delay hint for local rate limiting.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Non-empty, human-readable message safe to show an end user.
    pub fn user_message(&self) -> String {
        let base = match self {
            Self::Validation(reason) => format!("Image check failed: {reason}."),
            Self::Configuration(reason) => {
                format!("The image service is not set up correctly: {reason}.")
            }
            Self::RateLimited { message, .. } => message.clone(),
            Self::Timeout => "The image service took too long to respond.".to_string(),
            Self::Network(_) => "Could not reach the image service.".to_string(),
            Self::MalformedResponse => {
                "The image service returned a result in an unexpected format.".to_string()
            }
            Self::RemoteService { kind, .. } => match kind {
                RemoteFailure::QuotaExceeded => {
                    "The image service quota is used up. Please try again later.".to_string()
                }
                RemoteFailure::ServerError => {
                    "The image service had an internal problem.".to_string()
                }
                RemoteFailure::InvalidInput => {
                    "The image service could not process these photos. Try different ones."
                        .to_string()
                }
            },
            Self::Unspecified(original) => match sanitize(original) {
                Some(summary) => format!("Transform failed: {summary}"),
                None => "Transform failed for an unknown reason.".to_string(),
            },
        };

        if self.is_retryable() {
            format!("{base} {RETRY_HINT}")
        } else {
            base
        }
    }
}

/// First non-blank line, cut to [`PASSTHROUGH_LIMIT`] characters.
fn sanitize(message: &str) -> Option<String> {
    let line = message.lines().map(str::trim).find(|l| !l.is_empty())?;
    let mut out: String = line.chars().take(PASSTHROUGH_LIMIT).collect();
    if line.chars().count() > PASSTHROUGH_LIMIT {
        out.push('…');
    }
    Some(out)
}
