//! Failure classification for the remote edit service.
//!
//! The service reports failures as free text only, and its wording is not
//! stable. Classification is therefore an ordered list of [`Rule`]s: each
//! pairs a keyword predicate with the [`TransformError`] it produces, and
//! the first rule whose predicate matches wins. Anything unmatched becomes
//! [`TransformError::Unspecified`] carrying the original text.
//!
//! Order matters: "401 connection closed" is a credential problem, not a
//! network one, and "gateway timeout" is a timeout before it is a 5xx.

use crate::error::{RemoteFailure, TransformError};

/// One classification rule.
pub struct Rule {
    pub name: &'static str,
    /// Receives the lower-cased failure text.
    pub matches: fn(&str) -> bool,
    /// Receives the original failure text.
    pub build: fn(&str) -> TransformError,
}

/// Rules in priority order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "credential",
        matches: is_credential_failure,
        build: |_| {
            TransformError::Configuration("the service rejected the API credential".to_string())
        },
    },
    Rule {
        name: "quota",
        matches: is_quota_failure,
        build: |text| TransformError::RemoteService {
            kind: RemoteFailure::QuotaExceeded,
            detail: text.to_string(),
        },
    },
    Rule {
        name: "timeout",
        matches: is_timeout,
        build: |_| TransformError::Timeout,
    },
    Rule {
        name: "network",
        matches: is_network_failure,
        build: |text| TransformError::Network(text.to_string()),
    },
    Rule {
        name: "server",
        matches: is_server_failure,
        build: |text| TransformError::RemoteService {
            kind: RemoteFailure::ServerError,
            detail: text.to_string(),
        },
    },
    Rule {
        name: "input",
        matches: is_input_rejected,
        build: |text| TransformError::RemoteService {
            kind: RemoteFailure::InvalidInput,
            detail: text.to_string(),
        },
    },
];

/// Map free-form failure text to a [`TransformError`].
pub fn classify(text: &str) -> TransformError {
    let lower = text.to_lowercase();
    for rule in RULES {
        if (rule.matches)(&lower) {
            tracing::debug!(rule = rule.name, "classified service failure");
            return (rule.build)(text);
        }
    }
    TransformError::Unspecified(text.to_string())
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// True when `code` appears as a standalone number, so "500" matches
/// "HTTP 500" but not "took 5000ms".
fn has_status(text: &str, code: &str) -> bool {
    text.match_indices(code).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + code.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

fn has_any_status(text: &str, codes: &[&str]) -> bool {
    codes.iter().any(|c| has_status(text, c))
}

fn is_credential_failure(text: &str) -> bool {
    contains_any(
        text,
        &[
            "api key",
            "api_key",
            "credential",
            "unauthorized",
            "unauthenticated",
            "forbidden",
            "authentication",
        ],
    ) || has_any_status(text, &["401", "403"])
}

fn is_quota_failure(text: &str) -> bool {
    contains_any(
        text,
        &[
            "rate limit",
            "quota",
            "too many requests",
            "exhausted",
            "insufficient balance",
        ],
    ) || has_status(text, "429")
}

fn is_timeout(text: &str) -> bool {
    contains_any(text, &["timeout", "timed out", "deadline"])
}

fn is_network_failure(text: &str) -> bool {
    contains_any(
        text,
        &[
            "network",
            "connection",
            "connect error",
            "dns",
            "failed to fetch",
            "fetch failed",
            "unreachable",
            "reset by peer",
        ],
    )
}

fn is_server_failure(text: &str) -> bool {
    contains_any(
        text,
        &[
            "internal server error",
            "bad gateway",
            "service unavailable",
            "overloaded",
        ],
    ) || has_any_status(text, &["500", "502", "503", "504"])
}

fn is_input_rejected(text: &str) -> bool {
    contains_any(
        text,
        &[
            "invalid",
            "malformed",
            "unsupported",
            "bad request",
            "unprocessable",
        ],
    ) || has_any_status(text, &["400", "422"])
}
