//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Transform
//!
//! ```text
//! Checking photos
//! Checking rate limit
//!     Admitted (2 left in window)
//! Compressing
//!     person photo: 4.1 MB → 212.4 KB
//!     garment photo: 880.0 KB → 96.3 KB
//! Encoding
//! Calling edit service
//! Done → https://cdn.example/result.jpg
//! ```
//!
//! ## Check
//!
//! ```text
//! me.jpg
//!     Type: image/jpeg
//!     Size: 4.1 MB
//!     Dimensions: 4032x3024
//!     OK
//! ```
//!
//! ## Status
//!
//! ```text
//! Endpoint: https://fal.run/fal-ai/nano-banana/edit
//! Credential: present
//! Requests left: 3 of 3 per 120s
//! Available: yes
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::asset::ImageAsset;
use crate::error::TransformError;
use crate::rate_limit::RateLimitConfig;
use crate::transform::{Availability, TransformEvent, TransformOutcome};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

// ============================================================================
// Transform
// ============================================================================

/// Format a single transform progress event as display lines.
pub fn format_transform_event(event: &TransformEvent) -> Vec<String> {
    match event {
        TransformEvent::Validating => vec!["Checking photos".to_string()],
        TransformEvent::RateChecking => vec!["Checking rate limit".to_string()],
        TransformEvent::Admitted { remaining } => vec![format!(
            "{}Admitted ({remaining} left in window)",
            indent(1)
        )],
        TransformEvent::Compressing => vec!["Compressing".to_string()],
        TransformEvent::Compressed {
            role,
            before,
            after,
        } => vec![format!(
            "{}{role}: {} \u{2192} {}",
            indent(1),
            format_size(*before),
            format_size(*after)
        )],
        TransformEvent::Encoding => vec!["Encoding".to_string()],
        TransformEvent::Calling => vec!["Calling edit service".to_string()],
        TransformEvent::Succeeded { url } => {
            vec![format!("Done \u{2192} {}", abbreviate_url(url))]
        }
        TransformEvent::Failed { category } => vec![format!("Failed ({category:?})")],
    }
}

/// `data:` URIs can be megabytes long; show only the header.
fn abbreviate_url(url: &str) -> String {
    match url.split_once(',') {
        Some((header, payload)) if url.starts_with("data:") => {
            format!("{header},… ({} chars)", payload.len())
        }
        _ => url.to_string(),
    }
}

/// Summary of a finished transform.
pub fn format_outcome(outcome: &TransformOutcome) -> Vec<String> {
    vec![
        outcome.message.clone(),
        format!("{}Image: {}", indent(1), abbreviate_url(&outcome.image)),
    ]
}

pub fn print_outcome(outcome: &TransformOutcome) {
    for line in format_outcome(outcome) {
        println!("{}", line);
    }
}

/// Result of saving the generated image locally. `error` is set when the
/// download or the write failed.
pub fn format_save(path: &Path, error: Option<&str>) -> Vec<String> {
    match error {
        None => vec![format!("{}Saved: {}", indent(1), path.display())],
        Some(reason) => vec![format!(
            "{}Could not save to {}: {reason}",
            indent(1),
            path.display()
        )],
    }
}

pub fn print_save(path: &Path, error: Option<&str>) {
    for line in format_save(path, error) {
        println!("{}", line);
    }
}

/// What the user sees when a transform fails.
pub fn format_failure(err: &TransformError) -> Vec<String> {
    let mut lines = vec![err.user_message()];
    if let Some(wait) = err.retry_after() {
        lines.push(format!("{}Retry after: {}s", indent(1), wait.as_secs()));
    }
    lines
}

pub fn print_failure(err: &TransformError) {
    for line in format_failure(err) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format one file's pre-flight check.
///
/// `dimensions` is `None` when the file could not be decoded; `problem` is
/// the rejection reason, if any.
pub fn format_check(
    asset: &ImageAsset,
    dimensions: Option<(u32, u32)>,
    problem: Option<&str>,
) -> Vec<String> {
    let mut lines = vec![asset.name.clone()];
    lines.push(format!(
        "{}Type: {}",
        indent(1),
        asset.mime_type().unwrap_or("unknown")
    ));
    lines.push(format!("{}Size: {}", indent(1), format_size(asset.size())));
    if let Some((w, h)) = dimensions {
        lines.push(format!("{}Dimensions: {w}x{h}", indent(1)));
    }
    match problem {
        Some(reason) => lines.push(format!("{}Rejected: {reason}", indent(1))),
        None => lines.push(format!("{}OK", indent(1))),
    }
    lines
}

pub fn print_check(asset: &ImageAsset, dimensions: Option<(u32, u32)>, problem: Option<&str>) {
    for line in format_check(asset, dimensions, problem) {
        println!("{}", line);
    }
}

// ============================================================================
// Compress
// ============================================================================

/// Before/after summary of a standalone compression.
pub fn format_compress(
    original: &ImageAsset,
    original_dims: (u32, u32),
    compressed: &ImageAsset,
    compressed_dims: (u32, u32),
    out: &Path,
) -> Vec<String> {
    let saved = if original.size() == 0 {
        0.0
    } else {
        100.0 * (1.0 - compressed.size() as f64 / original.size() as f64)
    };
    vec![
        format!("{} \u{2192} {}", original.name, out.display()),
        format!(
            "{}{}x{} \u{2192} {}x{}",
            indent(1),
            original_dims.0,
            original_dims.1,
            compressed_dims.0,
            compressed_dims.1
        ),
        format!(
            "{}{} \u{2192} {} ({saved:.0}% smaller)",
            indent(1),
            format_size(original.size()),
            format_size(compressed.size())
        ),
    ]
}

pub fn print_compress(
    original: &ImageAsset,
    original_dims: (u32, u32),
    compressed: &ImageAsset,
    compressed_dims: (u32, u32),
    out: &Path,
) {
    for line in format_compress(original, original_dims, compressed, compressed_dims, out) {
        println!("{}", line);
    }
}

// ============================================================================
// Status
// ============================================================================

pub fn format_status(
    endpoint: &str,
    availability: &Availability,
    limits: &RateLimitConfig,
) -> Vec<String> {
    let mut lines = vec![
        format!("Endpoint: {endpoint}"),
        format!(
            "Credential: {}",
            if availability.credential_present {
                "present"
            } else {
                "missing"
            }
        ),
        format!(
            "Requests left: {} of {} per {}s",
            availability.remaining_requests,
            limits.max_requests,
            limits.window.as_secs()
        ),
    ];
    if availability.remaining_requests == 0 {
        lines.push(format!(
            "{}Next slot in {}s",
            indent(1),
            availability.next_slot_in.as_secs()
        ));
    }
    lines.push(format!(
        "Available: {}",
        if availability.is_available() { "yes" } else { "no" }
    ));
    lines
}

pub fn print_status(endpoint: &str, availability: &Availability, limits: &RateLimitConfig) {
    for line in format_status(endpoint, availability, limits) {
        println!("{}", line);
    }
}
