//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Fit `source` inside `bounds`, preserving aspect ratio.
///
/// Only ever scales down: an image already inside the bounds keeps its
/// dimensions. Each output edge is at least 1 pixel.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Maximum allowed dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Output dimensions, neither exceeding its bound
///
/// # Examples
/// ```
/// # use wardrobe::imaging::fit_within;
/// // 4000x3000 landscape into 1024x1024 → 1024x768
/// assert_eq!(fit_within((4000, 3000), (1024, 1024)), (1024, 768));
///
/// // Already small enough → unchanged
/// assert_eq!(fit_within((640, 480), (1024, 1024)), (640, 480));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return (src_w, src_h);
    }

    let ratio = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * ratio).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * ratio).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}
