//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which decides the
//! output size) and the [`backend`](super::backend) (which does the pixel
//! work), so tests can swap in a mock backend without touching the sizing
//! logic.
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`CompressParams`]: Target dimensions plus quality for one re-encode.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Build from a `0.0..=1.0` factor, the way browser encoders take it.
    pub fn from_fraction(fraction: f32) -> Self {
        Self::new((fraction.clamp(0.0, 1.0) * 100.0).round() as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for a compress operation: resize to exactly `width`×`height`
/// (already aspect-corrected by the caller) and re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
    }

    #[test]
    fn quality_from_fraction() {
        assert_eq!(Quality::from_fraction(0.85).value(), 85);
        assert_eq!(Quality::from_fraction(1.0).value(), 100);
        assert_eq!(Quality::from_fraction(0.0).value(), 1);
        assert_eq!(Quality::from_fraction(3.0).value(), 100);
    }
}
