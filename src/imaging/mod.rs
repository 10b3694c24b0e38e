//! Image processing in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` (header only) |
//! | **Compress** | Lanczos3 resize + re-encode in the source format |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Compressed, Dimensions, ImageBackend};
pub use calculations::fit_within;
pub use operations::{CompressConfig, compress_image, get_dimensions};
pub use params::{CompressParams, Quality};
pub use rust_backend::{RustBackend, mime_for_extension};
