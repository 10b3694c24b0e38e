//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the compression
//! step needs: identify and compress. Both work on in-memory buffers, since
//! uploads never touch the filesystem between selection and encoding.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::CompressParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("encoder produced no data")]
    EmptyOutput,
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Output of a compress operation.
///
/// `mime` reflects the format actually written, which follows the decoded
/// content rather than whatever type the upload claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Trait for image processing backends.
///
/// `Send + Sync` so a backend can be shared with the blocking worker that
/// compresses both transform inputs side by side.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Resize to the exact dimensions in `params` and re-encode.
    fn compress(&self, params: &CompressParams, data: &[u8]) -> Result<Compressed, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::sync::Mutex;

    /// Mock backend that records operations without decoding anything.
    /// Uses Mutex (not RefCell) so it is Sync and can cross into rayon.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(usize),
        Compress {
            input_len: usize,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(data.len()));

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))
        }

        fn compress(
            &self,
            params: &CompressParams,
            data: &[u8],
        ) -> Result<Compressed, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Compress {
                input_len: data.len(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            // Pretend the encoder halved the payload; like a real encoder,
            // writing nothing is a failure.
            let bytes = data[..data.len() / 2].to_vec();
            if bytes.is_empty() {
                return Err(BackendError::EmptyOutput);
            }
            Ok(Compressed {
                bytes,
                mime: "image/jpeg",
            })
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(&[0u8; 16]).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify(16)]);
    }

    #[test]
    fn mock_identify_without_results_errors() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.identify(&[1, 2, 3]),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_compress() {
        let backend = MockBackend::new();

        let out = backend
            .compress(
                &CompressParams {
                    width: 800,
                    height: 600,
                    quality: Quality::new(85),
                },
                &[7u8; 10],
            )
            .unwrap();
        assert_eq!(out.bytes.len(), 5);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Compress {
                width: 800,
                height: 600,
                quality: 85,
                ..
            }
        ));
    }
}
