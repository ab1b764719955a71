//! Error types for siamtrack.

use thiserror::Error;

/// Result alias for siamtrack operations.
pub type SiamResult<T> = std::result::Result<T, SiamError>;

/// Errors that can occur while tracking or training.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SiamError {
    /// The initial bounding box has a non-positive or non-finite extent.
    #[error("invalid bounding box: width={width}, height={height}")]
    InvalidBox { width: f64, height: f64 },
    /// A configuration value is out of its valid range.
    #[error("invalid config value for `{name}`: {reason}")]
    InvalidConfig {
        name: &'static str,
        reason: &'static str,
    },
    /// A named override does not correspond to any configuration field.
    #[error("unknown config parameter `{name}`")]
    UnknownParameter { name: String },
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}x{channels}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },
    /// The backing buffer is smaller than the requested layout.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The stride is smaller than one row of pixels.
    #[error("invalid stride: row length {row_len}, stride {stride}")]
    InvalidStride { row_len: usize, stride: usize },
    /// `update` was called before `init`.
    #[error("tracker is not initialized")]
    NotInitialized,
    /// The scorer returned a different number of maps than scales searched.
    #[error("expected {expected} response maps, got {got}")]
    ScaleCountMismatch { expected: usize, got: usize },
    /// Training batch halves differ in length or are empty.
    #[error("batch mismatch: {exemplars} exemplars, {instances} instances")]
    BatchMismatch { exemplars: usize, instances: usize },
    /// A response map has no cells.
    #[error("empty response map")]
    EmptyResponse,
    /// `track` received no frames.
    #[error("frame sequence is empty")]
    EmptySequence,
    /// The similarity scorer failed.
    #[error("scorer failure: {reason}")]
    Scorer { reason: String },
    /// Image decoding failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}
