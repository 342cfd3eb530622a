//! Error types for the pixelveil crate.

/// Errors that can occur while protecting an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input bytes are not a valid PNG container.
    #[error("invalid PNG container: {0}")]
    InvalidContainer(String),

    /// The external perturbation pattern is malformed.
    ///
    /// Non-fatal by policy: the overlay stage degrades to a no-op and the
    /// pipeline continues.
    #[error("unsupported perturbation pattern: {0}")]
    UnsupportedPattern(String),

    /// Fetching the external perturbation pattern failed.
    ///
    /// Non-fatal by policy, same degrade-to-no-op treatment as
    /// [`Error::UnsupportedPattern`].
    #[error("pattern fetch failed: {0}")]
    FetchFailure(String),

    /// Quality-metric inputs had different lengths.
    ///
    /// This is a programming-contract violation and indicates an internal
    /// invariant break, not a recoverable condition.
    #[error("buffer length mismatch: expected {expected} samples, got {actual}")]
    DimensionMismatch {
        /// Length of the reference buffer.
        expected: usize,
        /// Length of the buffer that failed the contract.
        actual: usize,
    },

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
