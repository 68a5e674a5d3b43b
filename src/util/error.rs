//! Error types for ndview.

use thiserror::Error;

/// Result alias for ndview operations.
pub type NdViewResult<T> = std::result::Result<T, NdViewError>;

/// Errors that can occur when evaluating, writing or materializing views.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NdViewError {
    /// A coordinate was read outside the declared bounds of a view that has
    /// no boundary policy attached.
    #[error("position {position:?} is outside the view bounds {bounds}")]
    OutOfDomain { position: Vec<i64>, bounds: String },
    /// A write was attempted on a view that cannot map values back to its
    /// source.
    #[error("invalid write: {reason}")]
    InvalidWrite { reason: &'static str },
    /// The requested box does not fit into the chosen buffer layout.
    #[error("cannot allocate {elements} elements with {layout} layout (limit {limit})")]
    Allocation {
        elements: u64,
        limit: u64,
        layout: &'static str,
    },
    /// A file was opened as an element type it cannot represent.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    /// Two operands disagree on their number of dimensions.
    #[error("dimension mismatch: expected {expected} dimensions, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Two operands of a binary converter have different bounds.
    #[error("bounds mismatch: {left} vs {right}")]
    BoundsMismatch { left: String, right: String },
    /// A box is empty or has an invalid shape.
    #[error("invalid dimensions: {dims:?}")]
    InvalidDimensions { dims: Vec<i64> },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Reading or writing an image file failed.
    #[error("image I/O failed: {reason}")]
    ImageIo { reason: String },
    /// The worker pool could not be created.
    #[error("thread pool error: {reason}")]
    ThreadPool { reason: String },
}
