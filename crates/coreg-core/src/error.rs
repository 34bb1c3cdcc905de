use thiserror::Error;

/// Fatal errors. Anything in here aborts the whole stack operation.
#[derive(Error, Debug)]
pub enum CoregError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Shape mismatch: {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Empty frame stack")]
    EmptyStack,

    #[error("Frame {index} has no layers")]
    EmptyFrame { index: usize },

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Layer set of frame {index} differs from frame 0")]
    LayerSetMismatch { index: usize },

    #[error("Reference index {index} out of range (total: {total})")]
    ReferenceOutOfRange { index: usize, total: usize },

    #[error("Channel {channel} out of range for layer '{layer}' ({channels} channels)")]
    ChannelOutOfRange {
        layer: String,
        channel: usize,
        channels: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Singular transform (determinant {determinant:e})")]
    SingularTransform { determinant: f64 },

    #[error("Alignment cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CoregError>;

/// Per-frame estimation failure. These never abort a stack: the aligner
/// substitutes the identity transform and records the reason.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateFailure {
    #[error("Low confidence estimate ({confidence:.4} < {threshold:.4})")]
    LowConfidence { confidence: f64, threshold: f64 },

    #[error("ECC did not converge after {iterations} iterations: {reason}")]
    ConvergenceFailure { iterations: usize, reason: String },

    #[error("Insufficient matches: {found} found, {required} required")]
    InsufficientMatches { found: usize, required: usize },

    #[error("Implausible transform: {0}")]
    ImplausibleTransform(String),

    #[error("Estimated transform is singular")]
    SingularTransform,
}
