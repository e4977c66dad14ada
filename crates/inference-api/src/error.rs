//! Predictor Error Types

use thiserror::Error;

/// Errors raised while building or running a predictor
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Model files missing or rejected by the execution engine
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// Requested device is not available in this build
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input tensor is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// LoD offsets break the level-of-detail convention
    #[error("Invalid LoD: {0}")]
    InvalidLod(String),

    /// Buffer size does not match shape and dtype
    #[error("Tensor '{name}' holds {actual} bytes, shape and dtype require {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Wrong number of input tensors
    #[error("Expected {expected} input tensors, got {actual}")]
    InputCount { expected: usize, actual: usize },

    /// Named input not declared by the model
    #[error("Model has no input named '{0}'")]
    UnknownInput(String),

    /// Batch exceeds the configured maximum
    #[error("Batch size {batch} exceeds maximum {max}")]
    BatchTooLarge { batch: usize, max: usize },

    /// Caller supplied the wrong number of preallocated outputs
    #[error("Expected {expected} preallocated output tensors, got {actual}")]
    OutputCount { expected: usize, actual: usize },

    /// Caller-provided output memory cannot hold the result
    #[error("Output '{name}' needs {required} bytes, buffer holds {available}")]
    OutputBufferTooSmall {
        name: String,
        required: usize,
        available: usize,
    },

    /// Output buffer borrows read-only memory
    #[error("Output '{0}' borrows read-only memory")]
    ReadOnlyOutput(String),

    /// Element type outside the supported set
    #[error("Unsupported element type: {0}")]
    UnsupportedDType(String),

    /// Execution engine failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
