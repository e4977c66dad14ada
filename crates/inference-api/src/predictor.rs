//! Predictor contract

use crate::tensor::PaddleTensor;
use crate::PredictorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend that executes a predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PaddleEngineKind {
    /// Native Fluid execution
    Native = 0,
    /// Anakin engine
    Anakin,
    /// Fluid with TensorRT subgraphs mixed in automatically
    #[serde(rename = "auto_mixed_tensorrt")]
    AutoMixedTensorRt,
    /// Analysis predictor with IR optimization passes
    Analysis,
}

impl PaddleEngineKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaddleEngineKind::Native => "native",
            PaddleEngineKind::Anakin => "anakin",
            PaddleEngineKind::AutoMixedTensorRt => "auto_mixed_tensorrt",
            PaddleEngineKind::Analysis => "analysis",
        }
    }
}

impl fmt::Display for PaddleEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded model ready to run inference.
///
/// `run` takes `&mut self`, so one instance serves one caller at a time.
/// For concurrent inference, give each thread its own instance from
/// [`PaddlePredictor::clone_predictor`]: clones share the immutable model
/// weights and keep independent execution state.
///
/// # Outputs
///
/// Who allocates output buffers is fixed per predictor by
/// [`OutputPolicy`](crate::OutputPolicy):
/// - `Allocate`: `outputs` is cleared and refilled with owned tensors.
/// - `Preallocated`: `outputs` must hold one tensor per model output; their
///   buffers receive the results (owned buffers are resized, writable
///   borrowed buffers must be large enough, read-only buffers are rejected).
///
/// After an `Err`, the contents of `outputs` are unspecified.
pub trait PaddlePredictor: Send {
    /// Run inference on `inputs`.
    ///
    /// `batch_size` overrides the batch inferred from the inputs; `None`
    /// infers it.
    fn run(
        &mut self,
        inputs: &[PaddleTensor<'_>],
        outputs: &mut Vec<PaddleTensor<'_>>,
        batch_size: Option<usize>,
    ) -> Result<(), PredictorError>;

    /// New predictor sharing this one's model weights
    fn clone_predictor(&self) -> Result<Box<dyn PaddlePredictor>, PredictorError>;

    /// Engine behind this predictor
    fn engine_kind(&self) -> PaddleEngineKind;

    /// Model input names, in positional order
    fn input_names(&self) -> Vec<String>;

    /// Model output names, in positional order
    fn output_names(&self) -> Vec<String>;
}
