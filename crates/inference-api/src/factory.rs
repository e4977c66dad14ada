//! Factory traits
//!
//! A predictor is selected by the pair (configuration type, engine kind).
//! Engines are zero-sized marker types implementing [`EngineMarker`]; each
//! valid pairing implements [`CreatePredictor`] once, so an unsupported
//! pairing is a compile error rather than a runtime failure.

use crate::predictor::{PaddleEngineKind, PaddlePredictor};
use crate::PredictorError;

/// Compile-time engine selector
pub trait EngineMarker: Send + Sync + 'static {
    const KIND: PaddleEngineKind;
}

/// Build a predictor for engine `E` from this configuration
pub trait CreatePredictor<E: EngineMarker> {
    fn create_predictor(&self) -> Result<Box<dyn PaddlePredictor>, PredictorError>;
}
