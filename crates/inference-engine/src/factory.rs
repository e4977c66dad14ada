//! Predictor factory
//!
//! Each engine marker pairs with exactly one configuration type:
//!
//! | marker              | config            | predictor                    |
//! |---------------------|-------------------|------------------------------|
//! | `Native`            | `NativeConfig`    | `NativePredictor`            |
//! | `Anakin`            | `AnakinConfig`    | `AnakinPredictor`            |
//! | `AutoMixedTensorRt` | `TensorRtConfig`  | `AutoMixedTensorRtPredictor` |
//! | `Analysis`          | `AnalysisConfig`  | `AnalysisPredictor`          |

use crate::anakin::AnakinPredictor;
use crate::analysis::AnalysisPredictor;
use crate::native::NativePredictor;
use crate::tensorrt::AutoMixedTensorRtPredictor;
use inference_api::{
    AnakinConfig, AnalysisConfig, CreatePredictor, EngineConfig, EngineMarker, NativeConfig,
    PaddleEngineKind, PaddlePredictor, PredictorError, TensorRtConfig,
};
use tracing::{info, warn};

/// Native Fluid engine
#[derive(Debug, Clone, Copy)]
pub struct Native;

/// Anakin engine
#[derive(Debug, Clone, Copy)]
pub struct Anakin;

/// Native engine with TensorRT subgraphs
#[derive(Debug, Clone, Copy)]
pub struct AutoMixedTensorRt;

/// IR-optimized analysis engine
#[derive(Debug, Clone, Copy)]
pub struct Analysis;

impl EngineMarker for Native {
    const KIND: PaddleEngineKind = PaddleEngineKind::Native;
}

impl EngineMarker for Anakin {
    const KIND: PaddleEngineKind = PaddleEngineKind::Anakin;
}

impl EngineMarker for AutoMixedTensorRt {
    const KIND: PaddleEngineKind = PaddleEngineKind::AutoMixedTensorRt;
}

impl EngineMarker for Analysis {
    const KIND: PaddleEngineKind = PaddleEngineKind::Analysis;
}

impl CreatePredictor<Native> for NativeConfig {
    fn create_predictor(&self) -> Result<Box<dyn PaddlePredictor>, PredictorError> {
        Ok(Box::new(NativePredictor::new(self)?))
    }
}

impl CreatePredictor<Anakin> for AnakinConfig {
    fn create_predictor(&self) -> Result<Box<dyn PaddlePredictor>, PredictorError> {
        Ok(Box::new(AnakinPredictor::new(self)?))
    }
}

impl CreatePredictor<AutoMixedTensorRt> for TensorRtConfig {
    fn create_predictor(&self) -> Result<Box<dyn PaddlePredictor>, PredictorError> {
        Ok(Box::new(AutoMixedTensorRtPredictor::new(self)?))
    }
}

impl CreatePredictor<Analysis> for AnalysisConfig {
    fn create_predictor(&self) -> Result<Box<dyn PaddlePredictor>, PredictorError> {
        Ok(Box::new(AnalysisPredictor::new(self)?))
    }
}

/// Create a predictor for engine `E` from `config`.
///
/// ```ignore
/// let predictor = create_paddle_predictor::<Native, _>(&NativeConfig::new("models/mnist"))?;
/// ```
pub fn create_paddle_predictor<E, C>(config: &C) -> Result<Box<dyn PaddlePredictor>, PredictorError>
where
    E: EngineMarker,
    C: CreatePredictor<E>,
{
    info!("Creating {} predictor", E::KIND);
    config.create_predictor().map_err(|e| {
        warn!("Failed to create {} predictor: {}", E::KIND, e);
        e
    })
}

/// Create a predictor for whichever engine `config` is tagged with
pub fn create_predictor(config: &EngineConfig) -> Result<Box<dyn PaddlePredictor>, PredictorError> {
    match config {
        EngineConfig::Native(c) => create_paddle_predictor::<Native, _>(c),
        EngineConfig::Anakin(c) => create_paddle_predictor::<Anakin, _>(c),
        EngineConfig::AutoMixedTensorRt(c) => create_paddle_predictor::<AutoMixedTensorRt, _>(c),
        EngineConfig::Analysis(c) => create_paddle_predictor::<Analysis, _>(c),
    }
}
