//! Automatic mixed TensorRT predictor

use crate::engine::{ensure_cpu, ExecutionState, PredictorCore};
use crate::native::options;
use crate::program::{resolve_model_file, Program};
use crate::tract::{ModelPipeline, TractProgram};
use inference_api::{
    PaddleEngineKind, PaddlePredictor, PaddleTensor, PredictorError, TensorRtConfig,
};
use std::sync::Arc;
use tracing::info;

/// Mixes TensorRT subgraphs into native execution.
///
/// Subgraphs of at least `min_subgraph_size` ops are TensorRT candidates.
/// This build ships no TensorRT runtime, so every subgraph runs on the
/// optimized tract plan. Runs with a batch above `max_batch_size` fail with
/// `BatchTooLarge`. Output buffers follow `config.native.base.output_policy`.
pub struct AutoMixedTensorRtPredictor {
    config: Arc<TensorRtConfig>,
    core: PredictorCore,
}

impl AutoMixedTensorRtPredictor {
    /// Load the model described by `config`
    pub fn new(config: &TensorRtConfig) -> Result<Self, PredictorError> {
        info!(
            "Creating auto mixed TensorRT predictor for {}",
            config.native.base.model_dir.display()
        );
        Self::check(config)?;
        let path = resolve_model_file(&config.native)?;
        let program = TractProgram::load(&path, ModelPipeline::Optimized)?;
        Self::with_program(config, Arc::new(program))
    }

    /// Wrap an already loaded program
    pub fn with_program(config: &TensorRtConfig, program: Arc<dyn Program>) -> Result<Self, PredictorError> {
        Self::check(config)?;
        info!(
            "No TensorRT runtime: all subgraphs run natively (min_subgraph_size={}, workspace={} bytes)",
            config.min_subgraph_size, config.workspace_size
        );
        Ok(Self {
            core: PredictorCore::new(
                PaddleEngineKind::AutoMixedTensorRt,
                program,
                options(&config.native, Some(config.max_batch_size)),
            ),
            config: Arc::new(config.clone()),
        })
    }

    fn check(config: &TensorRtConfig) -> Result<(), PredictorError> {
        config.validate()?;
        ensure_cpu(
            PaddleEngineKind::AutoMixedTensorRt,
            config.native.use_gpu,
            config.native.device,
        )
    }

    pub fn config(&self) -> &TensorRtConfig {
        &self.config
    }

    pub fn state(&self) -> &ExecutionState {
        self.core.state()
    }
}

impl PaddlePredictor for AutoMixedTensorRtPredictor {
    fn run(
        &mut self,
        inputs: &[PaddleTensor<'_>],
        outputs: &mut Vec<PaddleTensor<'_>>,
        batch_size: Option<usize>,
    ) -> Result<(), PredictorError> {
        self.core.run(inputs, outputs, batch_size)
    }

    fn clone_predictor(&self) -> Result<Box<dyn PaddlePredictor>, PredictorError> {
        Ok(Box::new(Self {
            config: Arc::clone(&self.config),
            core: self.core.fork(),
        }))
    }

    fn engine_kind(&self) -> PaddleEngineKind {
        self.core.kind()
    }

    fn input_names(&self) -> Vec<String> {
        self.core.input_names()
    }

    fn output_names(&self) -> Vec<String> {
        self.core.output_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::IdentityProgram;

    #[test]
    fn test_max_batch_enforced() {
        let config = TensorRtConfig {
            max_batch_size: 4,
            ..TensorRtConfig::new("/models/echo")
        };
        let mut predictor =
            AutoMixedTensorRtPredictor::with_program(&config, Arc::new(IdentityProgram::new(["x"])))
                .unwrap();
        let mut outputs = Vec::new();

        let small = PaddleTensor::from_f32("x", vec![4, 1], &[0.0; 4]);
        predictor.run(std::slice::from_ref(&small), &mut outputs, None).unwrap();
        assert_eq!(predictor.state().last_batch_size, Some(4));

        let large = PaddleTensor::from_f32("x", vec![5, 1], &[0.0; 5]);
        assert!(matches!(
            predictor.run(std::slice::from_ref(&large), &mut outputs, None),
            Err(PredictorError::BatchTooLarge { batch: 5, max: 4 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TensorRtConfig {
            min_subgraph_size: 0,
            ..TensorRtConfig::new("/models/echo")
        };
        let result =
            AutoMixedTensorRtPredictor::with_program(&config, Arc::new(IdentityProgram::new(["x"])));
        assert!(matches!(result, Err(PredictorError::InvalidConfig(_))));
    }
}
