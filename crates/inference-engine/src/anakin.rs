//! Anakin predictor

use crate::engine::{CoreOptions, ExecutionState, PredictorCore};
use crate::program::{under_model_dir, Program};
use crate::tract::{ModelPipeline, TractProgram};
use inference_api::{
    AnakinConfig, PaddleEngineKind, PaddlePredictor, PaddleTensor, PredictorError, TargetType,
};
use std::sync::Arc;
use tracing::info;

/// Runs a single-file model on the X86 target.
///
/// `TargetType::NvGpu` is rejected at construction. Inputs are matched by
/// position. Output buffers follow `config.base.output_policy`.
pub struct AnakinPredictor {
    config: Arc<AnakinConfig>,
    core: PredictorCore,
}

impl AnakinPredictor {
    /// Load `config.model_file`
    pub fn new(config: &AnakinConfig) -> Result<Self, PredictorError> {
        Self::check(config)?;
        let path = under_model_dir(&config.base.model_dir, &config.model_file);
        info!("Creating Anakin predictor for {}", path.display());
        if !path.is_file() {
            return Err(PredictorError::ModelLoad(format!(
                "model file {} not found",
                path.display()
            )));
        }
        let program = TractProgram::load(&path, ModelPipeline::Optimized)?;
        Self::with_program(config, Arc::new(program))
    }

    /// Wrap an already loaded program
    pub fn with_program(config: &AnakinConfig, program: Arc<dyn Program>) -> Result<Self, PredictorError> {
        Self::check(config)?;
        let options = CoreOptions {
            output_policy: config.base.output_policy,
            match_by_name: false,
            max_batch_size: config.max_batch_size,
        };
        Ok(Self {
            core: PredictorCore::new(PaddleEngineKind::Anakin, program, options),
            config: Arc::new(config.clone()),
        })
    }

    fn check(config: &AnakinConfig) -> Result<(), PredictorError> {
        config.validate()?;
        if config.target_type == TargetType::NvGpu {
            return Err(PredictorError::UnsupportedDevice(format!(
                "Anakin NVGPU target (device {}) is not available",
                config.device
            )));
        }
        Ok(())
    }

    pub fn config(&self) -> &AnakinConfig {
        &self.config
    }

    pub fn state(&self) -> &ExecutionState {
        self.core.state()
    }
}

impl PaddlePredictor for AnakinPredictor {
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
