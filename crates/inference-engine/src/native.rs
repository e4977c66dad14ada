//! Native predictor

use crate::engine::{ensure_cpu, CoreOptions, ExecutionState, PredictorCore};
use crate::program::{resolve_model_file, Program};
use crate::tract::{ModelPipeline, TractProgram};
use inference_api::{
    NativeConfig, PaddleEngineKind, PaddlePredictor, PaddleTensor, PredictorError,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Runs the imported graph as-is, without optimization passes.
///
/// Output buffers follow `config.base.output_policy`.
pub struct NativePredictor {
    config: Arc<NativeConfig>,
    core: PredictorCore,
}

impl NativePredictor {
    /// Load the model described by `config`
    pub fn new(config: &NativeConfig) -> Result<Self, PredictorError> {
        info!("Creating native predictor for {}", config.base.model_dir.display());
        Self::check(config)?;
        let path = resolve_model_file(config)?;
        let program = TractProgram::load(&path, ModelPipeline::Typed)?;
        Self::with_program(config, Arc::new(program))
    }

    /// Wrap an already loaded program
    pub fn with_program(config: &NativeConfig, program: Arc<dyn Program>) -> Result<Self, PredictorError> {
        Self::check(config)?;
        Ok(Self {
            core: PredictorCore::new(PaddleEngineKind::Native, program, options(config, None)),
            config: Arc::new(config.clone()),
        })
    }

    fn check(config: &NativeConfig) -> Result<(), PredictorError> {
        config.validate()?;
        ensure_cpu(PaddleEngineKind::Native, config.use_gpu, config.device)?;
        if config.use_mkldnn {
            debug!("use_mkldnn is ignored");
        }
        if config.fraction_of_gpu_memory >= 0.0 {
            debug!(
                "fraction_of_gpu_memory={} is ignored on CPU",
                config.fraction_of_gpu_memory
            );
        }
        Ok(())
    }

    pub fn config(&self) -> &NativeConfig {
        &self.config
    }

    pub fn state(&self) -> &ExecutionState {
        self.core.state()
    }
}

pub(crate) fn options(config: &NativeConfig, max_batch_size: Option<usize>) -> CoreOptions {
    CoreOptions {
        output_policy: config.base.output_policy,
        match_by_name: config.specify_input_name,
        max_batch_size,
    }
}

impl PaddlePredictor for NativePredictor {
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
    use std::thread;

    fn predictor() -> NativePredictor {
        NativePredictor::with_program(
            &NativeConfig::new("/models/echo"),
            Arc::new(IdentityProgram::new(["x"])),
        )
        .unwrap()
    }

    #[test]
    fn test_native_run() {
        let mut predictor = predictor();
        let input = PaddleTensor::from_f32("x", vec![1, 2], &[0.5, 1.5]);
        let mut outputs = Vec::new();

        predictor.run(std::slice::from_ref(&input), &mut outputs, None).unwrap();
        assert_eq!(outputs[0].data.to_f32_vec().unwrap(), vec![0.5, 1.5]);
        assert_eq!(predictor.engine_kind(), PaddleEngineKind::Native);
        assert_eq!(predictor.output_names(), vec!["x_out".to_string()]);
    }

    #[test]
    fn test_gpu_rejected() {
        let mut config = NativeConfig::new("/models/echo");
        config.use_gpu = true;
        let result = NativePredictor::with_program(&config, Arc::new(IdentityProgram::new(["x"])));
        assert!(matches!(result, Err(PredictorError::UnsupportedDevice(_))));
    }

    #[test]
    fn test_missing_model_fails() {
        let result = NativePredictor::new(&NativeConfig::new("/nonexistent/paddle/model"));
        assert!(matches!(result, Err(PredictorError::ModelLoad(_))));
    }

    #[test]
    fn test_clones_run_concurrently() {
        let program = Arc::new(IdentityProgram::new(["x"]));
        let original =
            NativePredictor::with_program(&NativeConfig::new("/models/echo"), program.clone()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mut clone = original.clone_predictor().unwrap();
                thread::spawn(move || {
                    let value = i as f32;
                    let input = PaddleTensor::from_f32("x", vec![1], &[value]);
                    let mut outputs = Vec::new();
                    for _ in 0..50 {
                        clone.run(std::slice::from_ref(&input), &mut outputs, None).unwrap();
                        assert_eq!(outputs[0].data.to_f32_vec().unwrap(), vec![value]);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(original.state().runs, 0);

        drop(original);
        assert_eq!(Arc::strong_count(&program), 1);
    }
}
