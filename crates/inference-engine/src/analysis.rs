//! Analysis predictor
//!
//! Lowers the model through a configurable set of IR passes before running
//! it. Passes map onto tract's model pipeline stages.

use crate::engine::{ensure_cpu, ExecutionState, PredictorCore};
use crate::native::options;
use crate::program::{resolve_model_file, Program};
use crate::tract::{ModelPipeline, TractProgram};
use inference_api::{
    AnalysisConfig, IrPassMode, PaddleEngineKind, PaddlePredictor, PaddleTensor, PredictorError,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Graph rewrite stage
pub const DECLUTTER_PASS: &str = "declutter";
/// Kernel selection and fusion stage
pub const OPTIMIZE_PASS: &str = "optimize";

/// Passes the analysis predictor can apply, in execution order
pub const PASS_CATALOG: &[&str] = &[DECLUTTER_PASS, OPTIMIZE_PASS];

/// Effective pass list for `config`, in execution order.
///
/// `optimize` lowers through `declutter`, so selecting it reports both.
pub fn resolve_passes(config: &AnalysisConfig) -> Result<Vec<&'static str>, PredictorError> {
    if !config.enable_ir_optim {
        return Ok(Vec::new());
    }

    let listed = |pass: &str| config.ir_passes.iter().any(|p| p == pass);

    let mut passes: Vec<&'static str> = match config.ir_mode {
        IrPassMode::System => PASS_CATALOG.to_vec(),
        IrPassMode::Include => {
            if let Some(unknown) = config
                .ir_passes
                .iter()
                .find(|p| !PASS_CATALOG.contains(&p.as_str()))
            {
                return Err(PredictorError::InvalidConfig(format!(
                    "unknown IR pass '{}' (available: {})",
                    unknown,
                    PASS_CATALOG.join(", ")
                )));
            }
            PASS_CATALOG.iter().copied().filter(|p| listed(*p)).collect()
        }
        IrPassMode::Exclude => {
            for pass in &config.ir_passes {
                if !PASS_CATALOG.contains(&pass.as_str()) {
                    debug!("Excluded pass '{}' is not in the catalog", pass);
                }
            }
            PASS_CATALOG.iter().copied().filter(|p| !listed(*p)).collect()
        }
    };

    // optimize always declutters first
    if passes.contains(&OPTIMIZE_PASS) && !passes.contains(&DECLUTTER_PASS) {
        debug!("'{}' implies '{}'", OPTIMIZE_PASS, DECLUTTER_PASS);
        passes.insert(0, DECLUTTER_PASS);
    }
    Ok(passes)
}

/// Pipeline stage reached by a pass list
pub fn pipeline_for(passes: &[&str]) -> ModelPipeline {
    if passes.contains(&OPTIMIZE_PASS) {
        ModelPipeline::Optimized
    } else if passes.contains(&DECLUTTER_PASS) {
        ModelPipeline::Decluttered
    } else {
        ModelPipeline::Typed
    }
}

/// Runs the model after IR optimization.
///
/// Output buffers follow `config.native.base.output_policy`.
pub struct AnalysisPredictor {
    config: Arc<AnalysisConfig>,
    passes: Arc<[&'static str]>,
    core: PredictorCore,
}

impl AnalysisPredictor {
    /// Load and optimize the model described by `config`
    pub fn new(config: &AnalysisConfig) -> Result<Self, PredictorError> {
        info!(
            "Creating analysis predictor for {}",
            config.native.base.model_dir.display()
        );
        let passes = Self::check(config)?;
        let path = resolve_model_file(&config.native)?;
        let program = TractProgram::load(&path, pipeline_for(&passes))?;
        Self::with_program(config, Arc::new(program))
    }

    /// Wrap an already loaded program
    pub fn with_program(config: &AnalysisConfig, program: Arc<dyn Program>) -> Result<Self, PredictorError> {
        let passes = Self::check(config)?;
        info!("Analysis passes: {:?}", passes);
        Ok(Self {
            core: PredictorCore::new(
                PaddleEngineKind::Analysis,
                program,
                options(&config.native, None),
            ),
            passes: passes.into(),
            config: Arc::new(config.clone()),
        })
    }

    fn check(config: &AnalysisConfig) -> Result<Vec<&'static str>, PredictorError> {
        config.validate()?;
        ensure_cpu(
            PaddleEngineKind::Analysis,
            config.native.use_gpu,
            config.native.device,
        )?;
        resolve_passes(config)
    }

    /// Applied passes, in order
    pub fn passes(&self) -> &[&'static str] {
        &self.passes
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn state(&self) -> &ExecutionState {
        self.core.state()
    }
}

impl PaddlePredictor for AnalysisPredictor {
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
            passes: Arc::clone(&self.passes),
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
