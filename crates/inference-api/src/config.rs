//! Predictor configurations
//!
//! One configuration struct per backend. Shared fields live in `BaseConfig`
//! and `NativeConfig`, which the more specific configs embed by value.

use crate::predictor::PaddleEngineKind;
use crate::PredictorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Who provides the output buffers of a `run` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPolicy {
    /// The predictor replaces `outputs` with buffers it allocates
    #[default]
    Allocate,
    /// The caller passes one tensor per model output and the predictor
    /// writes into those buffers
    Preallocated,
}

/// Fields common to every predictor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Path to the model directory
    pub model_dir: PathBuf,
    /// Output buffer contract for `run`
    pub output_policy: OutputPolicy,
}

/// Configuration of the native predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    pub base: BaseConfig,

    /// Run on a GPU
    pub use_gpu: bool,

    /// GPU device index
    pub device: u32,

    /// Share of GPU memory to reserve, negative to let the engine decide
    pub fraction_of_gpu_memory: f32,

    /// Internal testing switch, ignored by the engines
    pub use_mkldnn: bool,

    /// Match inputs to model inputs by tensor name instead of position
    pub specify_input_name: bool,

    /// Model program file, overrides the lookup inside `model_dir`
    pub prog_file: Option<PathBuf>,

    /// Separate parameter file for `prog_file`
    pub param_file: Option<PathBuf>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            use_gpu: false,
            device: 0,
            fraction_of_gpu_memory: -1.0,
            use_mkldnn: false,
            specify_input_name: false,
            prog_file: None,
            param_file: None,
        }
    }
}

impl NativeConfig {
    /// Create a CPU config for the model in `model_dir`
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            base: BaseConfig {
                model_dir: model_dir.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Switch the output buffer contract
    pub fn with_output_policy(mut self, policy: OutputPolicy) -> Self {
        self.base.output_policy = policy;
        self
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), PredictorError> {
        let fraction = self.fraction_of_gpu_memory;
        if fraction.is_nan() || fraction == 0.0 || fraction > 1.0 {
            return Err(PredictorError::InvalidConfig(format!(
                "fraction_of_gpu_memory must be negative or in (0, 1], got {}",
                fraction
            )));
        }
        if self.param_file.is_some() && self.prog_file.is_none() {
            return Err(PredictorError::InvalidConfig(
                "param_file requires prog_file".to_string(),
            ));
        }
        Ok(())
    }
}

/// Anakin target device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    NvGpu,
    #[default]
    X86,
}

/// Configuration of the Anakin predictor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnakinConfig {
    pub base: BaseConfig,
    /// Device index on the target
    pub device: u32,
    /// Model file, absolute or relative to `model_dir`
    pub model_file: PathBuf,
    /// Largest accepted batch, unlimited when `None`
    pub max_batch_size: Option<usize>,
    pub target_type: TargetType,
}

impl AnakinConfig {
    /// Create an X86 config for `model_file` inside `model_dir`
    pub fn new(model_dir: impl Into<PathBuf>, model_file: impl Into<PathBuf>) -> Self {
        Self {
            base: BaseConfig {
                model_dir: model_dir.into(),
                ..Default::default()
            },
            model_file: model_file.into(),
            ..Default::default()
        }
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.model_file.as_os_str().is_empty() {
            return Err(PredictorError::InvalidConfig("model_file is required".to_string()));
        }
        if self.max_batch_size == Some(0) {
            return Err(PredictorError::InvalidConfig(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration of the automatic mixed TensorRT predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensorRtConfig {
    pub native: NativeConfig,

    /// Smallest subgraph (in ops) handed to TensorRT
    pub min_subgraph_size: usize,

    /// Engines are tuned for this batch; smaller batches run, larger ones
    /// are rejected. Best set to the runtime batch size.
    pub max_batch_size: usize,

    /// TensorRT scratch memory in bytes
    pub workspace_size: usize,
}

impl Default for TensorRtConfig {
    fn default() -> Self {
        Self {
            native: NativeConfig::default(),
            min_subgraph_size: 1,
            max_batch_size: 1,
            workspace_size: 1 << 30,
        }
    }
}

impl TensorRtConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            native: NativeConfig::new(model_dir),
            ..Default::default()
        }
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), PredictorError> {
        self.native.validate()?;
        if self.min_subgraph_size == 0 {
            return Err(PredictorError::InvalidConfig(
                "min_subgraph_size must be at least 1".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(PredictorError::InvalidConfig(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.workspace_size == 0 {
            return Err(PredictorError::InvalidConfig(
                "workspace_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// How `AnalysisConfig::ir_passes` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrPassMode {
    /// Default passes, `ir_passes` ignored
    System,
    /// Only the passes in `ir_passes`
    Include,
    /// Default passes minus those in `ir_passes`
    Exclude,
}

/// Configuration of the analysis predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub native: NativeConfig,
    pub enable_ir_optim: bool,
    pub ir_mode: IrPassMode,
    pub ir_passes: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            native: NativeConfig::default(),
            enable_ir_optim: true,
            ir_mode: IrPassMode::Exclude,
            // attention lstm fuse only fits a few models
            ir_passes: vec!["attention_lstm_fuse_pass".to_string()],
        }
    }
}

impl AnalysisConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            native: NativeConfig::new(model_dir),
            ..Default::default()
        }
    }

    /// Run exactly the listed passes
    pub fn include_passes<I, S>(mut self, passes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ir_mode = IrPassMode::Include;
        self.ir_passes = passes.into_iter().map(Into::into).collect();
        self
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), PredictorError> {
        self.native.validate()
    }
}

/// Configuration tagged with the engine it targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum EngineConfig {
    Native(NativeConfig),
    Anakin(AnakinConfig),
    #[serde(rename = "auto_mixed_tensorrt")]
    AutoMixedTensorRt(TensorRtConfig),
    Analysis(AnalysisConfig),
}

impl EngineConfig {
    /// Engine this configuration selects
    pub fn kind(&self) -> PaddleEngineKind {
        match self {
            EngineConfig::Native(_) => PaddleEngineKind::Native,
            EngineConfig::Anakin(_) => PaddleEngineKind::Anakin,
            EngineConfig::AutoMixedTensorRt(_) => PaddleEngineKind::AutoMixedTensorRt,
            EngineConfig::Analysis(_) => PaddleEngineKind::Analysis,
        }
    }

    /// Shared fields of the wrapped configuration
    pub fn base(&self) -> &BaseConfig {
        match self {
            EngineConfig::Native(c) => &c.base,
            EngineConfig::Anakin(c) => &c.base,
            EngineConfig::AutoMixedTensorRt(c) => &c.native.base,
            EngineConfig::Analysis(c) => &c.native.base,
        }
    }
}

/// Load an engine configuration from a TOML, JSON or YAML file.
///
/// Environment variables prefixed `PADDLE__` override file values, with
/// `__` separating nested keys (`PADDLE__NATIVE__USE_GPU=true`).
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, PredictorError> {
    let path = path.as_ref();
    info!("Loading predictor config from {}", path.display());

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("PADDLE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize::<EngineConfig>()?)
}
