//! Loaded model programs
//!
//! A `Program` is the immutable, executable form of a model. Predictors hold
//! it behind an `Arc` so clones share the weights.

use inference_api::{NativeConfig, PaddleTensor, PredictorError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File names searched inside `model_dir` when no `prog_file` is configured
pub const MODEL_FILE_CANDIDATES: &[&str] = &["model.onnx", "__model__"];

/// Executable model shared between predictor clones
pub trait Program: Send + Sync {
    /// Input names in positional order
    fn input_names(&self) -> &[String];

    /// Output names in positional order
    fn output_names(&self) -> &[String];

    /// Execute with inputs already ordered like `input_names`
    fn run(&self, inputs: &[&PaddleTensor<'_>]) -> Result<Vec<PaddleTensor<'static>>, PredictorError>;
}

/// Program that returns a copy of each input as `<name>_out`
#[derive(Debug, Clone)]
pub struct IdentityProgram {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl IdentityProgram {
    /// Create an identity program with the given input names
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        let outputs = inputs.iter().map(|name| format!("{}_out", name)).collect();
        Self { inputs, outputs }
    }
}

impl Program for IdentityProgram {
    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }

    fn run(&self, inputs: &[&PaddleTensor<'_>]) -> Result<Vec<PaddleTensor<'static>>, PredictorError> {
        Ok(inputs
            .iter()
            .zip(&self.outputs)
            .map(|(tensor, name)| {
                let mut out = tensor.share().into_owned();
                out.name = name.clone();
                out
            })
            .collect())
    }
}

/// Join `path` onto `model_dir` unless it is absolute
pub fn under_model_dir(model_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        model_dir.join(path)
    }
}

/// Locate the model program described by a native config
pub fn resolve_model_file(config: &NativeConfig) -> Result<PathBuf, PredictorError> {
    let model_dir = &config.base.model_dir;

    if let Some(prog_file) = &config.prog_file {
        let prog = under_model_dir(model_dir, prog_file);
        if !prog.is_file() {
            return Err(PredictorError::ModelLoad(format!(
                "program file {} not found",
                prog.display()
            )));
        }
        if let Some(param_file) = &config.param_file {
            let params = under_model_dir(model_dir, param_file);
            if !params.is_file() {
                return Err(PredictorError::ModelLoad(format!(
                    "parameter file {} not found",
                    params.display()
                )));
            }
            debug!("Using parameter file {}", params.display());
        }
        return Ok(prog);
    }

    if !model_dir.is_dir() {
        return Err(PredictorError::ModelLoad(format!(
            "model directory {} not found",
            model_dir.display()
        )));
    }

    MODEL_FILE_CANDIDATES
        .iter()
        .map(|name| model_dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            PredictorError::ModelLoad(format!(
                "no model file ({}) in {}",
                MODEL_FILE_CANDIDATES.join(", "),
                model_dir.display()
            ))
        })
}
