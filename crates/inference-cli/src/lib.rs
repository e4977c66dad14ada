//! Paddle Inference CLI
//!
//! Loads a predictor config, builds the predictor and runs it once on
//! zero-filled inputs.

use anyhow::Context;
use clap::Parser;
use inference_api::{
    tensor::checked_product, EngineConfig, PaddleDType, PaddlePredictor, PaddleTensor,
    PredictorError,
};
use inference_engine::{
    create_predictor, AnakinPredictor, AnalysisPredictor, AutoMixedTensorRtPredictor,
    IdentityProgram, NativePredictor, Program,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Paddle predictor smoke runner
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "paddle-infer", version, about = "Build a predictor from a config file and run it once")]
pub struct CliArgs {
    /// Predictor config file (TOML, JSON or YAML)
    pub config_path: PathBuf,

    /// Use an identity program instead of loading the model
    #[arg(long)]
    pub mock: bool,

    /// Shape of every zero-filled input
    #[arg(long, value_delimiter = ',', default_value = "1,1")]
    pub shape: Vec<usize>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: Level,
}

/// Shape and type of one output
#[derive(Debug, Serialize)]
pub struct OutputSummary {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: PaddleDType,
    pub bytes: usize,
}

/// Initialize logging
pub fn init_logging(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

/// Build the configured predictor, or an identity stand-in when `mock` is set
pub fn build_predictor(
    config: &EngineConfig,
    mock: bool,
) -> Result<Box<dyn PaddlePredictor>, PredictorError> {
    if !mock {
        return create_predictor(config);
    }

    info!("Mock mode: skipping model load");
    let program: Arc<dyn Program> = Arc::new(IdentityProgram::new(["x"]));
    let predictor: Box<dyn PaddlePredictor> = match config {
        EngineConfig::Native(c) => Box::new(NativePredictor::with_program(c, program)?),
        EngineConfig::Anakin(c) => Box::new(AnakinPredictor::with_program(c, program)?),
        EngineConfig::AutoMixedTensorRt(c) => {
            Box::new(AutoMixedTensorRtPredictor::with_program(c, program)?)
        }
        EngineConfig::Analysis(c) => Box::new(AnalysisPredictor::with_program(c, program)?),
    };
    Ok(predictor)
}

/// Run once with a zero-filled float32 input per model input
pub fn smoke_run(
    predictor: &mut dyn PaddlePredictor,
    shape: &[usize],
) -> Result<Vec<OutputSummary>, PredictorError> {
    let numel = checked_product(shape)
        .filter(|n| n.checked_mul(PaddleDType::Float32.size()).is_some())
        .ok_or_else(|| PredictorError::InvalidInput(format!("shape {:?} is too large", shape)))?;

    let mut zeros: Vec<f32> = Vec::new();
    zeros.try_reserve_exact(numel).map_err(|e| {
        PredictorError::InvalidInput(format!("cannot allocate input of shape {:?}: {}", shape, e))
    })?;
    zeros.resize(numel, 0.0);

    let inputs: Vec<PaddleTensor<'static>> = predictor
        .input_names()
        .into_iter()
        .map(|name| PaddleTensor::from_f32(name, shape.to_vec(), &zeros))
        .collect();

    let mut outputs = Vec::new();
    predictor.run(&inputs, &mut outputs, None)?;

    Ok(outputs
        .iter()
        .map(|tensor| {
            info!("{}: shape={:?} dtype={}", tensor.name, tensor.shape, tensor.dtype);
            OutputSummary {
                name: tensor.name.clone(),
                shape: tensor.shape.clone(),
                dtype: tensor.dtype,
                bytes: tensor.data.len(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_api::{AnakinConfig, NativeConfig, OutputPolicy, TensorRtConfig};

    fn parse(list: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("paddle-infer").chain(list.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse(&["cfg.toml", "--mock", "--shape", "2,3"]).unwrap();
        assert_eq!(
            parsed,
            CliArgs {
                config_path: PathBuf::from("cfg.toml"),
                mock: true,
                shape: vec![2, 3],
                log_level: Level::INFO,
            }
        );

        let defaults = parse(&["cfg.json", "--log-level", "debug"]).unwrap();
        assert_eq!(defaults.shape, vec![1, 1]);
        assert_eq!(defaults.log_level, Level::DEBUG);
        assert!(!defaults.mock);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.toml", "b.toml"]).is_err());
        assert!(parse(&["a.toml", "--shape"]).is_err());
        assert!(parse(&["a.toml", "--shape", "2,x"]).is_err());
        assert!(parse(&["a.toml", "--verbose"]).is_err());
    }

    #[test]
    fn test_smoke_run_rejects_oversized_shape() {
        let config = EngineConfig::Native(NativeConfig::new("/models/m"));
        let mut predictor = build_predictor(&config, true).unwrap();

        for shape in [vec![usize::MAX, 2], vec![1 << 62, 1]] {
            assert!(matches!(
                smoke_run(predictor.as_mut(), &shape),
                Err(PredictorError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_mock_smoke_run_for_every_engine() {
        let configs = vec![
            EngineConfig::Native(NativeConfig::new("/models/m")),
            EngineConfig::Anakin(AnakinConfig::new("/models/m", "net.onnx")),
            EngineConfig::AutoMixedTensorRt(TensorRtConfig {
                max_batch_size: 2,
                ..TensorRtConfig::new("/models/m")
            }),
            EngineConfig::Analysis(inference_api::AnalysisConfig::new("/models/m")),
        ];

        for config in configs {
            let mut predictor = build_predictor(&config, true).unwrap();
            assert_eq!(predictor.engine_kind(), config.kind());

            let summary = smoke_run(predictor.as_mut(), &[2, 3]).unwrap();
            assert_eq!(summary.len(), 1);
            assert_eq!(summary[0].name, "x_out");
            assert_eq!(summary[0].shape, vec![2, 3]);
            assert_eq!(summary[0].bytes, 24);
        }
    }

    #[test]
    fn test_sample_configs_load() {
        use inference_api::PaddleEngineKind;

        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs");
        let samples = [
            ("native.toml", PaddleEngineKind::Native),
            ("analysis.toml", PaddleEngineKind::Analysis),
            ("tensorrt.toml", PaddleEngineKind::AutoMixedTensorRt),
        ];

        for (file, kind) in samples {
            let config = inference_api::load_config(dir.join(file)).unwrap();
            assert_eq!(config.kind(), kind);
            assert!(build_predictor(&config, true).is_ok());
        }
    }

    #[test]
    fn test_preallocated_policy_needs_outputs() {
        let config = EngineConfig::Native(
            NativeConfig::new("/models/m").with_output_policy(OutputPolicy::Preallocated),
        );
        let mut predictor = build_predictor(&config, true).unwrap();
        assert!(matches!(
            smoke_run(predictor.as_mut(), &[1]),
            Err(PredictorError::OutputCount { .. })
        ));
    }
}
