//! Paddle Inference API
//!
//! Data types and contracts shared by every predictor backend:
//! - Owned or borrowed byte buffers and tensor descriptors (with LoD)
//! - Per-backend configuration structs
//! - The `PaddlePredictor` trait and the engine-kind keyed factory

pub mod buffer;
pub mod config;
pub mod dtype;
pub mod factory;
pub mod lod;
pub mod predictor;
pub mod tensor;

mod error;

pub use buffer::{PaddleBuf, WriteError};
pub use config::{
    load_config, AnakinConfig, AnalysisConfig, BaseConfig, EngineConfig, IrPassMode,
    NativeConfig, OutputPolicy, TargetType, TensorRtConfig,
};
pub use dtype::{paddle_dtype_size, PaddleDType};
pub use error::PredictorError;
pub use factory::{CreatePredictor, EngineMarker};
pub use lod::Lod;
pub use predictor::{PaddleEngineKind, PaddlePredictor};
pub use tensor::PaddleTensor;
