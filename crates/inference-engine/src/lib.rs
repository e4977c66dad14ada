//! Paddle Inference Engine
//!
//! Predictor backends for the inference API, executed by tract-onnx.
//! One predictor per engine kind, a compile-time factory keyed by engine
//! marker types, runtime dispatch from a tagged config, and an async
//! request batcher.

mod anakin;
mod analysis;
mod batcher;
mod engine;
mod factory;
mod native;
mod program;
mod tensorrt;
mod tract;

pub use anakin::AnakinPredictor;
pub use analysis::{pipeline_for, resolve_passes, AnalysisPredictor, PASS_CATALOG};
pub use batcher::{BatcherHandle, InferenceBatcher, InferenceReply, InferenceRequest};
pub use engine::ExecutionState;
pub use factory::{
    create_paddle_predictor, create_predictor, Anakin, Analysis, AutoMixedTensorRt, Native,
};
pub use native::NativePredictor;
pub use program::{resolve_model_file, IdentityProgram, Program, MODEL_FILE_CANDIDATES};
pub use tensorrt::AutoMixedTensorRtPredictor;
pub use tract::{from_tract, to_tract, ModelPipeline, TractProgram};
