//! tract-backed programs

use crate::program::Program;
use inference_api::{PaddleBuf, PaddleDType, PaddleTensor, PredictorError};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// How far a model is lowered before it becomes runnable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPipeline {
    /// Typed graph as imported
    Typed,
    /// Typed graph with declutter rewrites
    Decluttered,
    /// Declutter plus codegen optimizations
    Optimized,
}

impl ModelPipeline {
    fn apply(self, model: TypedModel) -> TractResult<TypedModel> {
        match self {
            ModelPipeline::Typed => Ok(model),
            ModelPipeline::Decluttered => model.into_decluttered(),
            ModelPipeline::Optimized => model.into_optimized(),
        }
    }
}

/// Model executed by tract
pub struct TractProgram {
    plan: Arc<TypedRunnableModel<TypedModel>>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl TractProgram {
    /// Load an ONNX model file
    pub fn load(path: &Path, pipeline: ModelPipeline) -> Result<Self, PredictorError> {
        info!("Loading model {} ({:?})", path.display(), pipeline);
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.into_typed())
            .map_err(|e| PredictorError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_typed(model, pipeline)
    }

    /// Build from a typed graph
    pub fn from_typed(model: TypedModel, pipeline: ModelPipeline) -> Result<Self, PredictorError> {
        let model = pipeline
            .apply(model)
            .map_err(|e| PredictorError::ModelLoad(e.to_string()))?;

        let inputs = outlet_names(&model, model.input_outlets())?;
        let outputs = outlet_names(&model, model.output_outlets())?;

        let plan = model
            .into_runnable()
            .map_err(|e| PredictorError::ModelLoad(e.to_string()))?;
        debug!("Model ready: inputs={:?} outputs={:?}", inputs, outputs);

        Ok(Self {
            plan: Arc::new(plan),
            inputs,
            outputs,
        })
    }
}

fn outlet_names(model: &TypedModel, outlets: TractResult<&[OutletId]>) -> Result<Vec<String>, PredictorError> {
    let outlets = outlets.map_err(|e| PredictorError::ModelLoad(e.to_string()))?;
    Ok(outlets
        .iter()
        .map(|outlet| {
            let name = &model.node(outlet.node).name;
            if outlet.slot == 0 {
                name.clone()
            } else {
                format!("{}:{}", name, outlet.slot)
            }
        })
        .collect())
}

impl Program for TractProgram {
    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }

    fn run(&self, inputs: &[&PaddleTensor<'_>]) -> Result<Vec<PaddleTensor<'static>>, PredictorError> {
        let values = inputs
            .iter()
            .map(|tensor| to_tract(tensor).map(TValue::from))
            .collect::<Result<TVec<TValue>, PredictorError>>()?;

        let results = self
            .plan
            .run(values)
            .map_err(|e| PredictorError::Inference(e.to_string()))?;

        results
            .iter()
            .zip(&self.outputs)
            .map(|(value, name)| from_tract(name, value))
            .collect()
    }
}

/// Copy an API tensor into a tract tensor
pub fn to_tract(tensor: &PaddleTensor<'_>) -> Result<Tensor, PredictorError> {
    let converted = match tensor.dtype {
        PaddleDType::Float32 => Tensor::from_shape::<f32>(&tensor.shape, &tensor.data.to_f32_vec()?),
        PaddleDType::Int64 => Tensor::from_shape::<i64>(&tensor.shape, &tensor.data.to_i64_vec()?),
    };
    converted.map_err(|e| PredictorError::InvalidInput(format!("{}: {}", tensor.name, e)))
}

/// Copy a tract tensor into an owned API tensor
pub fn from_tract(name: &str, value: &Tensor) -> Result<PaddleTensor<'static>, PredictorError> {
    let shape = value.shape().to_vec();
    let convert = |e: TractError| PredictorError::Inference(format!("{}: {}", name, e));

    let (dtype, data) = match value.datum_type() {
        DatumType::F32 => (
            PaddleDType::Float32,
            PaddleBuf::from_f32_slice(value.as_slice::<f32>().map_err(convert)?),
        ),
        DatumType::I64 => (
            PaddleDType::Int64,
            PaddleBuf::from_i64_slice(value.as_slice::<i64>().map_err(convert)?),
        ),
        other => {
            return Err(PredictorError::UnsupportedDType(format!(
                "output '{}' has type {:?}",
                name, other
            )))
        }
    };

    Ok(PaddleTensor::new(name, shape, dtype, data))
}
