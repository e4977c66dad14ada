//! Shared predictor machinery
//!
//! Every backend predictor wraps a `PredictorCore`: it matches inputs to the
//! program, validates them, resolves the batch size, executes, and applies
//! the output buffer policy.

use crate::program::Program;
use inference_api::{
    OutputPolicy, PaddleEngineKind, PaddleTensor, PredictorError, WriteError,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Per-instance execution counters. Never shared between clones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionState {
    /// Completed runs
    pub runs: u64,
    /// Runs that returned an error
    pub failures: u64,
    /// Batch size of the last successful run
    pub last_batch_size: Option<usize>,
}

/// Execution settings derived from a backend config
#[derive(Debug, Clone, Copy)]
pub(crate) struct CoreOptions {
    pub output_policy: OutputPolicy,
    pub match_by_name: bool,
    pub max_batch_size: Option<usize>,
}

pub(crate) struct PredictorCore {
    kind: PaddleEngineKind,
    program: Arc<dyn Program>,
    options: CoreOptions,
    state: ExecutionState,
}

impl PredictorCore {
    pub fn new(kind: PaddleEngineKind, program: Arc<dyn Program>, options: CoreOptions) -> Self {
        Self {
            kind,
            program,
            options,
            state: ExecutionState::default(),
        }
    }

    /// Same program, fresh state
    pub fn fork(&self) -> Self {
        debug!("Cloning {} predictor", self.kind);
        Self::new(self.kind, Arc::clone(&self.program), self.options)
    }

    pub fn kind(&self) -> PaddleEngineKind {
        self.kind
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn input_names(&self) -> Vec<String> {
        self.program.input_names().to_vec()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.program.output_names().to_vec()
    }

    pub fn run(
        &mut self,
        inputs: &[PaddleTensor<'_>],
        outputs: &mut Vec<PaddleTensor<'_>>,
        batch_size: Option<usize>,
    ) -> Result<(), PredictorError> {
        let start = Instant::now();
        let result = self.execute(inputs, outputs, batch_size);
        let elapsed = start.elapsed();
        let engine = self.kind.as_str();

        metrics::histogram!("paddle_predictor_run_seconds", "engine" => engine)
            .record(elapsed.as_secs_f64());

        match result {
            Ok(batch) => {
                self.state.runs += 1;
                self.state.last_batch_size = batch;
                metrics::counter!("paddle_predictor_runs_total", "engine" => engine).increment(1);
                debug!(
                    "{} run completed in {}us (batch={:?})",
                    engine,
                    elapsed.as_micros(),
                    batch
                );
                Ok(())
            }
            Err(e) => {
                self.state.failures += 1;
                metrics::counter!("paddle_predictor_failures_total", "engine" => engine)
                    .increment(1);
                warn!("{} run failed: {}", engine, e);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        inputs: &[PaddleTensor<'_>],
        outputs: &mut Vec<PaddleTensor<'_>>,
        batch_size: Option<usize>,
    ) -> Result<Option<usize>, PredictorError> {
        let ordered = self.order_inputs(inputs)?;
        for tensor in &ordered {
            tensor.validate()?;
        }
        let batch = self.resolve_batch(&ordered, batch_size)?;

        let results = self.program.run(&ordered)?;
        self.write_outputs(results, outputs)?;
        Ok(batch)
    }

    /// Arrange inputs in program order, by position or by name
    fn order_inputs<'t, 'a>(
        &self,
        inputs: &'t [PaddleTensor<'a>],
    ) -> Result<Vec<&'t PaddleTensor<'a>>, PredictorError> {
        let names = self.program.input_names();
        if inputs.len() != names.len() {
            return Err(PredictorError::InputCount {
                expected: names.len(),
                actual: inputs.len(),
            });
        }

        if !self.options.match_by_name {
            return Ok(inputs.iter().collect());
        }

        if let Some(unknown) = inputs.iter().find(|t| !names.contains(&t.name)) {
            return Err(PredictorError::UnknownInput(unknown.name.clone()));
        }
        names
            .iter()
            .map(|name| {
                inputs.iter().find(|t| &t.name == name).ok_or_else(|| {
                    PredictorError::InvalidInput(format!("missing input '{}'", name))
                })
            })
            .collect()
    }

    fn resolve_batch(
        &self,
        inputs: &[&PaddleTensor<'_>],
        requested: Option<usize>,
    ) -> Result<Option<usize>, PredictorError> {
        if requested == Some(0) {
            return Err(PredictorError::InvalidInput("batch size must be positive".to_string()));
        }
        let batch = requested.or_else(|| inputs.first().and_then(|t| t.batch_size()));

        if let (Some(batch), Some(max)) = (batch, self.options.max_batch_size) {
            if batch > max {
                return Err(PredictorError::BatchTooLarge { batch, max });
            }
        }
        Ok(batch)
    }

    fn write_outputs(
        &self,
        results: Vec<PaddleTensor<'static>>,
        outputs: &mut Vec<PaddleTensor<'_>>,
    ) -> Result<(), PredictorError> {
        match self.options.output_policy {
            OutputPolicy::Allocate => {
                outputs.clear();
                outputs.extend(results);
                Ok(())
            }
            OutputPolicy::Preallocated => {
                if outputs.len() != results.len() {
                    return Err(PredictorError::OutputCount {
                        expected: results.len(),
                        actual: outputs.len(),
                    });
                }
                for (slot, result) in outputs.iter_mut().zip(results) {
                    slot.data
                        .write_from(result.data.as_slice())
                        .map_err(|e| match e {
                            WriteError::ReadOnly => PredictorError::ReadOnlyOutput(result.name.clone()),
                            WriteError::TooSmall { required, available } => {
                                PredictorError::OutputBufferTooSmall {
                                    name: result.name.clone(),
                                    required,
                                    available,
                                }
                            }
                        })?;
                    slot.name = result.name;
                    slot.shape = result.shape;
                    slot.dtype = result.dtype;
                    slot.lod = result.lod;
                }
                Ok(())
            }
        }
    }
}

/// Reject GPU requests: predictors execute on the host CPU
pub(crate) fn ensure_cpu(kind: PaddleEngineKind, use_gpu: bool, device: u32) -> Result<(), PredictorError> {
    if use_gpu {
        return Err(PredictorError::UnsupportedDevice(format!(
            "{} predictor: GPU device {} requested, only CPU execution is available",
            kind, device
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::IdentityProgram;
    use inference_api::{PaddleBuf, PaddleDType};

    fn core(options: CoreOptions) -> PredictorCore {
        PredictorCore::new(
            PaddleEngineKind::Native,
            Arc::new(IdentityProgram::new(["a", "b"])),
            options,
        )
    }

    fn allocate() -> CoreOptions {
        CoreOptions {
            output_policy: OutputPolicy::Allocate,
            match_by_name: false,
            max_batch_size: None,
        }
    }

    fn inputs() -> Vec<PaddleTensor<'static>> {
        vec![
            PaddleTensor::from_f32("a", vec![2, 1], &[1.0, 2.0]),
            PaddleTensor::from_i64("b", vec![2], &[3, 4]),
        ]
    }

    #[test]
    fn test_allocate_policy_replaces_outputs() {
        let mut core = core(allocate());
        let mut outputs = vec![PaddleTensor::from_f32("stale", vec![1], &[0.0])];

        core.run(&inputs(), &mut outputs, None).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].name, "a_out");
        assert!(outputs[0].data.is_owned());
        assert_eq!(core.state().runs, 1);
        assert_eq!(core.state().last_batch_size, Some(2));
    }

    #[test]
    fn test_preallocated_writes_into_caller_memory() {
        let mut core = core(CoreOptions {
            output_policy: OutputPolicy::Preallocated,
            ..allocate()
        });
        let mut region = [0u8; 16];
        let mut outputs = vec![
            PaddleTensor::new("", vec![], PaddleDType::Float32, PaddleBuf::borrowed_mut(&mut region)),
            PaddleTensor::new("", vec![], PaddleDType::Float32, PaddleBuf::with_len(1)),
        ];

        core.run(&inputs(), &mut outputs, None).unwrap();
        assert_eq!(outputs[0].data.len(), 8);
        assert!(!outputs[0].data.is_owned());
        assert_eq!(outputs[1].dtype, PaddleDType::Int64);
        assert_eq!(outputs[1].data.to_i64_vec().unwrap(), vec![3, 4]);
        drop(outputs);

        assert_eq!(&region[..4], &1.0f32.to_ne_bytes());
        assert_eq!(&region[8..], &[0u8; 8]);
    }

    #[test]
    fn test_preallocated_errors() {
        let mut core = core(CoreOptions {
            output_policy: OutputPolicy::Preallocated,
            ..allocate()
        });

        let mut outputs = Vec::new();
        assert!(matches!(
            core.run(&inputs(), &mut outputs, None),
            Err(PredictorError::OutputCount { expected: 2, actual: 0 })
        ));

        let mut small = [0u8; 4];
        let mut outputs = vec![
            PaddleTensor::new("", vec![], PaddleDType::Float32, PaddleBuf::borrowed_mut(&mut small)),
            PaddleTensor::default(),
        ];
        assert!(matches!(
            core.run(&inputs(), &mut outputs, None),
            Err(PredictorError::OutputBufferTooSmall { required: 8, available: 4, .. })
        ));

        let frozen = [0u8; 16];
        let mut outputs = vec![
            PaddleTensor::new("", vec![], PaddleDType::Float32, PaddleBuf::borrowed(&frozen)),
            PaddleTensor::default(),
        ];
        assert!(matches!(
            core.run(&inputs(), &mut outputs, None),
            Err(PredictorError::ReadOnlyOutput(_))
        ));
        assert_eq!(core.state().failures, 3);
    }

    #[test]
    fn test_match_by_name_reorders() {
        let mut core = core(CoreOptions {
            match_by_name: true,
            ..allocate()
        });
        let mut reversed = inputs();
        reversed.reverse();

        let mut outputs = Vec::new();
        core.run(&reversed, &mut outputs, None).unwrap();
        assert_eq!(outputs[0].name, "a_out");
        assert_eq!(outputs[0].dtype, PaddleDType::Float32);

        let unknown = vec![
            PaddleTensor::from_f32("a", vec![1], &[1.0]),
            PaddleTensor::from_f32("z", vec![1], &[1.0]),
        ];
        assert!(matches!(
            core.run(&unknown, &mut outputs, None),
            Err(PredictorError::UnknownInput(name)) if name == "z"
        ));

        let duplicated = vec![
            PaddleTensor::from_f32("a", vec![1], &[1.0]),
            PaddleTensor::from_f32("a", vec![1], &[1.0]),
        ];
        assert!(matches!(
            core.run(&duplicated, &mut outputs, None),
            Err(PredictorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_input_count_and_validation() {
        let mut core = core(allocate());
        let mut outputs = Vec::new();

        let one = vec![PaddleTensor::from_f32("a", vec![1], &[1.0])];
        assert!(matches!(
            core.run(&one, &mut outputs, None),
            Err(PredictorError::InputCount { expected: 2, actual: 1 })
        ));

        let malformed = vec![
            PaddleTensor::from_f32("a", vec![3], &[1.0]),
            PaddleTensor::from_i64("b", vec![1], &[1]),
        ];
        assert!(matches!(
            core.run(&malformed, &mut outputs, None),
            Err(PredictorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_batch_limits() {
        let mut core = core(CoreOptions {
            max_batch_size: Some(2),
            ..allocate()
        });
        let mut outputs = Vec::new();

        core.run(&inputs(), &mut outputs, None).unwrap();
        assert!(matches!(
            core.run(&inputs(), &mut outputs, Some(3)),
            Err(PredictorError::BatchTooLarge { batch: 3, max: 2 })
        ));
        assert!(matches!(
            core.run(&inputs(), &mut outputs, Some(0)),
            Err(PredictorError::InvalidInput(_))
        ));

        core.run(&inputs(), &mut outputs, Some(1)).unwrap();
        assert_eq!(core.state().last_batch_size, Some(1));
    }

    #[test]
    fn test_fork_shares_program_not_state() {
        let program = Arc::new(IdentityProgram::new(["a", "b"]));
        let mut original = PredictorCore::new(PaddleEngineKind::Native, program.clone(), allocate());
        original.run(&inputs(), &mut Vec::new(), None).unwrap();

        let forked = original.fork();
        assert_eq!(forked.state(), &ExecutionState::default());
        assert_eq!(Arc::strong_count(&program), 3);

        drop(original);
        drop(forked);
        assert_eq!(Arc::strong_count(&program), 1);
    }

    #[test]
    fn test_ensure_cpu() {
        assert!(ensure_cpu(PaddleEngineKind::Native, false, 0).is_ok());
        assert!(matches!(
            ensure_cpu(PaddleEngineKind::Native, true, 1),
            Err(PredictorError::UnsupportedDevice(_))
        ));
    }
}
