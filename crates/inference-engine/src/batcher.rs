//! Inference Batcher

use inference_api::{PaddlePredictor, PaddleTensor, PredictorError};
use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Outputs of one request, or the error its run returned
pub type InferenceReply = Result<Vec<PaddleTensor<'static>>, PredictorError>;

/// A queued inference call
pub struct InferenceRequest {
    /// Owned input tensors
    pub inputs: Vec<PaddleTensor<'static>>,
    /// Batch size override, `None` to infer
    pub batch_size: Option<usize>,
    /// Where the outputs are sent
    pub reply: oneshot::Sender<InferenceReply>,
}

/// Cloneable sender side of a batcher
#[derive(Clone)]
pub struct BatcherHandle {
    sender: mpsc::Sender<InferenceRequest>,
}

impl BatcherHandle {
    /// Queue `inputs` and wait for the outputs
    pub async fn infer(
        &self,
        inputs: Vec<PaddleTensor<'static>>,
        batch_size: Option<usize>,
    ) -> InferenceReply {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(InferenceRequest {
                inputs,
                batch_size,
                reply,
            })
            .await
            .map_err(|_| PredictorError::Inference("batcher stopped".to_string()))?;

        response
            .await
            .map_err(|_| PredictorError::Inference("batcher dropped the request".to_string()))?
    }
}

/// Collects queued requests and runs each one of a batch on its own
/// predictor clone, concurrently on tokio's blocking pool.
///
/// Outputs are always allocated by the predictor, so the predictor must use
/// `OutputPolicy::Allocate`.
pub struct InferenceBatcher {
    /// Channel receiver for incoming requests
    receiver: mpsc::Receiver<InferenceRequest>,
    /// Batch size threshold, also the number of predictor clones
    batch_size: usize,
    /// Timeout for batch collection (ms)
    timeout_ms: u64,
}

impl InferenceBatcher {
    /// Create a new batcher
    pub fn new(receiver: mpsc::Receiver<InferenceRequest>, batch_size: usize, timeout_ms: u64) -> Self {
        info!("Creating inference batcher: batch_size={}, timeout={}ms", batch_size, timeout_ms);
        Self {
            receiver,
            batch_size: batch_size.max(1),
            timeout_ms,
        }
    }

    /// Create a handle/batcher pair
    pub fn channel(batch_size: usize, timeout_ms: u64) -> (BatcherHandle, Self) {
        let (tx, rx) = mpsc::channel(batch_size.max(1) * 2);
        (BatcherHandle { sender: tx }, Self::new(rx, batch_size, timeout_ms))
    }

    /// Run the batcher loop until every handle is dropped.
    ///
    /// `predictor` is cloned once per batch slot; the clones share its
    /// weights.
    pub async fn run(&mut self, predictor: Box<dyn PaddlePredictor>) -> Result<(), PredictorError> {
        info!("Starting inference batcher on {} predictor", predictor.engine_kind());

        let mut idle = (0..self.batch_size)
            .map(|_| predictor.clone_predictor())
            .collect::<Result<Vec<_>, _>>()?;

        loop {
            let mut batch = Vec::with_capacity(self.batch_size);
            let timeout_duration = Duration::from_millis(self.timeout_ms);

            // Wait for first request
            match self.receiver.recv().await {
                Some(request) => batch.push(request),
                None => {
                    debug!("Batcher channel closed");
                    break;
                }
            }

            // Try to collect more until batch is full or timeout
            while batch.len() < self.batch_size {
                match timeout(timeout_duration, self.receiver.recv()).await {
                    Ok(Some(request)) => batch.push(request),
                    Ok(None) => break, // Channel closed
                    Err(_) => break,   // Timeout
                }
            }

            debug!("Processing batch of {} requests", batch.len());

            let workers: Vec<_> = idle.drain(..batch.len()).collect();
            let tasks: Vec<_> = batch
                .into_iter()
                .zip(workers)
                .map(|(request, worker)| task::spawn_blocking(move || serve(worker, request)))
                .collect();

            for task in tasks {
                match task.await {
                    Ok(worker) => idle.push(worker),
                    Err(e) => {
                        warn!("Batch worker failed: {}", e);
                        idle.push(predictor.clone_predictor()?);
                    }
                }
            }
        }

        info!("Inference batcher stopped");
        Ok(())
    }
}

/// Run one request and hand the worker back
fn serve(mut worker: Box<dyn PaddlePredictor>, request: InferenceRequest) -> Box<dyn PaddlePredictor> {
    let mut outputs = Vec::new();
    let result = worker
        .run(&request.inputs, &mut outputs, request.batch_size)
        .map(|()| outputs);
    if request.reply.send(result).is_err() {
        debug!("Requester went away before the reply");
    }
    worker
}
