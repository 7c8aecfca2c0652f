//! Background generation jobs.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::generator::{GenerationHooks, GenerationOutcome, ScheduleGenerator};
use crate::error::EngineError;
use crate::models::GenerationRequest;

/// A schedule generation running on tokio's blocking pool.
///
/// Must be spawned from within a tokio runtime.
#[derive(Debug)]
pub struct GenerationJob {
    ward_id: String,
    cancel: CancellationToken,
    progress: watch::Receiver<u8>,
    handle: JoinHandle<Result<GenerationOutcome, EngineError>>,
}

impl GenerationJob {
    /// Starts generating `request` in the background.
    pub fn spawn(generator: ScheduleGenerator, request: GenerationRequest) -> Self {
        Self::spawn_with_token(generator, request, CancellationToken::new())
    }

    /// Starts a job that also stops when `cancel` fires.
    pub fn spawn_with_token(
        generator: ScheduleGenerator,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, progress) = watch::channel(0u8);
        let ward_id = request.ward_id.clone();
        let token = cancel.clone();
        debug!(ward = %ward_id, "generation job spawned");

        let handle = tokio::task::spawn_blocking(move || {
            let mut sink = tx;
            let hooks = GenerationHooks::default()
                .with_cancel(token)
                .with_progress(&mut sink);
            generator.generate_with(&request, hooks)
        });

        Self {
            ward_id,
            cancel,
            progress,
            handle,
        }
    }

    /// Ward the job is generating for.
    pub fn ward_id(&self) -> &str {
        &self.ward_id
    }

    /// Requests cancellation. The job ends with `EngineError::Cancelled`
    /// unless it has already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this job.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receiver of progress percentages.
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.clone()
    }

    /// Latest reported progress.
    pub fn current_progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Whether the job has stopped running.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the job's result.
    ///
    /// # Errors
    /// The generation error, or `Worker` if the blocking task panicked.
    pub async fn wait(self) -> Result<GenerationOutcome, EngineError> {
        self.handle.await?
    }
}
