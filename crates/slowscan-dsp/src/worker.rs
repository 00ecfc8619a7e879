//! Background thread running an analysis job against a shared engine.
//!
//! The engine lives behind a [`parking_lot::Mutex`]: the job locks it for each
//! step, and other threads may lock it between steps to inspect state. Stopping
//! goes through the engine's [`StopToken`] and never needs the lock, so a stop
//! request lands even while the job is inside a blocking read.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::engine::DspEngine;
use crate::session::StopToken;
use crate::{Error, Result};

/// Engine shared between a worker and its owner.
pub type SharedEngine = Arc<Mutex<DspEngine>>;

/// Handle to a running analysis job.
///
/// Dropping the handle requests a stop and joins the thread.
pub struct EngineWorker<T: Send + 'static> {
    engine: SharedEngine,
    stop: StopToken,
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> EngineWorker<T> {
    /// Moves `engine` behind a mutex and runs `job` on a named thread.
    ///
    /// The job should return once the engine stops listening; a stop request
    /// makes every engine call return promptly, so a loop conditioned on
    /// [`DspEngine::is_listening`] exits soon after [`request_stop`](Self::request_stop).
    pub fn spawn<F>(engine: DspEngine, job: F) -> Result<Self>
    where
        F: FnOnce(&Mutex<DspEngine>) -> T + Send + 'static,
    {
        let stop = engine.stop_token();
        let engine = Arc::new(Mutex::new(engine));
        let shared = Arc::clone(&engine);

        let handle = thread::Builder::new()
            .name("slowscan-engine".into())
            .spawn(move || {
                tracing::debug!("engine worker started");
                let out = job(&shared);
                tracing::debug!(state = ?shared.lock().state(), "engine worker finished");
                out
            })
            .map_err(|e| Error::Worker(format!("failed to spawn engine thread: {e}")))?;

        Ok(Self {
            engine,
            stop,
            handle: Some(handle),
        })
    }

    /// Asks the job to stop at its next refill or analysis call.
    pub fn request_stop(&self) {
        tracing::debug!("engine worker stop requested");
        self.stop.request_stop();
    }

    /// Token for requesting a stop from elsewhere, such as a signal handler.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Whether the job has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// The shared engine, for inspection between job steps.
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Waits for the job and returns its output.
    pub fn join(mut self) -> Result<T> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Worker("engine thread panicked".into())),
            None => Err(Error::Worker("engine thread already joined".into())),
        }
    }
}

impl<T: Send + 'static> Drop for EngineWorker<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.request_stop();
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for EngineWorker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineWorker")
            .field("stop_requested", &self.stop.is_stop_requested())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}
