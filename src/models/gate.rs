//! Single-slot gate around the loaded model

use crate::error::{QaError, Result};
use crate::metrics::QaMetrics;
use crate::models::runtime::{InferenceSession, SessionLoader};
use crate::types::{InputTensor, ModelOutput};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Owns the one model session and lets exactly one inference touch it at a time.
///
/// The session is created once by [`initialize`](Self::initialize) and never replaced.
/// Every [`run`](Self::run) before that fails with [`QaError::NotReady`].
pub struct InferenceGate {
    loader: Arc<dyn SessionLoader>,
    session: OnceLock<Mutex<Box<dyn InferenceSession>>>,
    metrics: Arc<QaMetrics>,
}

impl InferenceGate {
    pub fn new(loader: Arc<dyn SessionLoader>, metrics: Arc<QaMetrics>) -> Self {
        Self {
            loader,
            session: OnceLock::new(),
            metrics,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.session.get().is_some()
    }

    /// Load the model at `model_path`.
    ///
    /// Returns `Ok(false)` without loading when `cancel` is already set.
    pub fn initialize(&self, model_path: &Path, cancel: &CancellationToken) -> Result<bool> {
        if cancel.is_cancelled() {
            info!(path = %model_path.display(), "Initialization cancelled before model load");
            return Ok(false);
        }
        if self.is_ready() {
            warn!(
                path = %model_path.display(),
                "Model already initialized, keeping loaded session"
            );
            return Ok(true);
        }

        let started = Instant::now();
        let session = self
            .loader
            .load(model_path)
            .map_err(|source| QaError::ModelLoad {
                path: model_path.to_path_buf(),
                source: source.into(),
            })?;

        if self.session.set(Mutex::new(session)).is_err() {
            warn!("Concurrent initialization detected, discarding second session");
        }

        info!(
            path = %model_path.display(),
            load_time_ms = started.elapsed().as_millis(),
            "Inference gate ready"
        );
        Ok(true)
    }

    /// Run the model with exclusive access to the session.
    ///
    /// Blocks until the slot is free. The slot is released on every exit path,
    /// including a panic inside the runtime.
    pub fn run(&self, inputs: Vec<InputTensor>) -> Result<Vec<ModelOutput>> {
        let session = self.session.get().ok_or(QaError::NotReady)?;

        let wait_start = Instant::now();
        // A panic in an earlier run poisons the lock; the session itself is still usable
        let mut slot = session.lock().unwrap_or_else(PoisonError::into_inner);
        let lock_wait = wait_start.elapsed();

        let started = Instant::now();
        let result = slot.run(inputs);
        drop(slot);
        let inference_time = started.elapsed();

        self.metrics.record_lock_wait(lock_wait);
        self.metrics.record_inference(inference_time);
        debug!(
            lock_wait_us = lock_wait.as_micros(),
            inference_time_us = inference_time.as_micros(),
            ok = result.is_ok(),
            "Gated inference finished"
        );

        result.map_err(|e| QaError::Inference(format!("{e:#}")))
    }
}
