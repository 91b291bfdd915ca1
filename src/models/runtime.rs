//! Inference-runtime capability: load a model file, run it on named tensors

use crate::types::{InputTensor, ModelOutput};
use anyhow::Result;
use std::path::Path;

/// A loaded model that can be run on named `[1, n]` tensors.
///
/// `run` takes `&mut self`; ONNX Runtime sessions are not reentrant, so callers
/// serialize access (see [`crate::models::InferenceGate`]).
pub trait InferenceSession: Send {
    /// Run one forward pass. Outputs are returned in the model's declared order.
    fn run(&mut self, inputs: Vec<InputTensor>) -> Result<Vec<ModelOutput>>;
}

/// Creates an [`InferenceSession`] from a model artifact on disk
pub trait SessionLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceSession>>;
}
