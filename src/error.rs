//! Error types for the question-answering core.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Point in a request where cancellation is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// After tokenization, before tensors are built
    BeforeTensors,
    /// Immediately before the gated model run
    BeforeInference,
    /// Immediately after the model run returns
    AfterInference,
    /// Before the answer string is assembled
    BeforeOutput,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Checkpoint::BeforeTensors => "before tensor build",
            Checkpoint::BeforeInference => "before inference",
            Checkpoint::AfterInference => "after inference",
            Checkpoint::BeforeOutput => "before output",
        };
        f.write_str(name)
    }
}

/// Failure kinds surfaced by the gate, the extractor and the service.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("Model is not initialized")]
    NotReady,

    #[error("Request cancelled ({0})")]
    Cancelled(Checkpoint),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Failed to load model from {}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model download failed: {0}")]
    Download(String),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker failed: {0}")]
    Worker(String),
}

impl QaError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True when the request ended because the caller asked it to.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Nothing in this crate retries; every failure goes straight to the caller.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<reqwest::Error> for QaError {
    fn from(e: reqwest::Error) -> Self {
        Self::Download(e.to_string())
    }
}

/// Result type alias for the question-answering core.
pub type Result<T> = std::result::Result<T, QaError>;
