//! BERT Question Answering Library
//!
//! Extractive question answering over a text passage with a SQuAD-finetuned
//! BERT model served by ONNX Runtime.

pub mod config;
pub mod download;
pub mod error;
pub mod metrics;
pub mod models;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::{Checkpoint, QaError};
pub use metrics::QaMetrics;
pub use models::{AnswerExtractor, InferenceGate};
pub use service::QuestionAnswering;
pub use tokio_util::sync::CancellationToken;
