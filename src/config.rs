//! Configuration management for the question-answering service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// Model and tokenizer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Where the ONNX model file lives (downloaded here if missing)
    pub model_path: PathBuf,
    /// Download location for the model; empty (the default) means the file must
    /// already be at `model_path`
    pub model_url: String,
    /// Where the `tokenizer.json` lives (downloaded here if missing)
    pub tokenizer_path: PathBuf,
    /// Download location for the tokenizer; empty disables downloading
    pub tokenizer_url: String,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
    /// Token sequences longer than this are truncated
    pub max_sequence_length: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(
                "models/bert-large-uncased-whole-word-masking-finetuned-squad.onnx",
            ),
            model_url: String::new(),
            tokenizer_path: PathBuf::from("models/tokenizer.json"),
            tokenizer_url: "https://huggingface.co/google-bert/bert-large-uncased-whole-word-masking-finetuned-squad/resolve/main/tokenizer.json".to_string(),
            onnx_threads: 1,
            max_sequence_length: 512,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path.
    ///
    /// The file is optional; `BERT_QA__MODEL__ONNX_THREADS=4` style
    /// environment variables override it.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("BERT_QA").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
