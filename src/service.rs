//! Public question-answering surface: initialize once, answer many

use crate::config::ModelConfig;
use crate::download::ModelFetcher;
use crate::error::{QaError, Result};
use crate::metrics::QaMetrics;
use crate::models::{AnswerExtractor, BertTokenizer, InferenceGate, ModelLoader, SessionLoader};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Question answering over a BERT SQuAD model.
///
/// Owns the [`InferenceGate`]; callers share the service (or an `Arc` of it)
/// instead of a global session.
pub struct QuestionAnswering {
    config: ModelConfig,
    fetcher: ModelFetcher,
    gate: Arc<InferenceGate>,
    extractor: OnceLock<AnswerExtractor>,
    metrics: Arc<QaMetrics>,
}

impl QuestionAnswering {
    /// Create a service backed by ONNX Runtime
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        Ok(Self::with_loader(config.clone(), Arc::new(loader))?)
    }

    /// Create a service with a custom session loader
    pub fn with_loader(config: ModelConfig, loader: Arc<dyn SessionLoader>) -> Result<Self> {
        let metrics = Arc::new(QaMetrics::new());
        Ok(Self {
            config,
            fetcher: ModelFetcher::new()?,
            gate: Arc::new(InferenceGate::new(loader, metrics.clone())),
            extractor: OnceLock::new(),
            metrics,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.extractor.get().is_some()
    }

    pub fn metrics(&self) -> Arc<QaMetrics> {
        self.metrics.clone()
    }

    /// Download the model and tokenizer if needed
    ///
    /// Model downloading is opt-in: with no `model.model_url` the model file must
    /// already exist, and this fails before any network access otherwise.
    pub async fn fetch_artifacts(&self) -> Result<()> {
        if self.config.model_url.is_empty() && !self.config.model_path.exists() {
            return Err(QaError::Download(format!(
                "model file {} not found; place it there or set model.model_url \
                 (BERT_QA__MODEL__MODEL_URL) to download it",
                self.config.model_path.display()
            )));
        }

        self.fetcher
            .ensure_model_present(&self.config.model_url, &self.config.model_path)
            .await?;
        self.fetcher
            .ensure_model_present(&self.config.tokenizer_url, &self.config.tokenizer_path)
            .await?;
        Ok(())
    }

    /// Fetch artifacts, then load the tokenizer and the model.
    ///
    /// Returns `Ok(false)` when `cancel` is set once the artifacts are on disk;
    /// nothing is loaded in that case.
    pub async fn initialize_model(&self, cancel: &CancellationToken) -> Result<bool> {
        if self.is_ready() {
            return Ok(true);
        }

        self.fetch_artifacts().await?;
        if cancel.is_cancelled() {
            info!("Model initialization cancelled");
            return Ok(false);
        }

        let gate = self.gate.clone();
        let config = self.config.clone();
        let cancel = cancel.clone();
        let loaded = tokio::task::spawn_blocking(move || -> Result<Option<BertTokenizer>> {
            let tokenizer =
                BertTokenizer::from_file(&config.tokenizer_path, config.max_sequence_length)?;
            if !gate.initialize(&config.model_path, &cancel)? {
                return Ok(None);
            }
            Ok(Some(tokenizer))
        })
        .await
        .map_err(|e| QaError::Worker(e.to_string()))??;

        let Some(tokenizer) = loaded else {
            return Ok(false);
        };

        info!(vocab_size = tokenizer.vocab_size(), "Question answering ready");
        let _ = self.extractor.set(AnswerExtractor::new(
            self.gate.clone(),
            Arc::new(tokenizer),
            self.metrics.clone(),
        ));
        Ok(true)
    }

    /// Answer `question` from `context`.
    ///
    /// Fails with [`QaError::NotReady`] until [`initialize_model`](Self::initialize_model)
    /// has returned `Ok(true)`.
    pub async fn answer_question(
        &self,
        context: &str,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<String> {
        let Some(extractor) = self.extractor.get() else {
            self.metrics.record_not_ready();
            return Err(QaError::NotReady);
        };
        extractor.answer(context, question, cancel).await
    }
}
