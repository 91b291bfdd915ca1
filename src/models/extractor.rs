//! Answer extraction: one question over one passage, end to end

use crate::error::{Checkpoint, QaError, Result};
use crate::metrics::QaMetrics;
use crate::models::gate::InferenceGate;
use crate::models::tokenizer::QaTokenizer;
use crate::types::{AnswerSpan, EncodedInput, ModelOutput, TokenDescriptor};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lifecycle of a single answer request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Tokenizing,
    InvokingModel,
    Decoding,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Created => "created",
            RequestState::Tokenizing => "tokenizing",
            RequestState::InvokingModel => "invoking_model",
            RequestState::Decoding => "decoding",
            RequestState::Completed => "completed",
            RequestState::Cancelled => "cancelled",
            RequestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The text the tokenizer sees: question and context as one JSON record
#[derive(Serialize)]
struct QuestionRecord<'a> {
    question: &'a str,
    context: &'a str,
}

/// Index of the first maximal element.
///
/// NaN never wins; a slice of only NaN yields 0. Empty slices yield `None`.
pub fn argmax(logits: &[f32]) -> Option<usize> {
    if logits.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in logits.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((i, value)),
        }
    }

    Some(best.map(|(i, _)| i).unwrap_or(0))
}

/// Pick the answer span from the model outputs.
///
/// The first output holds start logits and the last holds end logits; anything
/// in between is ignored.
pub fn decode_span(outputs: &[ModelOutput]) -> Result<AnswerSpan> {
    let (start_logits, end_logits) = match (outputs.first(), outputs.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(QaError::MalformedOutput("model produced no outputs".to_string())),
    };

    if outputs.len() > 2 {
        debug!(ignored = outputs.len() - 2, "Ignoring intermediate model outputs");
    }

    let start = argmax(&start_logits.values).ok_or_else(|| {
        QaError::MalformedOutput(format!("output '{}' is empty", start_logits.name))
    })?;
    let end = argmax(&end_logits.values).ok_or_else(|| {
        QaError::MalformedOutput(format!("output '{}' is empty", end_logits.name))
    })?;

    Ok(AnswerSpan::new(start, end))
}

fn checkpoint(cancel: &CancellationToken, at: Checkpoint) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(QaError::Cancelled(at));
    }
    Ok(())
}

/// Runs the question-answering pipeline against a shared [`InferenceGate`].
///
/// Cheap to clone; each request runs on tokio's blocking pool.
#[derive(Clone)]
pub struct AnswerExtractor {
    gate: Arc<InferenceGate>,
    tokenizer: Arc<dyn QaTokenizer>,
    metrics: Arc<QaMetrics>,
}

impl AnswerExtractor {
    pub fn new(
        gate: Arc<InferenceGate>,
        tokenizer: Arc<dyn QaTokenizer>,
        metrics: Arc<QaMetrics>,
    ) -> Self {
        Self {
            gate,
            tokenizer,
            metrics,
        }
    }

    /// Answer `question` from `context` on a blocking worker.
    ///
    /// Fails with [`QaError::NotReady`] before any work when the gate has no model.
    pub async fn answer(
        &self,
        context: &str,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<String> {
        self.ensure_ready()?;

        let worker = self.clone();
        let context = context.to_owned();
        let question = question.to_owned();
        tokio::task::spawn_blocking(move || worker.process(&context, &question, &cancel))
            .await
            .map_err(|e| {
                self.metrics.record_failed();
                QaError::Worker(e.to_string())
            })?
    }

    /// Same as [`answer`](Self::answer) but on the calling thread
    pub fn answer_blocking(
        &self,
        context: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.ensure_ready()?;
        self.process(context, question, cancel)
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.gate.is_ready() {
            self.metrics.record_not_ready();
            return Err(QaError::NotReady);
        }
        Ok(())
    }

    fn process(&self, context: &str, question: &str, cancel: &CancellationToken) -> Result<String> {
        let started = Instant::now();
        self.metrics.record_request();

        let mut state = RequestState::Created;
        let result = self.pipeline(context, question, cancel, &mut state);

        let final_state = match &result {
            Ok(_) => RequestState::Completed,
            Err(e) if e.is_cancelled() => RequestState::Cancelled,
            Err(_) => RequestState::Failed,
        };
        debug!(
            from = %state,
            to = %final_state,
            elapsed_us = started.elapsed().as_micros(),
            "Request finished"
        );

        match &result {
            Ok(_) => self.metrics.record_answered(started.elapsed()),
            Err(e) if e.is_cancelled() => self.metrics.record_cancelled(),
            Err(_) => self.metrics.record_failed(),
        }
        result
    }

    fn pipeline(
        &self,
        context: &str,
        question: &str,
        cancel: &CancellationToken,
        state: &mut RequestState,
    ) -> Result<String> {
        advance(state, RequestState::Tokenizing);
        let record = serde_json::to_string(&QuestionRecord { question, context })
            .map_err(|e| QaError::Tokenization(e.to_string()))?;
        let tokens = self.tokenizer.tokenize(&record)?;
        let encoded = EncodedInput::from_tokens(&self.tokenizer.encode(tokens.len(), &record)?)?;

        checkpoint(cancel, Checkpoint::BeforeTensors)?;
        let tensors = encoded.to_tensors();

        advance(state, RequestState::InvokingModel);
        checkpoint(cancel, Checkpoint::BeforeInference)?;
        let outputs = self.gate.run(tensors)?;
        checkpoint(cancel, Checkpoint::AfterInference)?;

        advance(state, RequestState::Decoding);
        self.decode_answer(&outputs, &tokens, cancel)
    }

    /// Span decode, last cancellation check, then the answer string
    fn decode_answer(
        &self,
        outputs: &[ModelOutput],
        tokens: &[TokenDescriptor],
        cancel: &CancellationToken,
    ) -> Result<String> {
        let span = decode_span(outputs)?;
        debug!(start = span.start, end = span.end, tokens = tokens.len(), "Decoded answer span");

        checkpoint(cancel, Checkpoint::BeforeOutput)?;
        self.render(span, tokens)
    }

    fn render(&self, span: AnswerSpan, tokens: &[TokenDescriptor]) -> Result<String> {
        let words = span
            .select(tokens)
            .iter()
            .map(|token| {
                self.tokenizer.id_to_token(token.vocabulary_index).ok_or_else(|| {
                    QaError::Tokenization(format!(
                        "unknown vocabulary index {}",
                        token.vocabulary_index
                    ))
                })
            })
            .collect::<Result<Vec<String>>>()?;

        Ok(words.join(" "))
    }
}

fn advance(state: &mut RequestState, next: RequestState) {
    debug!(from = %state, to = %next, "Request state");
    *state = next;
}
