//! Tokenizer output: token descriptors and the encoded model input

use crate::error::{QaError, Result};
use crate::types::tensor::{InputTensor, INPUT_IDS, INPUT_MASK, SEGMENT_IDS};

/// One token of the tokenized question/context record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    /// Token text as produced by the tokenizer
    pub value: String,
    /// Index into the model vocabulary
    pub vocabulary_index: u32,
    /// Position in the token sequence
    pub position: usize,
}

/// Per-token encoder output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedToken {
    pub input_id: i64,
    pub attention_mask: i64,
    pub token_type_id: i64,
}

/// The three model input sequences for one request.
///
/// All sequences share one length, the token count, which is at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl EncodedInput {
    /// Build from the three sequences, rejecting mismatched or empty input
    pub fn new(
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        token_type_ids: Vec<i64>,
    ) -> Result<Self> {
        if input_ids.is_empty() {
            return Err(QaError::Tokenization("encoding produced no tokens".to_string()));
        }
        if attention_mask.len() != input_ids.len() || token_type_ids.len() != input_ids.len() {
            return Err(QaError::Tokenization(format!(
                "sequence lengths differ: ids={}, mask={}, type_ids={}",
                input_ids.len(),
                attention_mask.len(),
                token_type_ids.len()
            )));
        }

        Ok(Self {
            input_ids,
            attention_mask,
            token_type_ids,
        })
    }

    /// Split a list of (id, mask, type) triples into the three sequences
    pub fn from_tokens(tokens: &[EncodedToken]) -> Result<Self> {
        Self::new(
            tokens.iter().map(|t| t.input_id).collect(),
            tokens.iter().map(|t| t.attention_mask).collect(),
            tokens.iter().map(|t| t.token_type_id).collect(),
        )
    }

    pub fn token_count(&self) -> usize {
        self.input_ids.len()
    }

    pub fn input_ids(&self) -> &[i64] {
        &self.input_ids
    }

    pub fn attention_mask(&self) -> &[i64] {
        &self.attention_mask
    }

    pub fn token_type_ids(&self) -> &[i64] {
        &self.token_type_ids
    }

    /// Named `[1, token_count]` tensors in the order the model declares its inputs
    pub fn to_tensors(&self) -> Vec<InputTensor> {
        vec![
            InputTensor::row(INPUT_IDS, &self.input_ids),
            InputTensor::row(INPUT_MASK, &self.attention_mask),
            InputTensor::row(SEGMENT_IDS, &self.token_type_ids),
        ]
    }
}
