//! Tokenizer capability and its HuggingFace `tokenizers` implementation

use crate::error::{QaError, Result};
use crate::types::{EncodedToken, TokenDescriptor};
use std::path::Path;
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::info;

/// What the answer extractor needs from a tokenizer
pub trait QaTokenizer: Send + Sync {
    /// Split `text` into tokens, special tokens included
    fn tokenize(&self, text: &str) -> Result<Vec<TokenDescriptor>>;

    /// Encode `text` into exactly `token_count` (id, mask, type) triples
    fn encode(&self, token_count: usize, text: &str) -> Result<Vec<EncodedToken>>;

    /// Vocabulary string for an id
    fn id_to_token(&self, vocabulary_index: u32) -> Option<String>;
}

/// BERT wordpiece tokenizer loaded from a `tokenizer.json`
pub struct BertTokenizer {
    inner: Tokenizer,
}

impl BertTokenizer {
    /// Load from a `tokenizer.json` file, truncating encodings to `max_length` tokens
    pub fn from_file<P: AsRef<Path>>(path: P, max_length: usize) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            QaError::Tokenization(format!("Cannot load tokenizer from '{}': {}", path.display(), e))
        })?;
        info!(path = %path.display(), max_length = max_length, "Tokenizer loaded");
        Self::from_tokenizer(tokenizer, max_length)
    }

    /// Wrap an already-built tokenizer
    pub fn from_tokenizer(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| QaError::Tokenization(format!("Invalid truncation: {e}")))?;
        tokenizer.with_padding(None);
        Ok(Self { inner: tokenizer })
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    fn encoding(&self, text: &str) -> Result<Encoding> {
        self.inner
            .encode(text, true)
            .map_err(|e| QaError::Tokenization(e.to_string()))
    }
}

impl QaTokenizer for BertTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenDescriptor>> {
        let encoding = self.encoding(text)?;
        Ok(encoding
            .get_tokens()
            .iter()
            .zip(encoding.get_ids())
            .enumerate()
            .map(|(position, (value, &id))| TokenDescriptor {
                value: value.clone(),
                vocabulary_index: id,
                position,
            })
            .collect())
    }

    fn encode(&self, token_count: usize, text: &str) -> Result<Vec<EncodedToken>> {
        let encoding = self.encoding(text)?;
        let ids = encoding.get_ids();
        let mask = encoding.get_attention_mask();
        let type_ids = encoding.get_type_ids();

        // Positions past the encoding are padding
        Ok((0..token_count)
            .map(|i| EncodedToken {
                input_id: ids.get(i).copied().unwrap_or(0) as i64,
                attention_mask: mask.get(i).copied().unwrap_or(0) as i64,
                token_type_id: type_ids.get(i).copied().unwrap_or(0) as i64,
            })
            .collect())
    }

    fn id_to_token(&self, vocabulary_index: u32) -> Option<String> {
        self.inner.id_to_token(vocabulary_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::wordlevel_tokenizer;

    #[test]
    fn test_tokenize_adds_special_tokens() {
        let tokenizer = BertTokenizer::from_tokenizer(wordlevel_tokenizer(), 512).unwrap();
        let tokens = tokenizer.tokenize("The sky is blue.").unwrap();

        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["[CLS]", "the", "sky", "is", "blue", ".", "[SEP]"]);
        assert_eq!(tokens[0].vocabulary_index, 101);
        assert!(tokens.iter().enumerate().all(|(i, t)| t.position == i));
    }

    #[test]
    fn test_encode_matches_token_count() {
        let tokenizer = BertTokenizer::from_tokenizer(wordlevel_tokenizer(), 512).unwrap();
        let text = "What color is the sky?";
        let count = tokenizer.tokenize(text).unwrap().len();

        let encoded = tokenizer.encode(count, text).unwrap();
        assert_eq!(encoded.len(), count);
        assert!(encoded.iter().all(|t| t.attention_mask == 1 && t.token_type_id == 0));
        assert_eq!(encoded[0].input_id, 101);
    }

    #[test]
    fn test_encode_pads_past_encoding() {
        let tokenizer = BertTokenizer::from_tokenizer(wordlevel_tokenizer(), 512).unwrap();
        let encoded = tokenizer.encode(10, "blue").unwrap();

        assert_eq!(encoded.len(), 10);
        assert_eq!(encoded[9].input_id, 0);
        assert_eq!(encoded[9].attention_mask, 0);
    }

    #[test]
    fn test_truncation_keeps_tokens_and_encoding_aligned() {
        let tokenizer = BertTokenizer::from_tokenizer(wordlevel_tokenizer(), 4).unwrap();
        let text = "the sky is blue and the grass is green";

        let tokens = tokenizer.tokenize(text).unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokenizer.encode(tokens.len(), text).unwrap().len(), 4);
    }

    #[test]
    fn test_id_to_token() {
        let tokenizer = BertTokenizer::from_tokenizer(wordlevel_tokenizer(), 512).unwrap();
        let blue = tokenizer.tokenize("blue").unwrap()[1].vocabulary_index;

        assert_eq!(tokenizer.id_to_token(blue).as_deref(), Some("blue"));
        assert_eq!(tokenizer.id_to_token(999_999), None);
    }

    #[test]
    fn test_missing_file_is_tokenization_error() {
        let result = BertTokenizer::from_file("does/not/exist/tokenizer.json", 512);
        assert!(matches!(result, Err(QaError::Tokenization(_))));
    }
}
