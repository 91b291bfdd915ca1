//! Test doubles for the tokenizer and inference-runtime capabilities

use crate::error::Result;
use crate::models::runtime::{InferenceSession, SessionLoader};
use crate::models::tokenizer::QaTokenizer;
use crate::types::{EncodedToken, InputTensor, ModelOutput, TokenDescriptor, INPUT_IDS};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokenizers::Tokenizer;

const WORDS: &[&str] = &[
    "the", "sky", "is", "blue", "what", "color", "grass", "green", "and", "question", "context",
    ".", "?", "{\"", "\":\"", "\",\"", "\"}", "?\",\"", ".\"}",
];

/// Word-level BERT-style tokenizer JSON with `[CLS]`/`[SEP]` post-processing
pub fn wordlevel_tokenizer_json() -> String {
    let mut vocab = serde_json::json!({
        "[PAD]":  0,
        "[UNK]":  100,
        "[CLS]":  101,
        "[SEP]":  102,
        "[MASK]": 103,
    });
    for (i, word) in WORDS.iter().enumerate() {
        vocab[*word] = serde_json::json!(1000 + i);
    }

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0,   "content": "[PAD]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 100, "content": "[UNK]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 101, "content": "[CLS]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 102, "content": "[SEP]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 103, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 102],
            "cls": ["[CLS]", 101]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    })
    .to_string()
}

pub fn wordlevel_tokenizer() -> Tokenizer {
    Tokenizer::from_str(&wordlevel_tokenizer_json()).expect("valid tokenizer json")
}

/// Whitespace tokenizer that counts how often it is asked to tokenize
#[derive(Default)]
pub struct CountingTokenizer {
    vocab: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl CountingTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, word: &str) -> u32 {
        let mut vocab = self.vocab.lock().unwrap();
        match vocab.iter().position(|w| w == word) {
            Some(i) => i as u32,
            None => {
                vocab.push(word.to_string());
                (vocab.len() - 1) as u32
            }
        }
    }
}

impl QaTokenizer for CountingTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text
            .split_whitespace()
            .enumerate()
            .map(|(position, word)| TokenDescriptor {
                value: word.to_string(),
                vocabulary_index: self.index_of(word),
                position,
            })
            .collect())
    }

    fn encode(&self, token_count: usize, text: &str) -> Result<Vec<EncodedToken>> {
        Ok(text
            .split_whitespace()
            .take(token_count)
            .map(|word| EncodedToken {
                input_id: self.index_of(word) as i64,
                attention_mask: 1,
                token_type_id: 0,
            })
            .collect())
    }

    fn id_to_token(&self, vocabulary_index: u32) -> Option<String> {
        self.vocab.lock().unwrap().get(vocabulary_index as usize).cloned()
    }
}

type Script = Box<dyn FnMut(&[InputTensor]) -> anyhow::Result<Vec<ModelOutput>> + Send>;

/// Counters shared between a [`ScriptedSession`] and the test that owns it
#[derive(Default)]
pub struct SessionStats {
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl SessionStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Session whose outputs come from a closure over the input tensors
pub struct ScriptedSession {
    script: Script,
    delay: Duration,
    stats: Arc<SessionStats>,
}

impl ScriptedSession {
    pub fn new<F>(script: F) -> Self
    where
        F: FnMut(&[InputTensor]) -> anyhow::Result<Vec<ModelOutput>> + Send + 'static,
    {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Session returning fixed start/end logits
    pub fn fixed(start: Vec<f32>, end: Vec<f32>) -> Self {
        Self::new(move |_| {
            Ok(vec![
                ModelOutput::new("start_logits", start.clone()),
                ModelOutput::new("end_logits", end.clone()),
            ])
        })
    }

    /// Session peaking both heads at the first input id equal to `target`
    pub fn peak_at_id(target: i64) -> Self {
        Self::new(move |inputs| {
            let ids = &inputs
                .iter()
                .find(|t| t.name == INPUT_IDS)
                .ok_or_else(|| anyhow::anyhow!("missing input_ids"))?
                .data;
            let logits: Vec<f32> = ids
                .iter()
                .map(|&id| if id == target { 9.0 } else { 0.0 })
                .collect();
            Ok(vec![
                ModelOutput::new("start_logits", logits.clone()),
                ModelOutput::new("end_logits", logits),
            ])
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }
}

impl InferenceSession for ScriptedSession {
    fn run(&mut self, inputs: Vec<InputTensor>) -> anyhow::Result<Vec<ModelOutput>> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let result = (self.script)(&inputs);

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Loader handing out one prepared session
pub struct ScriptedLoader {
    session: Mutex<Option<ScriptedSession>>,
    pub loads: AtomicUsize,
}

impl ScriptedLoader {
    pub fn new(session: ScriptedSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            loads: AtomicUsize::new(0),
        }
    }
}

impl SessionLoader for ScriptedLoader {
    fn load(&self, _path: &Path) -> anyhow::Result<Box<dyn InferenceSession>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let session = self
            .session
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("session already loaded"))?;
        Ok(Box::new(session))
    }
}
