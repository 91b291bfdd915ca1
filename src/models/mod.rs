//! Model-side components: runtime, tokenizer, gate and answer extraction

pub mod extractor;
pub mod gate;
pub mod loader;
pub mod runtime;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod testing;

pub use extractor::{AnswerExtractor, RequestState};
pub use gate::InferenceGate;
pub use loader::ModelLoader;
pub use runtime::{InferenceSession, SessionLoader};
pub use tokenizer::{BertTokenizer, QaTokenizer};
