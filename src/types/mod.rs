//! Type definitions shared by the tokenizer, the gate and the extractor

pub mod encoding;
pub mod span;
pub mod tensor;

pub use encoding::{EncodedInput, EncodedToken, TokenDescriptor};
pub use span::AnswerSpan;
pub use tensor::{InputTensor, ModelOutput, INPUT_IDS, INPUT_MASK, SEGMENT_IDS};
