//! Predicted answer span over the token sequence

use crate::types::encoding::TokenDescriptor;

/// Start and end token positions picked by the decoder.
///
/// `end < start` is representable and selects no tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerSpan {
    pub start: usize,
    pub end: usize,
}

impl AnswerSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of tokens covered, zero when the span is inverted
    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tokens from `start`, `end + 1 - start` of them, clipped to the sequence
    pub fn select<'a>(&self, tokens: &'a [TokenDescriptor]) -> &'a [TokenDescriptor] {
        let from = self.start.min(tokens.len());
        let to = (self.start + self.len()).min(tokens.len());
        &tokens[from..to]
    }
}
