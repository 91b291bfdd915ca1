//! Runtime-neutral tensors passed across the inference boundary

/// Model input name for token ids
pub const INPUT_IDS: &str = "input_ids";
/// Model input name for the attention mask
pub const INPUT_MASK: &str = "input_mask";
/// Model input name for token type ids
pub const SEGMENT_IDS: &str = "segment_ids";

/// Dense `i64` tensor with batch size fixed at 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTensor {
    pub name: &'static str,
    pub shape: [usize; 2],
    pub data: Vec<i64>,
}

impl InputTensor {
    /// Row-major `[1, len]` tensor over `values`
    pub fn row(name: &'static str, values: &[i64]) -> Self {
        Self {
            name,
            shape: [1, values.len()],
            data: values.to_vec(),
        }
    }
}

/// One named model output flattened to its float values
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub name: String,
    pub values: Vec<f32>,
}

impl ModelOutput {
    pub fn new(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}
