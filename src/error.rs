//! Error type shared by every layer.
//!
//! Forward passes only fail on incompatible inputs, so most variants carry
//! the shapes involved to make the mismatch readable.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Two operands of `op` have shapes that cannot be combined.
    #[error("shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    /// The operation is not defined for the given rank or arguments.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("token id {token} out of range for vocabulary of size {vocab_size}")]
    TokenOutOfRange { token: usize, vocab_size: usize },

    #[error("sequence length {len} exceeds maximum of {max}")]
    SequenceTooLong { len: usize, max: usize },

    /// Encoder output and decoder input disagree on batch size.
    #[error("batch size mismatch: encoder {encoder}, decoder {decoder}")]
    BatchMismatch { encoder: usize, decoder: usize },

    #[error("token batch is empty, or its sequences are empty or differ in length")]
    RaggedBatch,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
