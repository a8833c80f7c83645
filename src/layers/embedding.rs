//! Token Embeddings and Positional Encoding
//!
//! ## Token Embedding
//!
//! A lookup table `[vocab_size, d_model]`: each token id selects one row.
//!
//! ```text
//! Input:  [batch, seq_len]  (token IDs)
//! Output: [batch, seq_len, d_model]
//! ```
//!
//! ## Sinusoidal Positional Encoding
//!
//! Attention itself is order-agnostic, so position information is added to
//! the embeddings. The encoding is fixed, not learned:
//!
//! ```text
//! PE(pos, 2i)   = sin(pos / 10000^(2i / d_model))
//! PE(pos, 2i+1) = cos(pos / 10000^(2i / d_model))
//! ```
//!
//! Embeddings are scaled by √d_model before the encoding is added, so the two
//! have comparable magnitude.

use super::init::{normal, EMBEDDING_STD};
use super::Layer;
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use rand::Rng;

/// Token embedding layer
#[derive(Clone, Debug)]
pub struct Embedding {
    /// Embedding weight matrix: [vocab_size, d_model]
    pub weight: Tensor,
}

impl Embedding {
    /// Create a new embedding table initialized from N(0, 0.02)
    pub fn new<R: Rng + ?Sized>(vocab_size: usize, d_model: usize, rng: &mut R) -> Self {
        Self {
            weight: Tensor::from_parts(
                normal(vocab_size * d_model, EMBEDDING_STD, rng),
                vec![vocab_size, d_model],
            ),
        }
    }

    pub fn vocab_size(&self) -> usize {
        self.weight.shape[0]
    }

    pub fn d_model(&self) -> usize {
        self.weight.shape[1]
    }

    /// Look up embeddings for a batch of token id sequences
    ///
    /// # Errors
    ///
    /// - [`Error::RaggedBatch`] if the batch or its sequences are empty, or sequences differ
    ///   in length
    /// - [`Error::TokenOutOfRange`] for an id >= vocab_size
    pub fn forward(&self, token_ids: &[Vec<usize>]) -> Result<Tensor> {
        let (batch_size, seq_len) = batch_dims(token_ids)?;
        let d_model = self.d_model();
        let vocab_size = self.vocab_size();

        let mut output = Vec::with_capacity(batch_size * seq_len * d_model);
        for &token in token_ids.iter().flatten() {
            if token >= vocab_size {
                return Err(Error::TokenOutOfRange { token, vocab_size });
            }
            let start = token * d_model;
            output.extend_from_slice(&self.weight.data[start..start + d_model]);
        }

        Tensor::new(output, vec![batch_size, seq_len, d_model])
    }
}

impl Layer for Embedding {
    fn name(&self) -> &'static str {
        "Embedding"
    }

    fn parameter_count(&self) -> usize {
        self.weight.numel()
    }
}

/// `(batch, seq_len)` of a rectangular token batch
///
/// # Errors
///
/// [`Error::RaggedBatch`] if the batch has no sequences, a sequence has no
/// tokens, or the sequences differ in length.
pub fn batch_dims(token_ids: &[Vec<usize>]) -> Result<(usize, usize)> {
    let seq_len = token_ids.first().map(Vec::len).ok_or(Error::RaggedBatch)?;
    if seq_len == 0 || token_ids.iter().any(|seq| seq.len() != seq_len) {
        return Err(Error::RaggedBatch);
    }
    Ok((token_ids.len(), seq_len))
}

/// Fixed sinusoidal positional encoding
#[derive(Clone, Debug)]
pub struct PositionalEncoding {
    /// Precomputed table: [max_len, d_model]
    pub table: Tensor,
}

impl PositionalEncoding {
    pub fn new(max_len: usize, d_model: usize) -> Self {
        let mut data = Vec::with_capacity(max_len * d_model);
        for pos in 0..max_len {
            for i in 0..d_model {
                // Pairs (2i, 2i+1) share one frequency
                let exponent = (2 * (i / 2)) as f32 / d_model as f32;
                let angle = pos as f32 / 10_000f32.powf(exponent);
                data.push(if i % 2 == 0 { angle.sin() } else { angle.cos() });
            }
        }
        Self {
            table: Tensor::from_parts(data, vec![max_len, d_model]),
        }
    }

    pub fn max_len(&self) -> usize {
        self.table.shape[0]
    }

    /// Add the encoding for positions `0..seq_len` to `x` [batch, seq_len, d_model]
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        if x.rank() != 3 {
            return Err(Error::Unsupported(format!(
                "positional encoding expects [batch, seq, d_model], got {:?}",
                x.shape
            )));
        }
        let seq_len = x.shape[1];
        if seq_len > self.max_len() {
            return Err(Error::SequenceTooLong {
                len: seq_len,
                max: self.max_len(),
            });
        }

        let d_model = self.table.shape[1];
        let rows = Tensor::new(
            self.table.data[..seq_len * d_model].to_vec(),
            vec![seq_len, d_model],
        )?;
        x.add(&rows)
    }
}

impl Layer for PositionalEncoding {
    fn name(&self) -> &'static str {
        "PositionalEncoding"
    }

    /// The table is fixed, not learned
    fn parameter_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lookup_copies_rows() {
        let mut rng = StdRng::seed_from_u64(1);
        let emb = Embedding::new(10, 4, &mut rng);
        let out = emb.forward(&[vec![3, 3, 7]]).unwrap();
        assert_eq!(out.shape, vec![1, 3, 4]);
        assert_eq!(&out.data[0..4], &emb.weight.data[12..16]);
        assert_eq!(&out.data[0..4], &out.data[4..8]);
    }

    #[test]
    fn test_token_out_of_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let emb = Embedding::new(10, 4, &mut rng);
        let err = emb.forward(&[vec![1, 10]]).unwrap_err();
        assert!(matches!(
            err,
            Error::TokenOutOfRange {
                token: 10,
                vocab_size: 10
            }
        ));
    }

    #[test]
    fn test_ragged_batch() {
        assert!(matches!(batch_dims(&[]), Err(Error::RaggedBatch)));
        assert!(matches!(
            batch_dims(&[vec![1, 2], vec![3]]),
            Err(Error::RaggedBatch)
        ));
        assert_eq!(batch_dims(&[vec![1, 2], vec![3, 4]]).unwrap(), (2, 2));
    }

    #[test]
    fn test_empty_sequences_rejected() {
        assert!(matches!(batch_dims(&[vec![]]), Err(Error::RaggedBatch)));
        assert!(matches!(
            batch_dims(&[vec![], vec![]]),
            Err(Error::RaggedBatch)
        ));

        let mut rng = StdRng::seed_from_u64(1);
        let emb = Embedding::new(10, 4, &mut rng);
        assert!(matches!(emb.forward(&[vec![]]), Err(Error::RaggedBatch)));
    }

    #[test]
    fn test_positional_values() {
        let pe = PositionalEncoding::new(4, 6);
        // Position 0: sin(0) = 0, cos(0) = 1
        assert_eq!(&pe.table.data[0..6], &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        // Position 1, dim 0: sin(1)
        assert!((pe.table.data[6] - 1f32.sin()).abs() < 1e-6);
    }

    #[test]
    fn test_positional_too_long() {
        let pe = PositionalEncoding::new(4, 2);
        let err = pe.forward(&Tensor::zeros(vec![1, 5, 2])).unwrap_err();
        assert!(matches!(err, Error::SequenceTooLong { len: 5, max: 4 }));
    }

    #[test]
    fn test_positional_broadcasts_over_batch() {
        let pe = PositionalEncoding::new(8, 2);
        let y = pe.forward(&Tensor::zeros(vec![2, 3, 2])).unwrap();
        assert_eq!(&y.data[0..6], &y.data[6..12]);
        assert_eq!(pe.parameter_count(), 0);
    }
}
