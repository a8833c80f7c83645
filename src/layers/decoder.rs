//! Decoder Layer and Decoder Stack
//!
//! ## Decoder Layer
//!
//! Three sublayers, each optionally wrapped in Add & Norm:
//!
//! ```text
//! x ─→ MultiHeadAttention(x, x, look-ahead mask)       masked self-attention
//!   ─→ MultiHeadAttention(query=·, key/value=encoder)  cross-attention
//!   ─→ FeedForward
//! ```
//!
//! The look-ahead mask keeps position `i` from seeing target positions after
//! `i`. Cross-attention has no mask: every target position may look at the
//! whole source sequence.
//!
//! ## Decoder
//!
//! Embedding × √d_model + PositionalEncoding, then `n_layers` decoder layers.
//! The look-ahead mask is built once per forward pass and shared by every
//! layer.

use super::attention::look_ahead_mask;
use super::embedding::{Embedding, PositionalEncoding};
use super::feed_forward::FeedForward;
use super::layer_norm::{add_and_norm, LayerNorm};
use super::multi_head::MultiHeadAttention;
use super::Layer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use rand::Rng;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct DecoderLayer {
    pub self_attn: MultiHeadAttention,
    pub cross_attn: MultiHeadAttention,
    pub ffn: FeedForward,
    pub norm1: Option<LayerNorm>,
    pub norm2: Option<LayerNorm>,
    pub norm3: Option<LayerNorm>,
}

impl DecoderLayer {
    pub fn new<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self> {
        let norm = || {
            config
                .add_norm
                .then(|| LayerNorm::new(config.d_model, config.layer_norm_eps))
        };
        let attention = |rng: &mut R| {
            MultiHeadAttention::new(config.d_model, config.n_heads, config.output_projection, rng)
        };

        Ok(Self {
            self_attn: attention(rng)?,
            cross_attn: attention(rng)?,
            ffn: FeedForward::new(config.d_model, config.d_ff, rng),
            norm1: norm(),
            norm2: norm(),
            norm3: norm(),
        })
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Decoder input [batch, tgt_len, d_model]
    /// * `enc_output` - Encoder output [batch, src_len, d_model]
    /// * `mask` - Look-ahead mask [tgt_len, tgt_len]
    ///
    /// # Returns
    ///
    /// Output tensor [batch, tgt_len, d_model]
    pub fn forward(&self, x: &Tensor, enc_output: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let attn = self.self_attn.forward(x, x, Some(mask))?;
        let x = add_and_norm(x, attn, self.norm1.as_ref())?;

        let cross = self.cross_attn.forward(&x, enc_output, None)?;
        let x = add_and_norm(&x, cross, self.norm2.as_ref())?;

        let ffn = self.ffn.forward(&x)?;
        add_and_norm(&x, ffn, self.norm3.as_ref())
    }
}

impl Layer for DecoderLayer {
    fn name(&self) -> &'static str {
        "DecoderLayer"
    }

    fn parameter_count(&self) -> usize {
        let norms: usize = [&self.norm1, &self.norm2, &self.norm3]
            .into_iter()
            .flatten()
            .map(Layer::parameter_count)
            .sum();
        self.self_attn.parameter_count()
            + self.cross_attn.parameter_count()
            + self.ffn.parameter_count()
            + norms
    }
}

/// Embedding, positional encoding and a stack of decoder layers
#[derive(Clone, Debug)]
pub struct Decoder {
    pub embedding: Embedding,
    pub positional: PositionalEncoding,
    pub layers: Vec<DecoderLayer>,
}

impl Decoder {
    pub fn new<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self> {
        let embedding = Embedding::new(config.target_vocab_size, config.d_model, rng);
        let layers = (0..config.n_layers)
            .map(|_| DecoderLayer::new(config, rng))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embedding,
            positional: PositionalEncoding::new(config.max_seq_len, config.d_model),
            layers,
        })
    }

    /// Decode target token ids conditioned on the encoder output
    ///
    /// # Errors
    ///
    /// [`Error::BatchMismatch`] if `tgt_ids` and `enc_output` disagree on
    /// batch size.
    ///
    /// # Returns
    ///
    /// Decoder output [batch, tgt_len, d_model]
    pub fn forward(&self, tgt_ids: &[Vec<usize>], enc_output: &Tensor) -> Result<Tensor> {
        let encoder_batch = enc_output.shape.first().copied().unwrap_or(0);
        if tgt_ids.len() != encoder_batch {
            return Err(Error::BatchMismatch {
                encoder: encoder_batch,
                decoder: tgt_ids.len(),
            });
        }

        let x = self.embedding.forward(tgt_ids)?;
        let scale = (self.embedding.d_model() as f32).sqrt();
        let mut x = self.positional.forward(&x.mul_scalar(scale))?;

        let mask = look_ahead_mask(x.shape[1]);
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x, enc_output, &mask)?;
            debug!(layer = i, shape = ?x.shape, "decoder layer");
        }
        Ok(x)
    }
}

impl Layer for Decoder {
    fn name(&self) -> &'static str {
        "Decoder"
    }

    fn parameter_count(&self) -> usize {
        let layers: usize = self.layers.iter().map(Layer::parameter_count).sum();
        self.embedding.parameter_count() + self.positional.parameter_count() + layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> Config {
        Config {
            d_model: 16,
            n_heads: 2,
            d_ff: 32,
            n_layers: 2,
            input_vocab_size: 20,
            target_vocab_size: 30,
            max_seq_len: 12,
            add_norm: true,
            output_projection: true,
            layer_norm_eps: 1e-6,
        }
    }

    #[test]
    fn test_decoder_layer_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DecoderLayer::new(&Config::toy(), &mut rng).unwrap();
        let x = Tensor::ones(vec![1, 7, 512]);
        let memory = Tensor::ones(vec![1, 9, 512]);
        let y = layer.forward(&x, &memory, &look_ahead_mask(7)).unwrap();
        assert_eq!(y.shape, vec![1, 7, 512]);
    }

    #[test]
    fn test_earlier_positions_ignore_later_tokens() {
        let mut rng = StdRng::seed_from_u64(11);
        let decoder = Decoder::new(&small_config(), &mut rng).unwrap();
        let memory = Tensor::new((0..80).map(|i| (i as f32 * 0.1).sin()).collect(), vec![1, 5, 16])
            .unwrap();

        let a = decoder.forward(&[vec![1, 2, 3, 4]], &memory).unwrap();
        let b = decoder.forward(&[vec![1, 2, 9, 17]], &memory).unwrap();

        // Positions 0 and 1 only see tokens 1 and 2
        let prefix = 2 * 16;
        assert!(a.data[..prefix]
            .iter()
            .zip(&b.data[..prefix])
            .all(|(x, y)| (x - y).abs() < 1e-5));
        assert!(a.data[prefix..]
            .iter()
            .zip(&b.data[prefix..])
            .any(|(x, y)| (x - y).abs() > 1e-4));
    }

    #[test]
    fn test_batch_mismatch() {
        let mut rng = StdRng::seed_from_u64(0);
        let decoder = Decoder::new(&small_config(), &mut rng).unwrap();
        let memory = Tensor::zeros(vec![2, 5, 16]);
        let err = decoder.forward(&[vec![1, 2]], &memory).unwrap_err();
        assert!(matches!(
            err,
            Error::BatchMismatch {
                encoder: 2,
                decoder: 1
            }
        ));
    }

    #[test]
    fn test_parameter_count_matches_parts() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DecoderLayer::new(&small_config(), &mut rng).unwrap();
        let expected = layer.self_attn.parameter_count() * 2
            + layer.ffn.parameter_count()
            + 3 * 2 * 16;
        assert_eq!(layer.parameter_count(), expected);
    }
}
