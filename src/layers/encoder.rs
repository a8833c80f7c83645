//! Encoder Layer and Encoder Stack
//!
//! ## Encoder Layer
//!
//! ```text
//! x ─→ MultiHeadAttention(x, x, x) ─→ [Add & Norm] ─→ FeedForward ─→ [Add & Norm] ─→ out
//! │                                     ↑          │                  ↑
//! └─────────────────────────────────────┘          └──────────────────┘
//! ```
//!
//! The same tensor is fed as query, key and value. The Add & Norm steps are
//! present when the layer is built with `add_norm`; without them the layer
//! is the bare composition of attention and feed-forward.
//!
//! ## Encoder
//!
//! ```text
//! token ids [batch, src_len]
//!     ↓  Embedding × √d_model + PositionalEncoding
//! [batch, src_len, d_model]
//!     ↓  EncoderLayer × n_layers
//! [batch, src_len, d_model]
//! ```

use super::embedding::{Embedding, PositionalEncoding};
use super::feed_forward::FeedForward;
use super::layer_norm::{add_and_norm, LayerNorm};
use super::multi_head::MultiHeadAttention;
use super::Layer;
use crate::config::Config;
use crate::error::Result;
use crate::tensor::Tensor;
use rand::Rng;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct EncoderLayer {
    pub self_attn: MultiHeadAttention,
    pub ffn: FeedForward,
    pub norm1: Option<LayerNorm>,
    pub norm2: Option<LayerNorm>,
}

impl EncoderLayer {
    pub fn new<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self> {
        let norm = || {
            config
                .add_norm
                .then(|| LayerNorm::new(config.d_model, config.layer_norm_eps))
        };
        Ok(Self {
            self_attn: MultiHeadAttention::new(
                config.d_model,
                config.n_heads,
                config.output_projection,
                rng,
            )?,
            ffn: FeedForward::new(config.d_model, config.d_ff, rng),
            norm1: norm(),
            norm2: norm(),
        })
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor [batch, seq_len, d_model]
    ///
    /// # Returns
    ///
    /// Output tensor [batch, seq_len, d_model]
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let attn = self.self_attn.forward(x, x, None)?;
        let x = add_and_norm(x, attn, self.norm1.as_ref())?;

        let ffn = self.ffn.forward(&x)?;
        add_and_norm(&x, ffn, self.norm2.as_ref())
    }
}

impl Layer for EncoderLayer {
    fn name(&self) -> &'static str {
        "EncoderLayer"
    }

    fn parameter_count(&self) -> usize {
        let norms: usize = [&self.norm1, &self.norm2]
            .into_iter()
            .flatten()
            .map(Layer::parameter_count)
            .sum();
        self.self_attn.parameter_count() + self.ffn.parameter_count() + norms
    }
}

/// Embedding, positional encoding and a stack of encoder layers
#[derive(Clone, Debug)]
pub struct Encoder {
    pub embedding: Embedding,
    pub positional: PositionalEncoding,
    pub layers: Vec<EncoderLayer>,
}

impl Encoder {
    pub fn new<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self> {
        let embedding = Embedding::new(config.input_vocab_size, config.d_model, rng);
        let layers = (0..config.n_layers)
            .map(|_| EncoderLayer::new(config, rng))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embedding,
            positional: PositionalEncoding::new(config.max_seq_len, config.d_model),
            layers,
        })
    }

    /// Encode a batch of source token ids
    ///
    /// # Returns
    ///
    /// Encoder output [batch, src_len, d_model]
    pub fn forward(&self, src_ids: &[Vec<usize>]) -> Result<Tensor> {
        let x = self.embedding.forward(src_ids)?;
        let scale = (self.embedding.d_model() as f32).sqrt();
        let mut x = self.positional.forward(&x.mul_scalar(scale))?;

        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x)?;
            debug!(layer = i, shape = ?x.shape, "encoder layer");
        }
        Ok(x)
    }
}

impl Layer for Encoder {
    fn name(&self) -> &'static str {
        "Encoder"
    }

    fn parameter_count(&self) -> usize {
        let layers: usize = self.layers.iter().map(Layer::parameter_count).sum();
        self.embedding.parameter_count() + self.positional.parameter_count() + layers
    }
}
