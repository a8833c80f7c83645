//! Multi-Head Attention
//!
//! Instead of one attention operation over the full width, several smaller
//! heads run independently and their outputs are concatenated:
//!
//! ```text
//! d_model = 512, n_heads = 8  →  head_dim = 64
//!
//! head_0(x) [b, s, 64] ┐
//! head_1(x) [b, s, 64] ├─ concat → [b, s, 512] ─→ (optional W_o) → [b, s, 512]
//!   ...                │
//! head_7(x) [b, s, 64] ┘
//! ```
//!
//! Each head has its own Q/K/V projections, so each can learn a different
//! attention pattern. Heads share nothing and are evaluated in parallel.

use super::attention::SelfAttention;
use super::linear::Linear;
use super::Layer;
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use rand::Rng;
use rayon::prelude::*;

/// A list of attention heads whose outputs are concatenated
#[derive(Clone, Debug)]
pub struct MultiHeadAttention {
    pub heads: Vec<SelfAttention>,
    /// Optional `d_model -> d_model` projection after concatenation
    pub out_proj: Option<Linear>,
    pub d_model: usize,
}

impl MultiHeadAttention {
    /// Create `n_heads` heads of width `d_model / n_heads`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if `n_heads` is zero or does not divide
    /// `d_model`.
    pub fn new<R: Rng + ?Sized>(
        d_model: usize,
        n_heads: usize,
        output_projection: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if n_heads == 0 || d_model % n_heads != 0 {
            return Err(Error::InvalidConfig(format!(
                "d_model ({}) must be divisible by n_heads ({})",
                d_model, n_heads
            )));
        }

        let head_dim = d_model / n_heads;
        let heads = (0..n_heads)
            .map(|_| SelfAttention::new(d_model, head_dim, rng))
            .collect();
        let out_proj = output_projection.then(|| Linear::new(d_model, d_model, rng));

        Ok(Self {
            heads,
            out_proj,
            d_model,
        })
    }

    pub fn n_heads(&self) -> usize {
        self.heads.len()
    }

    pub fn head_dim(&self) -> usize {
        self.d_model / self.heads.len().max(1)
    }

    /// Run every head and concatenate along the feature axis
    ///
    /// # Arguments
    ///
    /// * `query` - [batch, q_len, d_model]
    /// * `key_value` - [batch, k_len, d_model]
    /// * `mask` - Optional [q_len, k_len] mask shared by all heads
    ///
    /// # Returns
    ///
    /// Output tensor [batch, q_len, d_model]
    pub fn forward(&self, query: &Tensor, key_value: &Tensor, mask: Option<&Tensor>) -> Result<Tensor> {
        let outputs = self
            .heads
            .par_iter()
            .map(|head| head.forward(query, key_value, mask))
            .collect::<Result<Vec<_>>>()?;

        let concat = Tensor::concat_last(&outputs)?;
        match &self.out_proj {
            Some(proj) => proj.forward(&concat),
            None => Ok(concat),
        }
    }
}

impl Layer for MultiHeadAttention {
    fn name(&self) -> &'static str {
        "MultiHeadAttention"
    }

    fn parameter_count(&self) -> usize {
        let heads: usize = self.heads.iter().map(Layer::parameter_count).sum();
        heads + self.out_proj.as_ref().map_or(0, Layer::parameter_count)
    }
}
