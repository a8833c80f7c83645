//! Layer Normalization and the "Add & Norm" step
//!
//! ```text
//! 1. mean = E[x] = sum(x) / N
//! 2. var = E[(x - mean)²] = sum((x - mean)²) / N
//! 3. x_norm = (x - mean) / √(var + ε)
//! 4. y = γ * x_norm + β
//! ```
//!
//! Statistics are taken over the last (feature) dimension, independently for
//! every batch and sequence position.
//!
//! The original Transformer wraps each sublayer as
//! `LayerNorm(x + Sublayer(x))` (post-norm). [`add_and_norm`] implements that
//! wrapping, and degrades to the bare sublayer output when no norm is given.

use super::Layer;
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use rayon::prelude::*;

/// Layer normalization layer
///
/// Normalizes activations across the feature dimension and applies a
/// scale and shift.
#[derive(Clone, Debug)]
pub struct LayerNorm {
    pub gamma: Tensor, // Scale parameter [d_model]
    pub beta: Tensor,  // Shift parameter [d_model]
    pub eps: f32,      // Small constant for numerical stability
}

impl LayerNorm {
    /// Create a new layer normalization layer
    ///
    /// gamma starts at 1.0 and beta at 0.0, so a fresh layer is a pure
    /// normalization.
    pub fn new(normalized_shape: usize, eps: f32) -> Self {
        Self {
            gamma: Tensor::ones(vec![normalized_shape]),
            beta: Tensor::zeros(vec![normalized_shape]),
            eps,
        }
    }

    /// Normalize along the last dimension
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let dim = self.gamma.numel();
        if x.last_dim() != dim {
            return Err(Error::ShapeMismatch {
                op: "layer_norm",
                left: x.shape.clone(),
                right: self.gamma.shape.clone(),
            });
        }
        if dim == 0 {
            return Ok(x.clone());
        }

        let mut out = x.data.clone();
        out.par_chunks_mut(dim).for_each(|row| {
            let mean = row.iter().sum::<f32>() / dim as f32;
            let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / dim as f32;
            let inv_std = 1.0 / (var + self.eps).sqrt();
            for (i, v) in row.iter_mut().enumerate() {
                *v = (*v - mean) * inv_std * self.gamma.data[i] + self.beta.data[i];
            }
        });

        Tensor::new(out, x.shape.clone())
    }
}

impl Layer for LayerNorm {
    fn name(&self) -> &'static str {
        "LayerNorm"
    }

    fn parameter_count(&self) -> usize {
        self.gamma.numel() + self.beta.numel()
    }
}

/// Residual connection followed by layer normalization
///
/// Returns `norm(residual + sublayer_out)`, or `sublayer_out` unchanged when
/// `norm` is `None`.
pub fn add_and_norm(
    residual: &Tensor,
    sublayer_out: Tensor,
    norm: Option<&LayerNorm>,
) -> Result<Tensor> {
    match norm {
        Some(norm) => norm.forward(&residual.add(&sublayer_out)?),
        None => Ok(sublayer_out),
    }
}
