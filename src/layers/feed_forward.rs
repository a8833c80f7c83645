//! Position-wise Feed-Forward Sublayer
//!
//! Two affine maps with a ReLU between them, applied identically at every
//! sequence position:
//!
//! ```text
//! x [.., d_model] → Linear → [.., d_ff] → ReLU → Linear → [.., d_model]
//! ```
//!
//! The original Transformer uses d_ff = 4 × d_model (512 → 2048 → 512).

use super::activation::relu;
use super::linear::Linear;
use super::Layer;
use crate::error::Result;
use crate::tensor::Tensor;
use rand::Rng;

#[derive(Clone, Debug)]
pub struct FeedForward {
    /// First linear layer: [d_model, d_ff]
    pub expand: Linear,
    /// Second linear layer: [d_ff, d_model]
    pub project: Linear,
}

impl FeedForward {
    pub fn new<R: Rng + ?Sized>(d_model: usize, d_ff: usize, rng: &mut R) -> Self {
        Self {
            expand: Linear::new(d_model, d_ff, rng),
            project: Linear::new(d_ff, d_model, rng),
        }
    }

    /// Forward pass: expand → ReLU → project
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let h = relu(&self.expand.forward(x)?);
        self.project.forward(&h)
    }
}

impl Layer for FeedForward {
    fn name(&self) -> &'static str {
        "FeedForward"
    }

    fn parameter_count(&self) -> usize {
        self.expand.parameter_count() + self.project.parameter_count()
    }
}
