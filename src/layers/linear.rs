//! Linear Layer (Fully Connected)
//!
//! The linear layer is the fundamental building block of every sublayer
//! here. It performs an affine transformation: y = x @ W + b
//!
//! ```text
//! Input:  x [batch, seq_len, in_features]
//! Weight: W [in_features, out_features]
//! Bias:   b [out_features]
//! Output: y = x @ W + b [batch, seq_len, out_features]
//! ```
//!
//! The same weight matrix is applied at every batch and sequence position.

use super::init::glorot_uniform;
use super::Layer;
use crate::error::Result;
use crate::tensor::Tensor;
use rand::Rng;

/// Linear layer (fully connected)
///
/// - W: weight matrix [in_features, out_features]
/// - b: bias vector [out_features]
#[derive(Clone, Debug)]
pub struct Linear {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl Linear {
    /// Create a new linear layer
    ///
    /// Weights use Glorot uniform initialization, bias starts at zero.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Self {
            weight: Tensor::from_parts(
                glorot_uniform(in_features, out_features, rng),
                vec![in_features, out_features],
            ),
            bias: Tensor::zeros(vec![out_features]),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape[0]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape[1]
    }

    /// Forward pass: y = x @ W + b
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor [..., in_features]
    ///
    /// # Returns
    ///
    /// Output tensor [..., out_features]
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        x.matmul(&self.weight)?.add(&self.bias)
    }
}

impl Layer for Linear {
    fn name(&self) -> &'static str {
        "Linear"
    }

    fn parameter_count(&self) -> usize {
        self.weight.numel() + self.bias.numel()
    }
}
