//! Activation Functions
//!
//! ## ReLU (Rectified Linear Unit)
//!
//! The feed-forward sublayer of the original Transformer uses ReLU between
//! its two linear maps:
//!
//! ```text
//! ReLU(x) = max(0, x)
//! ```

use crate::tensor::Tensor;

/// ReLU activation, applied element-wise in parallel
pub fn relu(x: &Tensor) -> Tensor {
    x.map(|v| v.max(0.0))
}
