//! Self-Attention Mechanism
//!
//! Attention lets each position build its output from every other position,
//! weighted by a learned similarity score.
//!
//! ## Scaled Dot-Product Attention
//!
//! ```text
//! Q, K, V = query @ W_q, key_value @ W_k, key_value @ W_v
//! scores = (Q @ K^T) / √d_k
//! attn_weights = softmax(scores + mask × -1e9)
//! output = attn_weights @ V
//! ```
//!
//! Dividing by √d_k keeps the dot products from growing with the head depth,
//! which would otherwise push softmax into a near one-hot regime.
//!
//! ## Look-Ahead (Causal) Mask
//!
//! In the decoder, position `i` must not see positions after `i`. The mask
//! holds 1.0 at every disallowed `(i, j)` with `j > i`; those scores receive a
//! large negative bias so softmax gives them (numerically) zero weight.
//!
//! ## Self vs. Cross Attention
//!
//! [`SelfAttention::forward`] takes the query source and the key/value source
//! separately. Passing the same tensor twice gives self-attention; passing
//! the encoder output as key/value gives the decoder's cross-attention.

use super::linear::Linear;
use super::Layer;
use crate::error::Result;
use crate::tensor::Tensor;
use rand::Rng;
use tracing::trace;

/// Bias added to masked attention scores before softmax
pub const MASK_BIAS: f32 = -1e9;

/// Create the look-ahead mask for a sequence
///
/// Returns a [seq_len, seq_len] mask where:
/// - 0 = can attend (current or past)
/// - 1 = cannot attend (future)
///
/// For seq_len=4:
/// ```text
/// [0 1 1 1]  position 0 can only see itself
/// [0 0 1 1]  position 1 can see 0,1
/// [0 0 0 1]  position 2 can see 0,1,2
/// [0 0 0 0]  position 3 can see all
/// ```
pub fn look_ahead_mask(seq_len: usize) -> Tensor {
    let mut mask = vec![0.0; seq_len * seq_len];
    for i in 0..seq_len {
        for j in i + 1..seq_len {
            mask[i * seq_len + j] = 1.0;
        }
    }
    Tensor::from_parts(mask, vec![seq_len, seq_len])
}

/// softmax(Q·Kᵗ / √d + mask·(-1e9)) · V
///
/// # Arguments
///
/// * `q` - Queries [batch, q_len, depth]
/// * `k` - Keys [batch, k_len, depth]
/// * `v` - Values [batch, k_len, depth_v]
/// * `mask` - Optional [q_len, k_len] mask, 1.0 where attention is disallowed
///
/// # Returns
///
/// Tuple of (output [batch, q_len, depth_v], weights [batch, q_len, k_len])
pub fn scaled_dot_product_attention(
    q: &Tensor,
    k: &Tensor,
    v: &Tensor,
    mask: Option<&Tensor>,
) -> Result<(Tensor, Tensor)> {
    let depth = k.last_dim() as f32;
    let scores = q.matmul(&k.transpose_last()?)?.mul_scalar(1.0 / depth.sqrt());

    let scores = match mask {
        Some(mask) => scores.add(&mask.mul_scalar(MASK_BIAS))?,
        None => scores,
    };

    let weights = scores.softmax_last();
    let output = weights.matmul(v)?;
    Ok((output, weights))
}

/// One attention head
///
/// Three independent linear maps project the inputs from `d_model` down to
/// `head_dim`; the head's output has width `head_dim`.
#[derive(Clone, Debug)]
pub struct SelfAttention {
    pub q_proj: Linear,
    pub k_proj: Linear,
    pub v_proj: Linear,
    pub head_dim: usize,
}

impl SelfAttention {
    /// Create a new attention head
    ///
    /// # Arguments
    ///
    /// * `d_model` - Width of the input features
    /// * `head_dim` - Width of Q, K, V and of the output
    /// * `rng` - Source of the initial weights
    pub fn new<R: Rng + ?Sized>(d_model: usize, head_dim: usize, rng: &mut R) -> Self {
        Self {
            q_proj: Linear::new(d_model, head_dim, rng),
            k_proj: Linear::new(d_model, head_dim, rng),
            v_proj: Linear::new(d_model, head_dim, rng),
            head_dim,
        }
    }

    /// Attend from `query` over `key_value`
    ///
    /// # Arguments
    ///
    /// * `query` - [batch, q_len, d_model]
    /// * `key_value` - [batch, k_len, d_model]
    /// * `mask` - Optional [q_len, k_len] mask
    ///
    /// # Returns
    ///
    /// Output tensor [batch, q_len, head_dim]
    pub fn forward(&self, query: &Tensor, key_value: &Tensor, mask: Option<&Tensor>) -> Result<Tensor> {
        Ok(self.forward_with_weights(query, key_value, mask)?.0)
    }

    /// Like [`forward`](Self::forward), also returning the attention weights
    pub fn forward_with_weights(
        &self,
        query: &Tensor,
        key_value: &Tensor,
        mask: Option<&Tensor>,
    ) -> Result<(Tensor, Tensor)> {
        let q = self.q_proj.forward(query)?;
        let k = self.k_proj.forward(key_value)?;
        let v = self.v_proj.forward(key_value)?;

        let (out, weights) = scaled_dot_product_attention(&q, &k, &v, mask)?;
        trace!(shape = ?out.shape, "attention head");
        Ok((out, weights))
    }
}

impl Layer for SelfAttention {
    fn name(&self) -> &'static str {
        "SelfAttention"
    }

    fn parameter_count(&self) -> usize {
        self.q_proj.parameter_count() + self.k_proj.parameter_count() + self.v_proj.parameter_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_look_ahead_mask_seven() {
        let mask = look_ahead_mask(7);
        assert_eq!(mask.shape, vec![7, 7]);
        for i in 0..7 {
            for j in 0..7 {
                let expected = if j > i { 1.0 } else { 0.0 };
                assert_eq!(mask.data[i * 7 + j], expected, "({}, {})", i, j);
            }
        }
    }

    #[test]
    fn test_single_head_full_width() {
        let mut rng = StdRng::seed_from_u64(42);
        let head = SelfAttention::new(512, 512, &mut rng);
        let x = Tensor::ones(vec![1, 7, 512]);
        let out = head.forward(&x, &x, None).unwrap();
        assert_eq!(out.shape, vec![1, 7, 512]);
    }

    #[test]
    fn test_uniform_keys_average_values() {
        // Identical keys give uniform weights, so output is the mean of V
        let q = Tensor::ones(vec![1, 2, 2]);
        let k = Tensor::ones(vec![1, 3, 2]);
        let v = Tensor::new(vec![0.0, 3.0, 3.0, 6.0, 6.0, 9.0], vec![1, 3, 2]).unwrap();
        let (out, weights) = scaled_dot_product_attention(&q, &k, &v, None).unwrap();
        assert_eq!(weights.shape, vec![1, 2, 3]);
        assert!(weights.data.iter().all(|w| (w - 1.0 / 3.0).abs() < 1e-6));
        assert!((out.data[0] - 3.0).abs() < 1e-5);
        assert!((out.data[1] - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_mask_zeroes_future_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let head = SelfAttention::new(8, 4, &mut rng);
        let x = Tensor::new((0..40).map(|i| (i as f32 * 0.37).sin()).collect(), vec![1, 5, 8])
            .unwrap();
        let mask = look_ahead_mask(5);
        let (_, weights) = head.forward_with_weights(&x, &x, Some(&mask)).unwrap();

        for i in 0..5 {
            let row = &weights.data[i * 5..(i + 1) * 5];
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            for &w in &row[i + 1..] {
                assert!(w < 1e-6);
            }
        }
        // First position can only attend to itself
        assert!((weights.data[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cross_attention_lengths() {
        let mut rng = StdRng::seed_from_u64(5);
        let head = SelfAttention::new(16, 8, &mut rng);
        let query = Tensor::ones(vec![2, 3, 16]);
        let memory = Tensor::ones(vec![2, 9, 16]);
        let (out, weights) = head.forward_with_weights(&query, &memory, None).unwrap();
        assert_eq!(out.shape, vec![2, 3, 8]);
        assert_eq!(weights.shape, vec![2, 3, 9]);
    }

    #[test]
    fn test_cross_attention_batch_mismatch() {
        let mut rng = StdRng::seed_from_u64(5);
        let head = SelfAttention::new(16, 8, &mut rng);
        let err = head
            .forward(&Tensor::ones(vec![2, 3, 16]), &Tensor::ones(vec![1, 3, 16]), None)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_parameter_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let head = SelfAttention::new(512, 64, &mut rng);
        assert_eq!(head.parameter_count(), 3 * (512 * 64 + 64));
    }
}
