//! Neural Network Layers
//!
//! Every building block of the encoder/decoder Transformer, one per module.
//!
//! ## Layers
//!
//! - **init**: Weight initialization (Glorot uniform, normal)
//! - **linear**: Fully connected layer
//! - **activation**: ReLU
//! - **layer_norm**: Layer normalization and the Add & Norm wrapper
//! - **embedding**: Token embeddings and sinusoidal positional encoding
//! - **attention**: Scaled dot-product attention, look-ahead mask, one head
//! - **multi_head**: Several heads concatenated along the feature axis
//! - **feed_forward**: Linear → ReLU → Linear
//! - **encoder**: Encoder layer and encoder stack
//! - **decoder**: Decoder layer and decoder stack
//!
//! ## Design Pattern
//!
//! Each layer follows the same shape:
//!
//! ```rust,ignore
//! pub struct SomeLayer {
//!     // Parameters and sublayers, all owned
//! }
//!
//! impl SomeLayer {
//!     pub fn new(..., rng: &mut R) -> Self { }
//!     pub fn forward(&self, x: &Tensor) -> Result<Tensor> { }
//! }
//!
//! impl Layer for SomeLayer { }
//! ```
//!
//! Weights are drawn once in `new` and `forward` only reads them, so a built
//! model can be shared across threads freely.

pub mod activation;
pub mod attention;
pub mod decoder;
pub mod embedding;
pub mod encoder;
pub mod feed_forward;
pub mod init;
pub mod layer_norm;
pub mod linear;
pub mod multi_head;

use std::fmt::Debug;

/// Interface shared by every layer
///
/// `forward` signatures differ between layers (attention takes a query and
/// a key/value source, the decoder also takes the encoder output), so the
/// trait only covers what the model summary needs.
pub trait Layer: Debug + Send + Sync {
    /// Type name shown in the model summary
    fn name(&self) -> &'static str;

    /// Number of weights, including biases and normalization parameters
    fn parameter_count(&self) -> usize;
}

// Re-export main types for convenience
pub use activation::relu;
pub use attention::{look_ahead_mask, scaled_dot_product_attention, SelfAttention, MASK_BIAS};
pub use decoder::{Decoder, DecoderLayer};
pub use embedding::{Embedding, PositionalEncoding};
pub use encoder::{Encoder, EncoderLayer};
pub use feed_forward::FeedForward;
pub use layer_norm::{add_and_norm, LayerNorm};
pub use linear::Linear;
pub use multi_head::MultiHeadAttention;
