//! Transformer Layers: an Encoder/Decoder Transformer from Small Parts
//!
//! An educational implementation of the Transformer from "Attention Is All
//! You Need", built out of small layer types that each do one thing:
//! single-head self-attention, a multi-head wrapper that concatenates heads,
//! a position-wise feed-forward sublayer, and encoder and decoder layers
//! that compose them. Forward pass only.
//!
//! # Modules
//!
//! - [`tensor`] - Minimal dense tensor with shape-checked operations
//! - [`layers`] - Every layer, from [`Linear`] up to [`Encoder`] and [`Decoder`]
//! - [`model`] - The toy sequence-to-sequence [`Transformer`]
//! - [`config`] - Hyperparameters, presets and JSON loading
//! - [`summary`] - Parameter summary table
//!
//! # Example
//!
//! ```rust
//! use transformer_layers::{look_ahead_mask, MultiHeadAttention, Tensor};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let mha = MultiHeadAttention::new(512, 8, false, &mut rng)?;
//!
//! let x = Tensor::ones(vec![1, 7, 512]);
//! let out = mha.forward(&x, &x, Some(&look_ahead_mask(7)))?;
//! assert_eq!(out.shape, vec![1, 7, 512]);
//! # Ok::<(), transformer_layers::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod layers;
pub mod model;
pub mod summary;
pub mod tensor;

// Re-export main types for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use layers::{
    look_ahead_mask, scaled_dot_product_attention, Decoder, DecoderLayer, Embedding, Encoder,
    EncoderLayer, FeedForward, Layer, LayerNorm, Linear, MultiHeadAttention, PositionalEncoding,
    SelfAttention,
};
pub use model::Transformer;
pub use summary::ModelSummary;
pub use tensor::Tensor;
