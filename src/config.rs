//! Model Configuration
//!
//! Architecture hyperparameters for the encoder/decoder Transformer.
//!
//! ## Presets
//!
//! | Preset   | d_model | heads | d_ff | layers | vocab (in/out) |
//! |----------|---------|-------|------|--------|----------------|
//! | `toy`    | 512     | 8     | 2048 | 2      | 1000 / 1200    |
//! | `base`   | 512     | 8     | 2048 | 6      | 37000 / 37000  |
//!
//! `base` matches the base model of "Attention Is All You Need" (shared
//! 37000-token BPE vocabulary, output projection after the heads).
//!
//! ## Loading from JSON
//!
//! Missing fields fall back to the `toy` preset:
//!
//! ```json
//! { "n_layers": 4, "add_norm": false }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Model configuration
///
/// # Fields
///
/// - `d_model`: Width of every token representation
/// - `n_heads`: Attention heads per multi-head layer (head width is `d_model / n_heads`)
/// - `d_ff`: Hidden width of the feed-forward sublayer
/// - `n_layers`: Encoder layers, and equally many decoder layers
/// - `input_vocab_size` / `target_vocab_size`: Embedding table sizes
/// - `max_seq_len`: Longest sequence the positional encoding covers
/// - `add_norm`: Wrap each sublayer in residual + layer norm
/// - `output_projection`: Apply a `d_model × d_model` projection after concatenating heads
/// - `layer_norm_eps`: Small constant inside layer norm
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub d_model: usize,
    pub n_heads: usize,
    pub d_ff: usize,
    pub n_layers: usize,
    pub input_vocab_size: usize,
    pub target_vocab_size: usize,
    pub max_seq_len: usize,
    pub add_norm: bool,
    pub output_projection: bool,
    pub layer_norm_eps: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self::toy()
    }
}

impl Config {
    /// The toy sequence-to-sequence model
    pub fn toy() -> Self {
        Self {
            d_model: 512,
            n_heads: 8,
            d_ff: 2048,
            n_layers: 2,
            input_vocab_size: 1000,
            target_vocab_size: 1200,
            max_seq_len: 64,
            add_norm: true,
            output_projection: false,
            layer_norm_eps: 1e-6,
        }
    }

    /// Transformer base from the original paper
    pub fn base() -> Self {
        Self {
            n_layers: 6,
            input_vocab_size: 37_000,
            target_vocab_size: 37_000,
            max_seq_len: 512,
            output_projection: true,
            ..Self::toy()
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "toy" => Ok(Self::toy()),
            "base" => Ok(Self::base()),
            other => Err(Error::InvalidConfig(format!(
                "unknown preset '{}' (expected 'toy' or 'base')",
                other
            ))),
        }
    }

    /// Width of a single attention head
    pub fn head_dim(&self) -> usize {
        self.d_model / self.n_heads.max(1)
    }

    /// Check that the hyperparameters describe a buildable model
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("d_model", self.d_model),
            ("n_heads", self.n_heads),
            ("d_ff", self.d_ff),
            ("input_vocab_size", self.input_vocab_size),
            ("target_vocab_size", self.target_vocab_size),
            ("max_seq_len", self.max_seq_len),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(Error::InvalidConfig(format!("{} must be positive", field)));
        }
        if self.d_model % self.n_heads != 0 {
            return Err(Error::InvalidConfig(format!(
                "d_model ({}) must be divisible by n_heads ({})",
                self.d_model, self.n_heads
            )));
        }
        if self.layer_norm_eps.is_nan() || self.layer_norm_eps <= 0.0 {
            return Err(Error::InvalidConfig(
                "layer_norm_eps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Read and validate a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON, the same format `from_json_file` reads
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
