//! Encoder/Decoder Transformer
//!
//! The toy sequence-to-sequence model assembled from the layers in
//! [`crate::layers`]:
//!
//! ```text
//! source ids [batch, src_len]            target ids [batch, tgt_len]
//!     ↓                                      ↓
//! Encoder (Embedding + PE + N layers)    Decoder (Embedding + PE + N layers)
//!     ↓ [batch, src_len, d_model]  ──────→   ↑ keys/values of cross-attention
//!                                            ↓ [batch, tgt_len, d_model]
//!                                        Linear → [batch, tgt_len, target_vocab]
//! ```
//!
//! ## Forward Pass Only
//!
//! Weights are drawn from a seeded RNG when the model is built and never
//! updated. The same config and seed always produce the same model.
//!
//! ## Example
//!
//! ```rust,no_run
//! use transformer_layers::{Config, Transformer};
//!
//! let model = Transformer::new(&Config::toy(), 42)?;
//! let logits = model.forward(&[vec![1, 2, 3, 4, 5, 6, 7]], &[vec![1, 2, 3]])?;
//! assert_eq!(logits.shape, vec![1, 3, 1200]);
//! println!("{}", model.summary(1, 7, 3));
//! # Ok::<(), transformer_layers::Error>(())
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use crate::layers::embedding::batch_dims;
use crate::layers::{Decoder, Encoder, Layer, Linear};
use crate::summary::ModelSummary;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

/// Complete encoder/decoder model
#[derive(Clone, Debug)]
pub struct Transformer {
    /// Model configuration
    pub config: Config,
    pub encoder: Encoder,
    pub decoder: Decoder,
    /// Projection from d_model to target vocabulary logits
    pub final_layer: Linear,
}

impl Transformer {
    /// Build a model with weights drawn from `seed`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if the config does not validate.
    pub fn new(config: &Config, seed: u64) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);

        let encoder = Encoder::new(config, &mut rng)?;
        let decoder = Decoder::new(config, &mut rng)?;
        let final_layer = Linear::new(config.d_model, config.target_vocab_size, &mut rng);

        let model = Self {
            config: config.clone(),
            encoder,
            decoder,
            final_layer,
        };
        info!(
            params = model.parameter_count(),
            layers = config.n_layers,
            d_model = config.d_model,
            "built transformer"
        );
        Ok(model)
    }

    /// Forward pass: (source ids, target ids) → logits
    ///
    /// # Arguments
    ///
    /// * `src_ids` - Source token IDs [batch_size][src_len]
    /// * `tgt_ids` - Target token IDs [batch_size][tgt_len]
    ///
    /// # Returns
    ///
    /// Logits over the target vocabulary: [batch, tgt_len, target_vocab_size]
    pub fn forward(&self, src_ids: &[Vec<usize>], tgt_ids: &[Vec<usize>]) -> Result<Tensor> {
        let (src_batch, _) = batch_dims(src_ids)?;
        let (tgt_batch, _) = batch_dims(tgt_ids)?;
        if src_batch != tgt_batch {
            return Err(Error::BatchMismatch {
                encoder: src_batch,
                decoder: tgt_batch,
            });
        }

        let enc_output = self.encoder.forward(src_ids)?;
        debug!(shape = ?enc_output.shape, "encoder output");

        let dec_output = self.decoder.forward(tgt_ids, &enc_output)?;
        debug!(shape = ?dec_output.shape, "decoder output");

        let logits = self.final_layer.forward(&dec_output)?;
        debug!(shape = ?logits.shape, "logits");
        Ok(logits)
    }

    /// Forward pass followed by softmax over the target vocabulary
    pub fn predict(&self, src_ids: &[Vec<usize>], tgt_ids: &[Vec<usize>]) -> Result<Tensor> {
        Ok(self.forward(src_ids, tgt_ids)?.softmax_last())
    }

    /// Layer-by-layer summary for inputs of the given sizes
    pub fn summary(&self, batch: usize, src_len: usize, tgt_len: usize) -> ModelSummary {
        let d_model = self.config.d_model;
        let enc_shape = vec![batch, src_len, d_model];
        let dec_shape = vec![batch, tgt_len, d_model];

        let mut summary = ModelSummary::new("transformer");

        let encoder = &self.encoder;
        summary.push(
            "encoder_embedding",
            encoder.embedding.name(),
            enc_shape.clone(),
            encoder.embedding.parameter_count(),
        );
        summary.push(
            "encoder_positional",
            encoder.positional.name(),
            enc_shape.clone(),
            encoder.positional.parameter_count(),
        );
        for (i, layer) in encoder.layers.iter().enumerate() {
            summary.push(
                format!("encoder_layer_{}", i),
                layer.name(),
                enc_shape.clone(),
                layer.parameter_count(),
            );
        }

        let decoder = &self.decoder;
        summary.push(
            "decoder_embedding",
            decoder.embedding.name(),
            dec_shape.clone(),
            decoder.embedding.parameter_count(),
        );
        summary.push(
            "decoder_positional",
            decoder.positional.name(),
            dec_shape.clone(),
            decoder.positional.parameter_count(),
        );
        for (i, layer) in decoder.layers.iter().enumerate() {
            summary.push(
                format!("decoder_layer_{}", i),
                layer.name(),
                dec_shape.clone(),
                layer.parameter_count(),
            );
        }

        summary.push(
            "final_layer",
            self.final_layer.name(),
            vec![batch, tgt_len, self.config.target_vocab_size],
            self.final_layer.parameter_count(),
        );
        summary
    }
}

impl Layer for Transformer {
    fn name(&self) -> &'static str {
        "Transformer"
    }

    fn parameter_count(&self) -> usize {
        self.encoder.parameter_count()
            + self.decoder.parameter_count()
            + self.final_layer.parameter_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Config {
        Config {
            d_model: 16,
            n_heads: 4,
            d_ff: 32,
            n_layers: 2,
            input_vocab_size: 50,
            target_vocab_size: 40,
            max_seq_len: 16,
            add_norm: true,
            output_projection: false,
            layer_norm_eps: 1e-6,
        }
    }

    #[test]
    fn test_logits_shape() {
        let model = Transformer::new(&tiny(), 0).unwrap();
        let logits = model
            .forward(&[vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9, 10]], &[vec![1, 2, 3], vec![4, 5, 6]])
            .unwrap();
        assert_eq!(logits.shape, vec![2, 3, 40]);
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = Transformer::new(&tiny(), 7).unwrap();
        let b = Transformer::new(&tiny(), 7).unwrap();
        let src = [vec![3, 1, 4, 1, 5]];
        let tgt = [vec![9, 2, 6]];
        assert_eq!(a.forward(&src, &tgt).unwrap(), b.forward(&src, &tgt).unwrap());
    }

    #[test]
    fn test_predict_is_distribution() {
        let model = Transformer::new(&tiny(), 1).unwrap();
        let probs = model.predict(&[vec![1, 2]], &[vec![3, 4]]).unwrap();
        for row in probs.data.chunks(40) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_batch_mismatch() {
        let model = Transformer::new(&tiny(), 0).unwrap();
        let err = model.forward(&[vec![1], vec![2]], &[vec![1]]).unwrap_err();
        assert!(matches!(
            err,
            Error::BatchMismatch {
                encoder: 2,
                decoder: 1
            }
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            n_heads: 3,
            ..tiny()
        };
        assert!(matches!(
            Transformer::new(&config, 0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_summary_total_matches_parameter_count() {
        let model = Transformer::new(&tiny(), 0).unwrap();
        let summary = model.summary(2, 5, 3);
        assert_eq!(summary.total_params(), model.parameter_count());
        // 2 embeddings + 2 positional + 2×2 layers + final layer
        assert_eq!(summary.rows.len(), 9);
        assert_eq!(summary.rows.last().unwrap().output_shape, vec![2, 3, 40]);
    }
}
