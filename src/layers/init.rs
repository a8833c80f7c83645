//! Weight Initialization
//!
//! Weights are drawn once, when a layer is built, and never change: there is
//! no training loop. Every constructor takes the RNG explicitly so a model
//! built from the same seed always has the same weights.
//!
//! - **Glorot uniform** for projection matrices:
//!   `U(-limit, limit)` with `limit = √(6 / (fan_in + fan_out))`
//! - **N(0, 0.02)** for embedding tables, following GPT-2

use rand::Rng;
use rand_distr::StandardNormal;

/// Standard deviation used for embedding tables
pub const EMBEDDING_STD: f32 = 0.02;

/// Glorot (Xavier) uniform initialization for a `[fan_in, fan_out]` matrix
pub fn glorot_uniform<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Vec<f32> {
    let size = fan_in * fan_out;
    if fan_in + fan_out == 0 {
        return vec![0.0; size];
    }
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    (0..size).map(|_| rng.random_range(-limit..limit)).collect()
}

/// Samples from a normal distribution with mean 0 and the given std
pub fn normal<R: Rng + ?Sized>(size: usize, std: f32, rng: &mut R) -> Vec<f32> {
    (0..size)
        .map(|_| {
            let z: f32 = rng.sample(StandardNormal);
            z * std
        })
        .collect()
}
