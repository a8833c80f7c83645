//! Transformer Architecture Demonstration
//!
//! Builds each layer on its own, runs random inputs through it and prints
//! the resulting shapes, then assembles the full encoder/decoder model and
//! prints its parameter summary.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin transformer-demo
//! cargo run --release --bin transformer-demo -- --preset base --batch 2
//! cargo run --release --bin transformer-demo -- --config model.json --verbose
//! ```
//!
//! `RUST_LOG` overrides the log filter (e.g. `RUST_LOG=transformer_layers=trace`).

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transformer_layers::{
    look_ahead_mask, Config, DecoderLayer, EncoderLayer, FeedForward, Layer, MultiHeadAttention,
    SelfAttention, Tensor, Transformer,
};

#[derive(Parser)]
#[command(
    name = "transformer-demo",
    about = "Build an encoder/decoder Transformer layer by layer and print its shapes"
)]
struct Args {
    /// Named preset: toy or base
    #[arg(long, default_value = "toy")]
    preset: String,

    /// JSON config file (takes precedence over --preset)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for weights and random inputs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Batch size of the demo inputs
    #[arg(long, default_value_t = 1)]
    batch: usize,

    /// Source sequence length
    #[arg(long, default_value_t = 7)]
    src_len: usize,

    /// Target sequence length
    #[arg(long, default_value_t = 7)]
    tgt_len: usize,

    /// Log every layer's output shape
    #[arg(short, long)]
    verbose: bool,
}

fn section(title: &str) {
    println!("\n{}", "─".repeat(70));
    println!("{}", title);
    println!("{}", "─".repeat(70));
}

fn random_tensor(shape: Vec<usize>, rng: &mut StdRng) -> transformer_layers::Result<Tensor> {
    let size = shape.iter().product();
    Tensor::new((0..size).map(|_| rng.random_range(-1.0..1.0)).collect(), shape)
}

fn random_ids(batch: usize, len: usize, vocab: usize, rng: &mut StdRng) -> Vec<Vec<usize>> {
    (0..batch)
        .map(|_| (0..len).map(|_| rng.random_range(0..vocab)).collect())
        .collect()
}

/// Reject input sizes the model cannot run before any section prints
fn check_input_sizes(args: &Args, config: &Config) -> Result<(), String> {
    if args.batch == 0 || args.src_len == 0 || args.tgt_len == 0 {
        return Err("--batch, --src-len and --tgt-len must be positive".to_string());
    }
    let longest = args.src_len.max(args.tgt_len);
    if longest > config.max_seq_len {
        return Err(format!(
            "sequence length {} exceeds max_seq_len {}",
            longest, config.max_seq_len
        ));
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::preset(&args.preset)?,
    };
    check_input_sizes(&args, &config)?;
    info!(seed = args.seed, "configuration:\n{}", config.to_json()?);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let d_model = config.d_model;
    let (batch, src_len, tgt_len) = (args.batch, args.src_len, args.tgt_len);

    println!("\n{}", "=".repeat(70));
    println!("  Encoder/Decoder Transformer, Layer by Layer");
    println!("{}", "=".repeat(70));

    // ========== Single Head ==========
    section("1. Scaled Dot-Product Self-Attention (one head)");
    let x = random_tensor(vec![batch, src_len, d_model], &mut rng)?;
    let head = SelfAttention::new(d_model, d_model, &mut rng);
    let (out, weights) = head.forward_with_weights(&x, &x, None)?;
    println!("  Input shape:             {:?}", x.shape);
    println!("  Head dimension:          {}", head.head_dim);
    println!("  Attention weights shape: {:?}", weights.shape);
    println!("  Output shape:            {:?}", out.shape);
    println!("  Parameters:              {}", head.parameter_count());

    // ========== Multi-Head ==========
    section("2. Multi-Head Attention (heads concatenated)");
    let mha = MultiHeadAttention::new(d_model, config.n_heads, config.output_projection, &mut rng)?;
    let head_out = mha.heads[0].forward(&x, &x, None)?;
    let out = mha.forward(&x, &x, None)?;
    println!(
        "  {} heads × {} dims → {} features",
        mha.n_heads(),
        mha.head_dim(),
        mha.n_heads() * mha.head_dim()
    );
    println!("  One head output shape:   {:?}", head_out.shape);
    println!("  Concatenated shape:      {:?}", out.shape);
    println!("  Parameters:              {}", mha.parameter_count());

    // ========== Look-Ahead Mask ==========
    section("3. Look-Ahead Mask");
    let mask = look_ahead_mask(tgt_len);
    println!("\n  Mask for seq_len={} (1 = masked, 0 = visible):", tgt_len);
    for row in mask.data.chunks(tgt_len) {
        let cells: Vec<String> = row.iter().map(|v| format!("{}", *v as u8)).collect();
        println!("    [{}]", cells.join(" "));
    }

    // ========== Sublayers ==========
    section("4. Feed-Forward, Encoder Layer, Decoder Layer");
    let ffn = FeedForward::new(d_model, config.d_ff, &mut rng);
    println!(
        "  FeedForward {} → {} → {}:  {:?}",
        d_model,
        config.d_ff,
        d_model,
        ffn.forward(&x)?.shape
    );

    let encoder_layer = EncoderLayer::new(&config, &mut rng)?;
    let enc_out = encoder_layer.forward(&x)?;
    println!("  EncoderLayer output:     {:?}", enc_out.shape);

    let y = random_tensor(vec![batch, tgt_len, d_model], &mut rng)?;
    let decoder_layer = DecoderLayer::new(&config, &mut rng)?;
    let dec_out = decoder_layer.forward(&y, &enc_out, &mask)?;
    println!("  DecoderLayer output:     {:?}", dec_out.shape);

    // ========== Full Model ==========
    section("5. Toy Sequence-to-Sequence Model");
    let model = Transformer::new(&config, args.seed)?;
    let src = random_ids(batch, src_len, config.input_vocab_size, &mut rng);
    let tgt = random_ids(batch, tgt_len, config.target_vocab_size, &mut rng);

    let start = std::time::Instant::now();
    let logits = model.forward(&src, &tgt)?;
    let elapsed = start.elapsed();

    println!("  Source tokens:  {:?}", src[0]);
    println!("  Target tokens:  {:?}", tgt[0]);
    println!("  Logits shape:   {:?}", logits.shape);
    println!("  Forward time:   {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    println!();
    println!("{}", model.summary(batch, src_len, tgt_len));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let argv = std::iter::once("transformer-demo").chain(extra.iter().copied());
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_sizes_fit_toy_preset() {
        assert!(check_input_sizes(&args(&[]), &Config::toy()).is_ok());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let err = check_input_sizes(&args(&["--batch", "0"]), &Config::toy()).unwrap_err();
        assert!(err.contains("must be positive"));
    }

    #[test]
    fn test_lengths_beyond_positional_table_rejected() {
        let config = Config::toy();
        let too_long = (config.max_seq_len + 1).to_string();

        let err = check_input_sizes(&args(&["--tgt-len", &too_long]), &config).unwrap_err();
        assert!(err.contains("exceeds max_seq_len 64"));
        assert!(check_input_sizes(&args(&["--src-len", &too_long]), &config).is_err());
        assert!(check_input_sizes(&args(&["--src-len", "64", "--tgt-len", "64"]), &config).is_ok());
    }
}
