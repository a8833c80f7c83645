use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use transformer_layers::{look_ahead_mask, Config, MultiHeadAttention, Tensor, Transformer};

fn small_config() -> Config {
    // Narrower than the toy preset to keep iterations short
    Config {
        d_model: 128,
        n_heads: 4,
        d_ff: 512,
        ..Config::toy()
    }
}

fn benchmark_attention(c: &mut Criterion) {
    let seq_len = 32;
    let d_model = 128;

    let mut rng = StdRng::seed_from_u64(0);
    let mha = MultiHeadAttention::new(d_model, 4, false, &mut rng).unwrap();
    let x = Tensor::full(vec![1, seq_len, d_model], 0.5);
    let mask = look_ahead_mask(seq_len);

    let mut group = c.benchmark_group("multi_head_attention");

    group.bench_function("unmasked", |b| {
        b.iter(|| mha.forward(black_box(&x), black_box(&x), None).unwrap())
    });

    group.bench_function("look_ahead", |b| {
        b.iter(|| {
            mha.forward(black_box(&x), black_box(&x), Some(black_box(&mask)))
                .unwrap()
        })
    });

    group.finish();
}

fn benchmark_model(c: &mut Criterion) {
    let model = Transformer::new(&small_config(), 42).unwrap();
    let src: Vec<Vec<usize>> = vec![(0..16).collect(), (16..32).collect()];
    let tgt: Vec<Vec<usize>> = vec![(0..12).collect(), (12..24).collect()];

    c.bench_function("transformer_forward", |b| {
        b.iter(|| model.forward(black_box(&src), black_box(&tgt)).unwrap())
    });
}

criterion_group!(benches, benchmark_attention, benchmark_model);
criterion_main!(benches);
