//! Property tests for attention and the tensor operations under it.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use transformer_layers::{
    look_ahead_mask, scaled_dot_product_attention, LayerNorm, MultiHeadAttention, Tensor,
};

fn tensor_strategy(shape: Vec<usize>) -> impl Strategy<Value = Tensor> {
    let size = shape.iter().product::<usize>();
    prop::collection::vec(-4.0f32..4.0, size)
        .prop_map(move |data| Tensor::new(data, shape.clone()).unwrap())
}

/// (batch, q_len, k_len, depth) together with q, k, v of those sizes
fn qkv_strategy() -> impl Strategy<Value = (Tensor, Tensor, Tensor)> {
    (1usize..3, 1usize..6, 1usize..6, 1usize..9).prop_flat_map(|(b, q_len, k_len, d)| {
        (
            tensor_strategy(vec![b, q_len, d]),
            tensor_strategy(vec![b, k_len, d]),
            tensor_strategy(vec![b, k_len, d]),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn attention_weights_are_row_distributions((q, k, v) in qkv_strategy()) {
        let (out, weights) = scaled_dot_product_attention(&q, &k, &v, None).unwrap();

        prop_assert_eq!(&out.shape, &vec![q.shape[0], q.shape[1], v.shape[2]]);
        prop_assert_eq!(&weights.shape, &vec![q.shape[0], q.shape[1], k.shape[1]]);
        for row in weights.data.chunks(k.shape[1]) {
            let sum: f32 = row.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-4);
            prop_assert!(row.iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn masked_positions_get_no_weight(seq_len in 1usize..8, depth in 1usize..6, seed in any::<u64>()) {
        let x = Tensor::new(
            (0..seq_len * depth).map(|i| ((i as u64 ^ seed) % 7) as f32 - 3.0).collect(),
            vec![1, seq_len, depth],
        ).unwrap();
        let mask = look_ahead_mask(seq_len);
        let (_, weights) = scaled_dot_product_attention(&x, &x, &x, Some(&mask)).unwrap();

        for i in 0..seq_len {
            for j in (i + 1)..seq_len {
                prop_assert!(weights.data[i * seq_len + j] < 1e-6);
            }
        }
    }

    #[test]
    fn multi_head_output_width_is_d_model(
        n_heads in 1usize..5,
        head_dim in 1usize..5,
        seq_len in 1usize..6,
        seed in any::<u64>(),
    ) {
        let d_model = n_heads * head_dim;
        let mut rng = StdRng::seed_from_u64(seed);
        let mha = MultiHeadAttention::new(d_model, n_heads, false, &mut rng).unwrap();
        let x = Tensor::ones(vec![2, seq_len, d_model]);

        let out = mha.forward(&x, &x, None).unwrap();
        prop_assert_eq!(out.shape, vec![2, seq_len, d_model]);
    }

    #[test]
    fn layer_norm_rows_have_zero_mean(x in tensor_strategy(vec![3, 16])) {
        let out = LayerNorm::new(16, 1e-6).forward(&x).unwrap();
        for row in out.data.chunks(16) {
            let mean: f32 = row.iter().sum::<f32>() / 16.0;
            prop_assert!(mean.abs() < 1e-4);
        }
    }
}
