//! Tensor Operations for the Transformer Layers
//!
//! A minimal dense tensor: just enough array machinery for embeddings,
//! linear projections, attention and normalization.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f32>` storing all elements in row-major order
//! - **Shape**: Dimensions of the tensor (e.g., `[batch, seq, d_model]`)
//! - **Strides**: Step sizes for each dimension to compute flat indices
//!
//! Every operation that combines tensors checks shapes first and returns
//! [`Error::ShapeMismatch`] instead of panicking, so a badly wired layer
//! reports which operands disagreed.
//!
//! ## Example
//!
//! ```rust
//! use transformer_layers::Tensor;
//!
//! let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3])?;
//! let w = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![3, 2])?;
//! let y = x.matmul(&w)?;
//! assert_eq!(y.shape, vec![2, 2]);
//! # Ok::<(), transformer_layers::Error>(())
//! ```
//!
//! ## Parallelism
//!
//! Element-wise operations, softmax rows and matrix multiplication run on
//! Rayon. Small matrix products stay sequential to avoid scheduling overhead.

use crate::error::{Error, Result};
use rayon::prelude::*;

/// Below this many multiply-adds a 2D product is computed sequentially.
const PARALLEL_MATMUL_THRESHOLD: usize = 1_000;

/// Rows per parallel work item in the blocked product.
const BLOCK_SIZE: usize = 8;

/// A multi-dimensional array of `f32` in row-major layout.
///
/// For shape `[2, 3]`, data is stored as
/// `[r0c0, r0c1, r0c2, r1c0, r1c1, r1c2]` and strides are `[3, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    /// Flat storage of all tensor elements
    pub data: Vec<f32>,
    /// Shape of the tensor (dimensions)
    pub shape: Vec<usize>,
    /// Strides for each dimension (computed from shape)
    pub strides: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor with given data and shape
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the product of the shape does not
    /// equal the data length.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                op: "new",
                left: vec![data.len()],
                right: shape,
            });
        }
        Ok(Self::from_parts(data, shape))
    }

    /// Build a tensor whose length is already known to match its shape.
    pub(crate) fn from_parts(data: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        let strides = Self::compute_strides(&shape);
        Self {
            data,
            shape,
            strides,
        }
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::full(shape, 0.0)
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: Vec<usize>) -> Self {
        Self::full(shape, 1.0)
    }

    /// Create a tensor with every element set to `value`
    pub fn full(shape: Vec<usize>, value: f32) -> Self {
        let size: usize = shape.iter().product();
        Self::from_parts(vec![value; size], shape)
    }

    /// Compute strides from shape (row-major layout)
    ///
    /// For shape `[d0, d1, d2]`, strides are `[d1*d2, d2, 1]`
    fn compute_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Size of the last (feature) dimension, 1 for a scalar
    pub fn last_dim(&self) -> usize {
        self.shape.last().copied().unwrap_or(1)
    }

    /// Resolve a possibly negative axis against this tensor's rank.
    fn resolve_axis(&self, axis: isize) -> Result<usize> {
        let rank = self.rank() as isize;
        let pos = if axis < 0 { rank + axis } else { axis };
        if pos < 0 || pos >= rank {
            return Err(Error::Unsupported(format!(
                "axis {} out of range for rank {}",
                axis, rank
            )));
        }
        Ok(pos as usize)
    }

    /// Matrix multiplication
    ///
    /// Supports:
    /// - `[.., m, k] @ [k, n]`: a weight matrix applied to every leading
    ///   index (the shape of a linear projection over `[batch, seq, d]`)
    /// - `[.., m, k] @ [.., k, n]`: batched product, leading dims equal
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when the inner dimensions or the
    /// batch dimensions disagree, and [`Error::Unsupported`] for rank < 2.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        if self.rank() < 2 || other.rank() < 2 {
            return Err(Error::Unsupported(format!(
                "matmul needs rank >= 2, got {:?} @ {:?}",
                self.shape, other.shape
            )));
        }

        let k = self.last_dim();
        let mismatch = || Error::ShapeMismatch {
            op: "matmul",
            left: self.shape.clone(),
            right: other.shape.clone(),
        };

        // === WEIGHT MATRIX: [.., m, k] @ [k, n] ===
        if other.rank() == 2 {
            if other.shape[0] != k {
                return Err(mismatch());
            }
            let n = other.shape[1];
            let m: usize = self.shape[..self.rank() - 1].iter().product();
            let result = matmul_2d(&self.data, &other.data, m, k, n);

            let mut shape = self.shape.clone();
            if let Some(last) = shape.last_mut() {
                *last = n;
            }
            return Ok(Tensor::from_parts(result, shape));
        }

        // === BATCHED: [.., m, k] @ [.., k, n] ===
        let rank = self.rank();
        if other.rank() != rank
            || self.shape[..rank - 2] != other.shape[..rank - 2]
            || other.shape[rank - 2] != k
        {
            return Err(mismatch());
        }

        let m = self.shape[rank - 2];
        let n = other.shape[rank - 1];
        let batch: usize = self.shape[..rank - 2].iter().product();
        let mut result = vec![0.0; batch * m * n];

        // Each batch entry is an independent [m, k] @ [k, n] product
        result
            .par_chunks_mut((m * n).max(1))
            .enumerate()
            .for_each(|(b, chunk)| {
                let a = &self.data[b * m * k..(b + 1) * m * k];
                let bm = &other.data[b * k * n..(b + 1) * k * n];
                matmul_into(a, bm, k, n, chunk);
            });

        let mut shape = self.shape.clone();
        shape[rank - 1] = n;
        Ok(Tensor::from_parts(result, shape))
    }

    /// Transpose two dimensions
    ///
    /// Both dimensions accept negative indexing.
    pub fn transpose(&self, dim1: isize, dim2: isize) -> Result<Tensor> {
        let d1 = self.resolve_axis(dim1)?;
        let d2 = self.resolve_axis(dim2)?;

        let mut new_shape = self.shape.clone();
        new_shape.swap(d1, d2);

        // Walk the output in order and read through the swapped strides
        let mut permuted_strides = self.strides.clone();
        permuted_strides.swap(d1, d2);
        let out_strides = Self::compute_strides(&new_shape);

        let result: Vec<f32> = (0..self.numel())
            .into_par_iter()
            .map(|i| {
                let mut remaining = i;
                let mut src = 0;
                for (dim, &stride) in out_strides.iter().enumerate() {
                    let coord = remaining / stride;
                    remaining %= stride;
                    src += coord * permuted_strides[dim];
                }
                self.data[src]
            })
            .collect();

        Ok(Tensor::from_parts(result, new_shape))
    }

    /// Swap the last two axes (`K -> Kᵗ` in attention)
    pub fn transpose_last(&self) -> Result<Tensor> {
        self.transpose(-2, -1)
    }

    /// Softmax along the last axis
    ///
    /// Uses the numerically stable form
    /// `exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))`, computed per row in
    /// parallel.
    pub fn softmax_last(&self) -> Tensor {
        let cols = self.last_dim().max(1);
        let mut result = self.data.clone();

        result.par_chunks_mut(cols).for_each(|row| {
            let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let mut sum = 0.0;
            for v in row.iter_mut() {
                *v = (*v - max).exp();
                sum += *v;
            }
            for v in row.iter_mut() {
                *v /= sum;
            }
        });

        Tensor::from_parts(result, self.shape.clone())
    }

    /// Element-wise addition with broadcasting
    ///
    /// `other` must either have exactly this shape or be a trailing suffix
    /// of it, which covers the patterns used by the layers:
    ///
    /// 1. `[batch, seq, d] + [d]` (bias)
    /// 2. `[batch, seq, d] + [seq, d]` (positional encoding)
    /// 3. `[batch, q, k] + [q, k]` (attention mask bias)
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        if self.shape == other.shape {
            let result = self
                .data
                .par_iter()
                .zip(&other.data)
                .map(|(a, b)| a + b)
                .collect();
            return Ok(Tensor::from_parts(result, self.shape.clone()));
        }

        let suffix = self.rank() >= other.rank()
            && self.shape[self.rank() - other.rank()..] == other.shape[..];
        if !suffix || other.numel() == 0 {
            return Err(Error::ShapeMismatch {
                op: "add",
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }

        let period = other.numel();
        let result = self
            .data
            .par_iter()
            .enumerate()
            .map(|(i, a)| a + other.data[i % period])
            .collect();
        Ok(Tensor::from_parts(result, self.shape.clone()))
    }

    /// Apply `f` to every element
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        let result = self.data.par_iter().map(|&x| f(x)).collect();
        Tensor::from_parts(result, self.shape.clone())
    }

    /// Add scalar to all elements
    pub fn add_scalar(&self, scalar: f32) -> Tensor {
        self.map(|x| x + scalar)
    }

    /// Multiply all elements by scalar
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        self.map(|x| x * scalar)
    }

    /// Reshape tensor to new shape
    ///
    /// Total number of elements must remain the same.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Tensor> {
        let new_size: usize = new_shape.iter().product();
        if new_size != self.numel() {
            return Err(Error::ShapeMismatch {
                op: "reshape",
                left: self.shape.clone(),
                right: new_shape.to_vec(),
            });
        }
        Ok(Tensor::from_parts(self.data.clone(), new_shape.to_vec()))
    }

    /// Concatenate tensors along the last axis
    ///
    /// All parts must share every dimension except the last. This is how
    /// the outputs of independent attention heads are joined:
    /// eight `[b, s, 64]` heads become one `[b, s, 512]` tensor.
    pub fn concat_last(parts: &[Tensor]) -> Result<Tensor> {
        let first = parts
            .first()
            .ok_or_else(|| Error::Unsupported("concat of zero tensors".to_string()))?;
        let lead = &first.shape[..first.rank().saturating_sub(1)];

        for part in &parts[1..] {
            if part.rank() != first.rank() || &part.shape[..part.rank().saturating_sub(1)] != lead
            {
                return Err(Error::ShapeMismatch {
                    op: "concat",
                    left: first.shape.clone(),
                    right: part.shape.clone(),
                });
            }
        }

        let rows: usize = lead.iter().product();
        let total: usize = parts.iter().map(Tensor::last_dim).sum();

        let mut result = Vec::with_capacity(rows * total);
        for row in 0..rows {
            for part in parts {
                let width = part.last_dim();
                result.extend_from_slice(&part.data[row * width..(row + 1) * width]);
            }
        }

        let mut shape = lead.to_vec();
        shape.push(total);
        Ok(Tensor::from_parts(result, shape))
    }

    /// True when shapes match and every element is within `tol`
    pub fn allclose(&self, other: &Tensor, tol: f32) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

/// `[m, k] @ [k, n]` on flat slices.
///
/// Large products split the output into blocks of `BLOCK_SIZE` rows and
/// process them in parallel. Within a block the innermost loop runs over
/// contiguous memory so LLVM can vectorize it.
fn matmul_2d(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut result = vec![0.0; m * n];
    if m * n * k < PARALLEL_MATMUL_THRESHOLD || n == 0 {
        matmul_into(a, b, k, n, &mut result);
        return result;
    }

    result
        .par_chunks_mut(BLOCK_SIZE * n)
        .enumerate()
        .for_each(|(block_i, out)| {
            let rows = out.len() / n;
            let start = block_i * BLOCK_SIZE;
            matmul_into(&a[start * k..(start + rows) * k], b, k, n, out);
        });
    result
}

/// Accumulate `a @ b` into `out`, where `a` holds `out.len() / n` rows.
#[inline]
fn matmul_into(a: &[f32], b: &[f32], k: usize, n: usize, out: &mut [f32]) {
    if n == 0 {
        return;
    }
    for (i, out_row) in out.chunks_mut(n).enumerate() {
        for l in 0..k {
            let a_val = a[i * k + l];
            for (r, &b_val) in out_row.iter_mut().zip(&b[l * n..(l + 1) * n]) {
                *r += a_val * b_val;
            }
        }
    }
}
