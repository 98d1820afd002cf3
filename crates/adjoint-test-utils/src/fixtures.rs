//! Reusable inputs for gradient tests.
//!
//! - [`random_matrix`] / [`random_positive`]: seeded, reproducible inputs.
//! - [`scenario_b`]: the 2×2 product pair with hand-computed gradients.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// `rows × cols` matrix with entries uniform in `[-1, 1)`.
///
/// The same seed always yields the same matrix.
pub fn random_matrix(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    DMatrix::from_fn(rows, cols, |_, _| rng.random_range(-1.0..1.0))
}

/// `n` values uniform in `[lo, hi)`, for functions defined on positives.
pub fn random_positive(n: usize, lo: f64, hi: f64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(lo..hi)).collect()
}

/// Operands and expected gradients of `sum(A·B)`.
pub struct ProductFixture {
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub value: f64,
    pub grad_a: DMatrix<f64>,
    pub grad_b: DMatrix<f64>,
}

/// `A = [[1,2],[3,4]]`, `B = [[5,6],[7,8]]`.
pub fn scenario_b() -> ProductFixture {
    ProductFixture {
        a: DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]),
        b: DMatrix::from_row_slice(2, 2, &[5.0, 6.0, 7.0, 8.0]),
        value: 134.0,
        grad_a: DMatrix::from_row_slice(2, 2, &[11.0, 15.0, 11.0, 15.0]),
        grad_b: DMatrix::from_row_slice(2, 2, &[4.0, 4.0, 6.0, 6.0]),
    }
}

/// Analytic gradient of `sum(A·B)`: `(1·Bᵗ, Aᵗ·1)`.
pub fn product_sum_gradient(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let ones = DMatrix::from_element(a.nrows(), b.ncols(), 1.0);
    (&ones * b.transpose(), a.transpose() * &ones)
}
