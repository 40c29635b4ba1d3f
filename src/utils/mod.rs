/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Shared numeric helpers for objective implementations.
//
// Created on: 24 Jan 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities
//!
//! Small helpers for moving between flat parameter slices and faer matrices,
//! and for the stable scalar transforms used by several families.

use faer::Mat;
use num_traits::ToPrimitive;

/// Convert a count to `f64`, rounding to the nearest representable value above 2^53.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[must_use]
pub fn matrix_is_finite(matrix: &Mat<f64>) -> bool {
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            if !matrix[(i, j)].is_finite() {
                return false;
            }
        }
    }
    true
}

/// Single-column matrix holding `values`.
#[must_use]
pub fn column_from_slice(values: &[f64]) -> Mat<f64> {
    Mat::from_fn(values.len(), 1, |i, _| values[i])
}

/// Read a `rows x cols` matrix stored column-major in `values`.
///
/// # Panics
///
/// Panics if `values.len() != rows * cols`.
#[must_use]
pub fn mat_from_column_major(rows: usize, cols: usize, values: &[f64]) -> Mat<f64> {
    assert_eq!(
        values.len(),
        rows * cols,
        "column-major buffer length must equal rows * cols"
    );
    Mat::from_fn(rows, cols, |i, j| values[j * rows + i])
}

/// Stable `log(1 + exp(x))`.
#[must_use]
pub fn log1pexp(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// Stable `log(1 / (1 + exp(-x)))`.
#[must_use]
pub fn log_sigmoid(x: f64) -> f64 {
    -log1pexp(-x)
}

/// Stable logistic transform.
#[must_use]
pub fn logistic_stable(value: f64) -> f64 {
    if value >= 0.0 {
        let z = (-value).exp();
        1.0 / (1.0 + z)
    } else {
        let z = value.exp();
        z / (1.0 + z)
    }
}
