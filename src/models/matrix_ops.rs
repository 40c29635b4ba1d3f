use faer::Mat;

use crate::utils::column_from_slice;

/// `X beta` as a plain vector.
#[must_use]
pub fn linear_predictor(x: &Mat<f64>, beta: &[f64]) -> Vec<f64> {
    let eta = x * &column_from_slice(beta);
    column_values(&eta, 0)
}

/// Copy column `col` out of `matrix`.
#[must_use]
pub fn column_values(matrix: &Mat<f64>, col: usize) -> Vec<f64> {
    (0..matrix.nrows()).map(|i| matrix[(i, col)]).collect()
}
