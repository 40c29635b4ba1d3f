//! Triangular loading matrices for latent-variable models.
//!
//! A `num_lv x p` loading matrix has entry `(i, j)` fixed at zero whenever `j < i`;
//! that constraint removes the rotational freedom of the latent scores. The remaining
//! entries (`j >= i`) are read from flat parameter slices, row by row.

use faer::Mat;
use serde::{Deserialize, Serialize};

use super::StructureError;

/// How the non-zero part of the loading matrix is stored in the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingParametrization {
    /// Entries with `j > i` come from the free vector; the diagonal is
    /// `exp(log_diagonal[i])`, which keeps it strictly positive.
    #[default]
    LogDiagonal,
    /// Every entry with `j >= i`, diagonal included, comes from one free vector with no
    /// sign constraint on the diagonal.
    Packed,
}

impl LoadingParametrization {
    /// Length of the free (off-diagonal or packed) vector.
    #[must_use]
    pub const fn free_len(self, num_lv: usize, responses: usize) -> usize {
        match self {
            Self::LogDiagonal => num_lv * responses - num_lv * (num_lv + 1) / 2,
            Self::Packed => num_lv * responses - num_lv * num_lv.saturating_sub(1) / 2,
        }
    }

    /// Length of the separately log-transformed diagonal vector.
    #[must_use]
    pub const fn diagonal_len(self, num_lv: usize) -> usize {
        match self {
            Self::LogDiagonal => num_lv,
            Self::Packed => 0,
        }
    }
}

/// Offset of entry `(row, col)`, `col > row`, in the strictly-triangular free vector.
///
/// Equivalent to `row * p - row * (row + 1) / 2 + (col - 1) - row`.
#[must_use]
pub const fn strict_offset(row: usize, col: usize, responses: usize) -> usize {
    (row * responses + col) - (row * (row + 1) / 2 + row + 1)
}

/// Offset of entry `(row, col)`, `col >= row`, in the packed free vector.
///
/// Equivalent to `row * p - row * (row - 1) / 2 + (col - row)`.
#[must_use]
pub const fn packed_offset(row: usize, col: usize, responses: usize) -> usize {
    (row * responses + col) - (row * row.saturating_sub(1) / 2 + row)
}

/// Shape and parametrization of a triangular loading matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangularLoadings {
    num_lv: usize,
    responses: usize,
    parametrization: LoadingParametrization,
}

impl TriangularLoadings {
    /// # Errors
    ///
    /// Returns `StructureError::InvalidLatentDimension` unless `1 <= num_lv <= responses`.
    pub const fn new(
        num_lv: usize,
        responses: usize,
        parametrization: LoadingParametrization,
    ) -> Result<Self, StructureError> {
        if num_lv == 0 || num_lv > responses {
            return Err(StructureError::InvalidLatentDimension { num_lv, responses });
        }
        Ok(Self {
            num_lv,
            responses,
            parametrization,
        })
    }

    #[must_use]
    pub const fn num_lv(&self) -> usize {
        self.num_lv
    }

    #[must_use]
    pub const fn responses(&self) -> usize {
        self.responses
    }

    #[must_use]
    pub const fn parametrization(&self) -> LoadingParametrization {
        self.parametrization
    }

    #[must_use]
    pub const fn free_len(&self) -> usize {
        self.parametrization.free_len(self.num_lv, self.responses)
    }

    #[must_use]
    pub const fn diagonal_len(&self) -> usize {
        self.parametrization.diagonal_len(self.num_lv)
    }

    /// Assemble the `num_lv x p` loading matrix.
    ///
    /// `log_diagonal` is ignored (and must be empty) under
    /// [`LoadingParametrization::Packed`].
    ///
    /// # Errors
    ///
    /// Returns `StructureError::ParameterLength` if either slice has the wrong length.
    pub fn build(&self, free: &[f64], log_diagonal: &[f64]) -> Result<Mat<f64>, StructureError> {
        if free.len() != self.free_len() {
            return Err(StructureError::ParameterLength {
                name: "loadings",
                expected: self.free_len(),
                found: free.len(),
            });
        }
        if log_diagonal.len() != self.diagonal_len() {
            return Err(StructureError::ParameterLength {
                name: "log_diagonal",
                expected: self.diagonal_len(),
                found: log_diagonal.len(),
            });
        }

        let p = self.responses;
        let loadings = match self.parametrization {
            LoadingParametrization::LogDiagonal => Mat::from_fn(self.num_lv, p, |i, j| {
                if j < i {
                    0.0
                } else if i == j {
                    log_diagonal[i].exp()
                } else {
                    free[strict_offset(i, j, p)]
                }
            }),
            LoadingParametrization::Packed => Mat::from_fn(self.num_lv, p, |i, j| {
                if j < i { 0.0 } else { free[packed_offset(i, j, p)] }
            }),
        };
        Ok(loadings)
    }
}
