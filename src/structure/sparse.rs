//! Sparse factors with a fixed pattern, and the indicator-driven gather that fills a
//! pattern from a small pool of variance-component parameters.
//!
//! Stored entries of a [`SparseColMat`] are ordered by column, then by row; that order
//! is the "pattern order" used by [`ParameterIndicator`].

use faer::sparse::{SparseColMat, Triplet};

use super::StructureError;

/// Build a CSC matrix from `(row, col, value)` triplets in any order.
///
/// Repeated positions are summed into one stored entry.
///
/// # Errors
///
/// Returns `StructureError::EntryOutOfBounds` if a triplet lies outside the matrix, or
/// `StructureError::SparseAssembly` if faer cannot allocate the matrix.
pub fn sparse_from_triplets(
    nrows: usize,
    ncols: usize,
    entries: &[(usize, usize, f64)],
) -> Result<SparseColMat<usize, f64>, StructureError> {
    if let Some(&(row, col, _)) = entries.iter().find(|&&(row, col, _)| row >= nrows || col >= ncols)
    {
        return Err(StructureError::EntryOutOfBounds {
            row,
            col,
            nrows,
            ncols,
        });
    }
    let triplets: Vec<Triplet<usize, usize, f64>> = entries
        .iter()
        .map(|&(row, col, value)| Triplet::new(row, col, value))
        .collect();
    SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)
        .map_err(|_| StructureError::SparseAssembly { nrows, ncols })
}

/// Number of stored entries.
#[must_use]
pub fn stored_len(matrix: &SparseColMat<usize, f64>) -> usize {
    matrix.val().len()
}

/// Validated many-to-one map from stored sparse entries to a parameter pool.
///
/// Built from 1-based indicators; held 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterIndicator {
    indices: Vec<usize>,
    pool: usize,
}

impl ParameterIndicator {
    /// # Errors
    ///
    /// Returns `StructureError::IndicatorOutOfRange` if any value is outside `1..=pool`.
    pub fn from_one_based(values: &[i64], pool: usize) -> Result<Self, StructureError> {
        let indices = values
            .iter()
            .enumerate()
            .map(|(position, &value)| {
                usize::try_from(value)
                    .ok()
                    .filter(|&index| (1..=pool).contains(&index))
                    .map(|index| index - 1)
                    .ok_or(StructureError::IndicatorOutOfRange {
                        position,
                        value,
                        pool,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { indices, pool })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Size of the parameter pool the indicator points into.
    #[must_use]
    pub const fn pool(&self) -> usize {
        self.pool
    }

    /// 0-based parameter index for stored entry `slot`.
    #[must_use]
    pub fn parameter_index(&self, slot: usize) -> usize {
        self.indices[slot]
    }
}

/// Gather `theta` into the stored entries of `pattern`: entry `k` becomes
/// `theta[indicator[k]]`. The pattern is left untouched; the result shares its
/// symbolic structure.
///
/// # Errors
///
/// Returns `StructureError` if the indicator does not cover every stored entry or if
/// `theta` does not match the indicator's pool.
pub fn fill_from_indicator(
    pattern: &SparseColMat<usize, f64>,
    indicator: &ParameterIndicator,
    theta: &[f64],
) -> Result<SparseColMat<usize, f64>, StructureError> {
    let stored = stored_len(pattern);
    if indicator.len() != stored {
        return Err(StructureError::IndicatorLengthMismatch {
            indicators: indicator.len(),
            stored,
        });
    }
    if theta.len() != indicator.pool() {
        return Err(StructureError::ParameterLength {
            name: "theta",
            expected: indicator.pool(),
            found: theta.len(),
        });
    }

    let symbolic = pattern.symbolic();
    let col_ptr = symbolic.col_ptr();
    let row_idx = symbolic.row_idx();
    let triplets: Vec<Triplet<usize, usize, f64>> = (0..pattern.ncols())
        .flat_map(|col| (col_ptr[col]..col_ptr[col + 1]).map(move |slot| (col, slot)))
        .map(|(col, slot)| Triplet::new(row_idx[slot], col, theta[indicator.parameter_index(slot)]))
        .collect();
    SparseColMat::try_new_from_triplets(pattern.nrows(), pattern.ncols(), &triplets).map_err(
        |_| StructureError::SparseAssembly {
            nrows: pattern.nrows(),
            ncols: pattern.ncols(),
        },
    )
}
