//! Reporting helpers: serde support for faer matrices and `comfy_table` renderers for
//! parameter vectors, objective breakdowns, and reported matrices.

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use faer::Mat;
use serde::{Serialize, Serializer};

use super::objective::{ObjectiveBreakdown, ObjectiveError, ParameterLayout};

/// Serialize a matrix as a list of rows.
///
/// # Errors
///
/// Propagates the serializer's error.
pub fn serialize_mat<S>(matrix: &Mat<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let rows: Vec<Vec<f64>> = (0..matrix.nrows())
        .map(|i| (0..matrix.ncols()).map(|j| matrix[(i, j)]).collect())
        .collect();
    rows.serialize(serializer)
}

/// One row per parameter: position, label, value.
///
/// # Errors
///
/// Returns `ObjectiveError::ParameterLength` if `theta` does not match `layout`.
pub fn render_parameter_table(
    layout: &ParameterLayout,
    theta: &[f64],
) -> Result<Table, ObjectiveError> {
    layout.check(theta)?;
    let mut table = make_table(&["#", "parameter", "value"]);
    for (index, (label, value)) in layout.labels().into_iter().zip(theta).enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(label),
            value_cell(*value, 6),
        ]);
    }
    Ok(table)
}

#[must_use]
pub fn render_breakdown_table(breakdown: &ObjectiveBreakdown) -> Table {
    let mut table = make_table(&["term", "negative log-likelihood"]);
    for (term, value) in [
        ("observations", breakdown.observation),
        ("random effects", breakdown.random_effects),
        ("total", breakdown.total),
    ] {
        table.add_row(vec![Cell::new(term), value_cell(value, 6)]);
    }
    table
}

/// Dense matrix with row and column indices.
#[must_use]
pub fn render_matrix_table(name: &str, matrix: &Mat<f64>) -> Table {
    let headers: Vec<String> = std::iter::once(name.to_string())
        .chain((0..matrix.ncols()).map(|j| j.to_string()))
        .collect();
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let mut table = make_table(&header_refs);
    for i in 0..matrix.nrows() {
        let mut row = vec![Cell::new(i)];
        row.extend((0..matrix.ncols()).map(|j| value_cell(matrix[(i, j)], 4)));
        table.add_row(row);
    }
    table
}

fn make_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(*h)).collect::<Vec<_>>());
    table
}

fn value_cell(value: f64, precision: usize) -> Cell {
    if value.is_finite() {
        Cell::new(format!("{value:.precision$}"))
    } else {
        Cell::new(value.to_string())
    }
}
