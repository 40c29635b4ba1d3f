use faer::Mat;
use glmm_objectives::{
    ModelInput, Objective, SparseEffects, SparseGlmmModel, render_breakdown_table,
    render_matrix_table, render_parameter_table, sparse_from_triplets,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Three groups, one random intercept each; all share one relative scale.
    let n = 9;
    let triplets: Vec<(usize, usize, f64)> = (0..n).map(|row| (row, row / 3, 1.0)).collect();
    let design = sparse_from_triplets(n, 3, &triplets)?;
    let pattern = sparse_from_triplets(3, 3, &[(0, 0, 0.0), (1, 1, 0.0), (2, 2, 0.0)])?;
    let effects = SparseEffects::new(design, pattern, &[1, 1, 1], 1)?;

    let input = ModelInput::new(
        Mat::from_fn(n, 1, |_, _| 1.0),
        Mat::from_fn(n, 1, |i, _| [0.0, 2.0, 1.0, 4.0, 6.0, 3.0, 1.0, 0.0, 2.0][i]),
    );
    let model = SparseGlmmModel::negative_binomial(input, effects)?;

    let theta = [0.6, 0.7, -0.5, 1.2, -0.8, 2.5];
    let report = model.report(&theta)?;
    println!("Sparse negative binomial GLMM\n\n{}", render_parameter_table(&model.layout(), &theta)?);
    println!("\n{}", render_matrix_table("lambda", &report.lambda));
    println!("\n{}", render_breakdown_table(&report.breakdown));
    Ok(())
}
