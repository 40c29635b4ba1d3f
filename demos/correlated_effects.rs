use faer::Mat;
use glmm_objectives::utils::usize_to_f64;
use glmm_objectives::{
    CorrelatedEffectsModel, GroupIndex, ModelInput, Objective, ObjectiveConfig,
    intercept_and_slope, render_breakdown_table, render_matrix_table, render_parameter_table,
};

const CONFIG: &str = r#"
diagonal = "variance"

[family]
kind = "negative_binomial"
variance = "quadratic"
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = ObjectiveConfig::from_toml_str(CONFIG)?;

    let (ngroups, per_group) = (4, 5);
    let n = ngroups * per_group;
    let groups = GroupIndex::from_zero_based((0..n).map(|row| row / per_group).collect(), ngroups)?;
    let time: Vec<f64> = (0..n).map(|row| usize_to_f64(row % per_group)).collect();
    let design_matrix = Mat::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { time[i] });
    let outcome = Mat::from_fn(n, 1, |i, _| usize_to_f64((i * 3) % 7));
    let input = ModelInput::new(design_matrix, outcome)
        .with_groups(groups)
        .with_random_design(intercept_and_slope(&time));

    let model = CorrelatedEffectsModel::new(input, config.correlated_options())?;
    let mut theta = vec![0.8, 0.1];
    theta.extend([0.2, -0.05, -0.1, 0.02, 0.0, 0.0, -0.3, 0.04]);
    theta.extend([0.4_f64.ln(), 0.1_f64.ln()]);
    theta.push(0.3_f64.ln());
    theta.push(0.5);

    let report = model.report(&theta)?;
    println!("Correlated intercepts and slopes\n\n{}", render_parameter_table(&model.layout(), &theta)?);
    println!("\n{}", render_matrix_table("covariance", &report.covariance));
    println!("\n{}", render_breakdown_table(&report.breakdown));
    println!("\nrho = {:.3}", report.rho);
    Ok(())
}
