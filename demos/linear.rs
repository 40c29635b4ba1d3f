use faer::Mat;
use glmm_objectives::utils::usize_to_f64;
use glmm_objectives::{
    GaussianSampleModel, LinearModel, ModelInput, Objective, render_breakdown_table,
    render_parameter_table,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let n = 40;
    let design_matrix = Mat::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { usize_to_f64(i) / 10.0 });
    let outcome = Mat::from_fn(n, 1, |i, _| {
        let wobble = if i % 3 == 0 { 0.2 } else { -0.1 };
        0.75f64.mul_add(usize_to_f64(i) / 10.0, 1.5) + wobble
    });
    let model = LinearModel::gaussian(ModelInput::new(design_matrix, outcome))?;

    let theta = [1.5, 0.75, 0.15_f64.ln()];
    let report = model.report(&theta)?;
    println!("Gaussian linear model\n\n{}", render_parameter_table(&model.layout(), &theta)?);
    println!("\n{}", render_breakdown_table(&report.breakdown));
    println!(
        "fitted mean range: {:.3} .. {:.3}",
        report.fitted_mean.first().copied().unwrap_or(f64::NAN),
        report.fitted_mean.last().copied().unwrap_or(f64::NAN)
    );

    let sample = GaussianSampleModel::new(vec![2.1, 1.8, 2.4, 2.0, 1.7])?;
    let moments = sample.report(&[2.0, 0.08])?;
    println!(
        "\nSample mean/variance objective at (2.0, 0.08): {:.4} (sd {:.3})",
        moments.breakdown.total, moments.sd
    );
    Ok(())
}
