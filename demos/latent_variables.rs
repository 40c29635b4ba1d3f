use faer::Mat;
use glmm_objectives::utils::usize_to_f64;
use glmm_objectives::{
    LatentInput, LatentOptions, LatentVariableModel, LoadingParametrization, Objective,
    ResponseFamily, render_breakdown_table, render_matrix_table,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let (n, p, num_lv) = (12, 5, 2);
    let responses = Mat::from_fn(n, p, |i, j| usize_to_f64((i + 3 * j) % 4));
    let covariates = Mat::from_fn(n, 1, |i, _| usize_to_f64(i) / usize_to_f64(n));
    let input = LatentInput::new(responses, num_lv).with_covariates(covariates);

    for loadings in [LoadingParametrization::LogDiagonal, LoadingParametrization::Packed] {
        let options = LatentOptions {
            family: ResponseFamily::Poisson,
            loadings,
        };
        let model = LatentVariableModel::new(input.clone(), options)?;
        let theta: Vec<f64> = (0..model.layout().len())
            .map(|i| 0.1 * (usize_to_f64(i % 5) - 2.0))
            .collect();
        let report = model.report(&theta)?;
        println!("Latent variable model ({loadings:?} loadings)\n");
        println!("{}", render_matrix_table("loadings", &report.newlam));
        println!("\n{}\n", render_breakdown_table(&report.breakdown));
    }
    Ok(())
}
