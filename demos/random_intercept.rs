use faer::Mat;
use glmm_objectives::utils::usize_to_f64;
use glmm_objectives::{
    GroupIndex, ModelInput, NbVariance, Objective, RandomInterceptModel, ResponseFamily,
    render_breakdown_table, render_parameter_table,
};

const N_GROUPS: usize = 6;
const PER_GROUP: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let n = N_GROUPS * PER_GROUP;
    let labels: Vec<i64> = (0..n)
        .map(|row| i64::try_from(row / PER_GROUP + 1).unwrap_or(i64::MAX))
        .collect();
    let groups = GroupIndex::from_one_based(&labels, N_GROUPS)?;
    let design_matrix = Mat::from_fn(n, 1, |_, _| 1.0);
    let outcome = Mat::from_fn(n, 1, |i, _| usize_to_f64((i * 7 + i / PER_GROUP) % 5));
    let input = ModelInput::new(design_matrix, outcome).with_groups(groups);

    let effects = [0.3, -0.2, 0.1, 0.0, -0.4, 0.25];
    let mut theta = vec![0.6];
    theta.extend(effects);
    theta.push(0.3_f64.ln());

    let poisson = RandomInterceptModel::new(input.clone(), ResponseFamily::Poisson)?;
    let report = poisson.report(&theta)?;
    println!("Poisson random intercepts\n\n{}", render_parameter_table(&poisson.layout(), &theta)?);
    println!("\n{}", render_breakdown_table(&report.breakdown));

    let family = ResponseFamily::NegativeBinomial {
        variance: NbVariance::Quadratic,
    };
    let negative_binomial = RandomInterceptModel::new(input, family)?;
    theta.push(0.5_f64.ln());
    let report = negative_binomial.report(&theta)?;
    println!(
        "\nNegative binomial random intercepts (k = {:.2})\n\n{}",
        report.family.scale,
        render_breakdown_table(&report.breakdown)
    );
    Ok(())
}
