use approx::assert_relative_eq;
use faer::Mat;
use glmm_objectives::families::log_normal_pdf;
use glmm_objectives::utils::usize_to_f64;
use glmm_objectives::{
    CompoundSymmetric, CorrelatedEffectsModel, CorrelatedOptions, DiagonalConvention, GroupIndex,
    LatentInput, LatentOptions, LatentVariableModel, LinearModel, LoadingParametrization,
    ModelInput, NbVariance, Objective, ObjectiveError, ParameterIndicator, RandomInterceptModel,
    ResponseFamily, SparseEffects, SparseGlmmModel, fill_from_indicator, intercept_and_slope,
    render_breakdown_table, render_parameter_table, sparse_from_triplets,
};

fn column(values: &[f64]) -> Mat<f64> {
    Mat::from_fn(values.len(), 1, |i, _| values[i])
}

#[test]
fn gaussian_linear_model_matches_worked_example() {
    let x = Mat::from_fn(3, 2, |i, j| if j == 0 { 1.0 } else { usize_to_f64(i) });
    let model = LinearModel::gaussian(ModelInput::new(x, column(&[1.0, 2.0, 2.9])))
        .expect("valid input");

    let report = model.report(&[1.0, 1.0, 0.0]).expect("length matches");
    assert_eq!(report.fitted_mean, vec![1.0, 2.0, 3.0]);

    let residuals = [0.0, 0.0, -0.1];
    let expected: f64 = residuals
        .iter()
        .map(|r| 0.5 * std::f64::consts::TAU.ln() + 0.5 * r * r)
        .sum();
    assert_relative_eq!(report.breakdown.total, expected, epsilon = 1.0e-12);
}

#[test]
fn one_group_at_zero_reduces_to_fixed_effects() {
    let x = Mat::from_fn(4, 2, |i, j| if j == 0 { 1.0 } else { usize_to_f64(i) * 0.5 });
    let y = column(&[1.0, 0.0, 1.0, 1.0]);
    let fixed = LinearModel::new(ModelInput::new(x.clone(), y.clone()), ResponseFamily::bernoulli())
        .expect("valid input");
    let mixed = RandomInterceptModel::new(
        ModelInput::new(x, y).with_groups(GroupIndex::single(4)),
        ResponseFamily::bernoulli(),
    )
    .expect("valid input");

    let beta = [-0.3, 0.8];
    let fixed_nll = fixed.negative_log_likelihood(&beta).expect("length matches");
    let parts = mixed
        .breakdown(&[beta[0], beta[1], 0.0, 0.4])
        .expect("length matches");
    assert_eq!(parts.observation.to_bits(), fixed_nll.to_bits());
    assert_relative_eq!(
        parts.random_effects,
        -log_normal_pdf(0.0, 0.0, 0.4_f64.exp()),
        epsilon = 1.0e-12
    );
}

#[test]
fn vanishing_correlation_separates_group_penalties() {
    let z = [0.0, 1.0, 0.0, 1.0];
    let input = ModelInput::new(Mat::from_fn(4, 1, |_, _| 1.0), column(&[1.0, 3.0, 0.0, 2.0]))
        .with_groups(GroupIndex::from_one_based(&[1, 1, 2, 2], 2).expect("labels in range"))
        .with_random_design(intercept_and_slope(&z));
    let options = CorrelatedOptions {
        family: ResponseFamily::NegativeBinomial {
            variance: NbVariance::Quadratic,
        },
        diagonal: DiagonalConvention::Variance,
    };
    let model = CorrelatedEffectsModel::new(input, options).expect("valid input");

    let u = [0.4, -0.3, -0.8, 0.1];
    let (sd0, sd1) = (1.3_f64, 0.6_f64);
    let mut theta = vec![0.5];
    theta.extend(u);
    theta.extend([sd0.ln(), sd1.ln(), -0.7]);
    theta.push(1.0e-9);

    let independent: f64 = u
        .chunks_exact(2)
        .map(|pair| -log_normal_pdf(pair[0], 0.0, sd0) - log_normal_pdf(pair[1], 0.0, sd1))
        .sum();
    let parts = model.breakdown(&theta).expect("length matches");
    assert_relative_eq!(parts.random_effects, independent, epsilon = 1.0e-8);
}

#[test]
fn reported_covariance_round_trips_bit_for_bit() {
    let input = ModelInput::new(Mat::from_fn(3, 1, |_, _| 1.0), column(&[0.2, -1.0, 0.7]))
        .with_groups(GroupIndex::from_one_based(&[1, 2, 2], 2).expect("labels in range"))
        .with_random_design(intercept_and_slope(&[0.0, 0.5, 1.0]));
    let model = CorrelatedEffectsModel::new(input, CorrelatedOptions::default()).expect("valid input");
    let theta = [0.1, 0.3, -0.2, 0.5, 0.05, -0.4, 0.9, 0.0, -2.1];
    let report = model.report(&theta).expect("length matches");

    let rebuilt =
        CompoundSymmetric::from_parts(report.sd.clone(), report.rho, report.diagonal).matrix();
    for i in 0..2 {
        for j in 0..2 {
            assert_eq!(rebuilt[(i, j)].to_bits(), report.covariance[(i, j)].to_bits());
            assert_eq!(report.covariance[(i, j)].to_bits(), report.covariance[(j, i)].to_bits());
        }
    }
}

#[test]
fn indicator_fill_gathers_in_pattern_order() {
    let pattern = sparse_from_triplets(2, 2, &[(0, 0, 0.0), (1, 0, 0.0), (1, 1, 0.0)])
        .expect("valid pattern");
    let indicator = ParameterIndicator::from_one_based(&[1, 2, 1], 2).expect("in range");
    let filled = fill_from_indicator(&pattern, &indicator, &[3.0, 5.0]).expect("lengths match");
    assert_eq!(filled.val(), &[3.0, 5.0, 3.0]);
}

#[test]
fn sparse_glmm_rejects_out_of_range_indicator_before_evaluation() {
    let z = sparse_from_triplets(2, 1, &[(0, 0, 1.0), (1, 0, 1.0)]).expect("valid design");
    let pattern = sparse_from_triplets(1, 1, &[(0, 0, 0.0)]).expect("valid pattern");
    assert!(matches!(
        SparseEffects::new(z.clone(), pattern.clone(), &[0], 1),
        Err(ObjectiveError::Structure(_))
    ));

    let effects = SparseEffects::new(z, pattern, &[1], 1).expect("valid indicator");
    let input = ModelInput::new(Mat::from_fn(2, 1, |_, _| 1.0), column(&[3.0, 0.0]));
    let model = SparseGlmmModel::negative_binomial(input, effects).expect("valid model");
    assert_eq!(model.layout().len(), 4);
    assert!(matches!(
        model.negative_log_likelihood(&[1.0, 0.0, 0.0]),
        Err(ObjectiveError::ParameterLength {
            expected: 4,
            found: 3
        })
    ));
    // Non-positive alpha is a domain problem, not a precondition failure.
    let nll = model
        .negative_log_likelihood(&[1.0, 0.0, 0.0, 0.0])
        .expect("length matches");
    assert!(nll.is_nan());
}

#[test]
fn latent_loadings_are_zero_below_the_diagonal() {
    let y = Mat::from_fn(6, 4, |i, j| usize_to_f64((i + 2 * j) % 3));
    for loadings in [LoadingParametrization::LogDiagonal, LoadingParametrization::Packed] {
        for num_lv in 1..=4 {
            let options = LatentOptions {
                family: ResponseFamily::Poisson,
                loadings,
            };
            let model = LatentVariableModel::new(LatentInput::new(y.clone(), num_lv), options)
                .expect("valid input");
            let theta: Vec<f64> = (0..model.layout().len())
                .map(|i| 0.05 * usize_to_f64(i % 7) - 0.1)
                .collect();
            let report = model.report(&theta).expect("length matches");
            for i in 0..num_lv {
                for j in 0..i {
                    assert_eq!(report.newlam[(i, j)].to_bits(), 0.0_f64.to_bits());
                }
            }
            assert!(report.breakdown.is_finite());
        }
    }
}

#[test]
fn reports_serialize_to_json_and_tables() {
    let input = ModelInput::new(Mat::from_fn(3, 1, |_, _| 1.0), column(&[0.0, 4.0, 1.0]))
        .with_groups(GroupIndex::from_one_based(&[1, 2, 3], 3).expect("labels in range"));
    let model = RandomInterceptModel::new(input, ResponseFamily::Poisson).expect("valid input");
    let theta = [0.4, 0.1, -0.2, 0.3, -0.5];
    let report = model.report(&theta).expect("length matches");

    let json = serde_json::to_value(&report).expect("serializable");
    assert_eq!(json["u"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["family"]["family"]["kind"], "poisson");
    assert!(json["breakdown"]["total"].as_f64().is_some());

    let params = render_parameter_table(&model.layout(), &theta)
        .expect("length matches")
        .to_string();
    assert!(params.contains("u[2]"));
    assert!(params.contains("log_sd_u"));
    let parts = render_breakdown_table(&report.breakdown).to_string();
    assert!(parts.contains("total"));
}

#[test]
fn out_of_range_group_label_is_fatal() {
    let err = GroupIndex::from_one_based(&[1, 2, 5], 3).expect_err("label 5 exceeds ngroups");
    assert_eq!(err.to_string(), "group label at position 2 is 5; expected a value in 1..=3");
}

#[test]
fn stored_sd_diagonal_differs_from_variance_diagonal() {
    let sd = vec![2.0, 0.5];
    let variance = CompoundSymmetric::from_parts(sd.clone(), 0.25, DiagonalConvention::Variance);
    let plain = CompoundSymmetric::from_parts(sd, 0.25, DiagonalConvention::StandardDeviation);
    assert_relative_eq!(variance.matrix()[(0, 0)], 4.0);
    assert_relative_eq!(plain.matrix()[(0, 0)], 2.0);
    assert_relative_eq!(variance.matrix()[(0, 1)], plain.matrix()[(0, 1)]);
}
