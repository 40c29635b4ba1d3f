//! Scalar log densities used by the observation and random-effect terms.
//!
//! Every function returns `NaN` rather than failing when a distribution parameter is
//! outside its domain (negative scale, non-positive mean, variance below the mean).
//! That mirrors how an AD-driven optimizer expects objectives to signal a rejected
//! step.

use statrs::function::gamma::ln_gamma;

use crate::utils::log_sigmoid;

/// `log N(x; mean, sd)`.
#[must_use]
pub fn log_normal_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    if !sd.is_finite() || sd <= 0.0 {
        return f64::NAN;
    }
    log_standard_normal_pdf((x - mean) / sd) - sd.ln()
}

/// `log N(x; 0, 1)`.
#[must_use]
pub fn log_standard_normal_pdf(x: f64) -> f64 {
    -0.5 * x.mul_add(x, std::f64::consts::TAU.ln())
}

/// Poisson log-mass `y ln(rate) - rate - lnΓ(y + 1)`.
#[must_use]
pub fn log_poisson_pmf(y: f64, rate: f64) -> f64 {
    if !rate.is_finite() || rate < 0.0 {
        return f64::NAN;
    }
    if y == 0.0 {
        return -rate;
    }
    y.mul_add(rate.ln(), -rate) - ln_gamma(y + 1.0)
}

/// Sizes above `SERIES_SIZE * (y + 1)^2` use the first-order expansion of the
/// log-gamma ratio.
const SERIES_SIZE: f64 = 1.0e4;

/// Largest count for which the log-gamma ratio is summed term by term.
const MAX_SUMMED_COUNT: f64 = 1.0e3;

/// `lnΓ(y + size) - lnΓ(size) - y ln(size)`, which tends to zero as `size` grows.
fn ln_gamma_ratio_excess(y: f64, size: f64) -> f64 {
    if y == 0.0 {
        return 0.0;
    }
    let spread = y + 1.0;
    if size > SERIES_SIZE * spread * spread {
        return 0.5 * y * (y - 1.0) / size;
    }
    if y.fract() == 0.0 && y <= MAX_SUMMED_COUNT {
        let mut total = 0.0;
        let mut i = 1.0;
        while i < y {
            total += (i / size).ln_1p();
            i += 1.0;
        }
        return total;
    }
    y.mul_add(-size.ln(), ln_gamma(y + size) - ln_gamma(size))
}

/// Negative-binomial log-mass with mean `mu` and size (inverse overdispersion)
/// `size`, so `var = mu + mu^2 / size`.
///
/// An infinite `size` is the Poisson limit. Large finite sizes are evaluated without
/// differencing log-gamma values, so the mass converges to the Poisson one.
#[must_use]
pub fn log_nbinom_size(y: f64, mu: f64, size: f64) -> f64 {
    if !mu.is_finite() || mu <= 0.0 || size.is_nan() || size <= 0.0 {
        return f64::NAN;
    }
    if size.is_infinite() {
        return log_poisson_pmf(y, mu);
    }
    let ln_ratio = (mu / size).ln_1p();
    let tail = if y == 0.0 { 0.0 } else { y * (mu.ln() - ln_ratio) };
    ln_gamma_ratio_excess(y, size) - ln_gamma(y + 1.0) + size.mul_add(-ln_ratio, tail)
}

/// Negative-binomial log-mass parameterized by mean and variance.
///
/// Requires `mu > 0` and `var >= mu`; `var == mu` is the Poisson mass.
#[must_use]
pub fn log_nbinom_mean_variance(y: f64, mu: f64, variance: f64) -> f64 {
    if !mu.is_finite() || !variance.is_finite() || mu <= 0.0 || variance < mu {
        return f64::NAN;
    }
    if variance == mu {
        return log_poisson_pmf(y, mu);
    }
    log_nbinom_size(y, mu, mu * mu / (variance - mu))
}

/// `ln C(n, k)` through log-gamma.
#[must_use]
pub fn ln_choose(n: f64, k: f64) -> f64 {
    ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0)
}

/// Binomial log-mass evaluated from the log-odds.
///
/// Computes `y log σ(η) + (n - y) log σ(-η)` in log space, so large `|η|` never
/// overflows. The binomial coefficient is added only when `trials > 1`; for a
/// Bernoulli outcome it is identically zero.
#[must_use]
pub fn log_binomial_robust(y: f64, trials: f64, logit_p: f64) -> f64 {
    if logit_p.is_nan() {
        return f64::NAN;
    }
    let successes = if y == 0.0 { 0.0 } else { y * log_sigmoid(logit_p) };
    let failures = if trials - y == 0.0 {
        0.0
    } else {
        (trials - y) * log_sigmoid(-logit_p)
    };
    let constant = if trials > 1.0 { ln_choose(trials, y) } else { 0.0 };
    successes + failures + constant
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statrs::distribution::{Discrete, NegativeBinomial, Poisson};

    #[test]
    fn normal_matches_closed_form() {
        let expected = -0.5 * std::f64::consts::TAU.ln() - 2.0_f64.ln() - 0.5 * 0.25;
        assert_relative_eq!(log_normal_pdf(2.0, 1.0, 2.0), expected, epsilon = 1.0e-12);
        assert_relative_eq!(
            log_standard_normal_pdf(0.3),
            log_normal_pdf(0.3, 0.0, 1.0),
            epsilon = 1.0e-14
        );
    }

    #[test]
    fn normal_rejects_non_positive_scale() {
        assert!(log_normal_pdf(0.0, 0.0, 0.0).is_nan());
        assert!(log_normal_pdf(0.0, 0.0, -1.0).is_nan());
        assert!(log_normal_pdf(0.0, 0.0, f64::NAN).is_nan());
    }

    #[test]
    fn poisson_matches_statrs() {
        let dist = Poisson::new(3.5).expect("valid rate");
        for y in [0_u64, 1, 4, 11] {
            #[allow(clippy::cast_precision_loss)]
            let yf = y as f64;
            assert_relative_eq!(log_poisson_pmf(yf, 3.5), dist.ln_pmf(y), epsilon = 1.0e-10);
        }
    }

    #[test]
    fn poisson_handles_zero_rate_and_rejects_negative_rate() {
        assert_relative_eq!(log_poisson_pmf(0.0, 0.0), 0.0);
        assert!(log_poisson_pmf(2.0, -0.1).is_nan());
    }

    #[test]
    fn nbinom_matches_statrs_size_prob_form() {
        let mu = 2.5;
        let alpha = 1.7;
        let variance = mu + mu * mu / alpha;
        let dist = NegativeBinomial::new(alpha, mu / variance).expect("valid parameters");
        for y in [0_u64, 1, 3, 9] {
            #[allow(clippy::cast_precision_loss)]
            let yf = y as f64;
            assert_relative_eq!(
                log_nbinom_mean_variance(yf, mu, variance),
                dist.ln_pmf(y),
                epsilon = 1.0e-10
            );
        }
    }

    #[test]
    fn nbinom_rejects_underdispersion() {
        assert!(log_nbinom_mean_variance(1.0, 2.0, 1.0).is_nan());
        assert!(log_nbinom_mean_variance(1.0, 0.0, 1.0).is_nan());
        assert!(log_nbinom_size(1.0, 2.0, 0.0).is_nan());
        assert!(log_nbinom_size(1.0, 2.0, -1.0).is_nan());
    }

    #[test]
    fn nbinom_at_equal_mean_and_variance_is_poisson() {
        assert_relative_eq!(
            log_nbinom_mean_variance(2.0, 1.0, 1.0),
            log_poisson_pmf(2.0, 1.0),
            epsilon = 1.0e-14
        );
        assert_relative_eq!(log_poisson_pmf(2.0, 1.0), -1.0 - 2.0_f64.ln(), epsilon = 1.0e-14);
        assert_relative_eq!(
            log_nbinom_size(3.0, 0.7, f64::INFINITY),
            log_poisson_pmf(3.0, 0.7),
            epsilon = 1.0e-14
        );
    }

    #[test]
    fn nbinom_size_form_matches_statrs_for_non_integer_counts() {
        let (mu, size) = (4.0, 2.5);
        let p = size / (size + mu);
        let y = 2.5_f64;
        let expected = ln_gamma(y + size) - ln_gamma(size) - ln_gamma(y + 1.0)
            + size * p.ln()
            + y * (1.0 - p).ln();
        assert_relative_eq!(log_nbinom_size(y, mu, size), expected, epsilon = 1.0e-10);
        let dist = NegativeBinomial::new(size, p).expect("valid parameters");
        assert_relative_eq!(log_nbinom_size(3.0, mu, size), dist.ln_pmf(3), epsilon = 1.0e-10);
    }

    #[test]
    fn nbinom_converges_to_poisson_as_size_grows() {
        for y in [0.0, 1.0, 2.0, 7.0, 40.0] {
            let mu = 3.2;
            let poisson = log_poisson_pmf(y, mu);
            for log_size in [30.0_f64, 37.0, 200.0, 700.0, 800.0] {
                let value = log_nbinom_size(y, mu, log_size.exp());
                assert!(value.is_finite(), "y = {y}, log size = {log_size}");
                assert_relative_eq!(value, poisson, epsilon = 1.0e-9);
            }
        }
    }

    #[test]
    fn nbinom_summed_and_gamma_ratios_agree() {
        let size = 1.3;
        for y in [1.0_f64, 5.0, 60.0] {
            let summed = ln_gamma_ratio_excess(y, size);
            let direct = y.mul_add(-size.ln(), ln_gamma(y + size) - ln_gamma(size));
            assert_relative_eq!(summed, direct, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn bernoulli_matches_naive_logistic_in_safe_range() {
        for eta in [-3.0_f64, -0.5, 0.0, 0.8, 4.0] {
            let p = 1.0 / (1.0 + (-eta).exp());
            assert_relative_eq!(log_binomial_robust(1.0, 1.0, eta), p.ln(), epsilon = 1.0e-12);
            assert_relative_eq!(
                log_binomial_robust(0.0, 1.0, eta),
                (1.0 - p).ln(),
                epsilon = 1.0e-12
            );
        }
    }

    #[test]
    fn bernoulli_is_finite_for_extreme_log_odds() {
        for eta in [-800.0, -40.0, 40.0, 800.0] {
            assert!(log_binomial_robust(1.0, 1.0, eta).is_finite());
            assert!(log_binomial_robust(0.0, 1.0, eta).is_finite());
        }
        assert_relative_eq!(log_binomial_robust(1.0, 1.0, 800.0), 0.0);
        assert_relative_eq!(log_binomial_robust(0.0, 1.0, 800.0), -800.0, epsilon = 1.0e-9);
    }

    #[test]
    fn binomial_adds_coefficient_for_multiple_trials() {
        let eta = 0.4_f64;
        let p = 1.0 / (1.0 + (-eta).exp());
        let expected = 10.0_f64.ln() + 2.0 * p.ln() + 3.0 * (1.0 - p).ln();
        assert_relative_eq!(log_binomial_robust(2.0, 5.0, eta), expected, epsilon = 1.0e-10);
    }
}
