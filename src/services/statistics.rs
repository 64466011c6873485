//! Statistical significance engine.
//!
//! Welch's two-sample t-test and Cohen's d, with the Student t CDF computed
//! from the regularized incomplete beta function. No I/O.

use crate::domain::models::{ScoreSummary, SignificanceReport, TTestResult};

/// Two-sided significance level.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

const CF_MAX_ITERATIONS: usize = 200;
const CF_EPSILON: f64 = 1e-10;
const FPMIN: f64 = 1e-30;

const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)]
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Arithmetic mean; 0 for an empty sample.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (divides by n - 1); 0 for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn standard_deviation(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn summarize_scores(values: &[f64]) -> ScoreSummary {
    ScoreSummary {
        count: values.len(),
        mean: mean(values),
        standard_deviation: standard_deviation(values),
    }
}

/// ln Γ(x) by the Lanczos approximation (g = 7, n = 9).
pub fn ln_gamma(x: f64) -> f64 {
    use std::f64::consts::PI;

    if x < 0.5 {
        // Reflection formula
        return PI.ln() - (PI * x).sin().ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut a = LANCZOS_COEFFICIENTS[0];
    for (i, c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Regularized incomplete beta function I_x(a, b).
pub fn incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let front =
        (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();

    if x > (a + 1.0) / (a + b + 2.0) {
        // I_x(a, b) = 1 - I_{1-x}(b, a) converges faster here
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    } else {
        front * beta_continued_fraction(x, a, b) / a
    }
}

/// Continued fraction for the incomplete beta, by Lentz's method.
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    let floor = |v: f64| if v.abs() < FPMIN { FPMIN } else { v };

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 / floor(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=CF_MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        // Even step
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / floor(1.0 + aa * d);
        c = floor(1.0 + aa / c);
        h *= d * c;

        // Odd step
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / floor(1.0 + aa * d);
        c = floor(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < CF_EPSILON {
            break;
        }
    }

    h
}

/// P(T <= t) for Student's t with `df` degrees of freedom.
pub fn t_distribution_cdf(t: f64, df: f64) -> f64 {
    if t == 0.0 {
        return 0.5;
    }
    if t < 0.0 {
        return 1.0 - t_distribution_cdf(-t, df);
    }
    let x = df / (df + t * t);
    1.0 - 0.5 * incomplete_beta(x, df / 2.0, 0.5)
}

/// Two-sided Welch's t-test for unequal variances.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> TTestResult {
    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (mean_a, mean_b) = (mean(a), mean(b));
    let (var_a, var_b) = (variance(a), variance(b));

    let se_a = if a.is_empty() { 0.0 } else { var_a / n_a };
    let se_b = if b.is_empty() { 0.0 } else { var_b / n_b };
    let combined = se_a + se_b;
    let pooled_df = (n_a + n_b - 2.0).max(0.0);

    let base = TTestResult {
        t_statistic: 0.0,
        degrees_of_freedom: pooled_df,
        p_value: 1.0,
        significant: false,
        mean_a,
        mean_b,
        sd_a: var_a.sqrt(),
        sd_b: var_b.sqrt(),
    };

    if combined <= 0.0 {
        return base;
    }

    let t_statistic = (mean_a - mean_b) / combined.sqrt();

    // Welch-Satterthwaite; groups with fewer than two values contribute nothing
    let term = |se: f64, n: f64| if n > 1.0 { se * se / (n - 1.0) } else { 0.0 };
    let denominator = term(se_a, n_a) + term(se_b, n_b);
    let degrees_of_freedom = if denominator > 0.0 {
        combined * combined / denominator
    } else {
        pooled_df
    };

    let p_value = if degrees_of_freedom > 0.0 {
        (2.0 * (1.0 - t_distribution_cdf(t_statistic.abs(), degrees_of_freedom))).clamp(0.0, 1.0)
    } else {
        1.0
    };

    TTestResult {
        t_statistic,
        degrees_of_freedom,
        p_value,
        significant: p_value <= SIGNIFICANCE_LEVEL,
        ..base
    }
}

/// Cohen's d with the average-variance pooled SD; 0 when that SD is 0.
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let pooled = ((variance(a) + variance(b)) / 2.0).sqrt();
    if pooled == 0.0 {
        return 0.0;
    }
    (mean(a) - mean(b)) / pooled
}

pub fn significance_report(treatment: &[f64], control: &[f64]) -> SignificanceReport {
    SignificanceReport {
        t_test: welch_t_test(treatment, control),
        cohens_d: cohens_d(treatment, control),
    }
}
