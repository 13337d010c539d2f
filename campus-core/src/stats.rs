//! Statistics for summarizing training runs.
//!
//! Includes the explained variance of value predictions, nonparametric
//! tolerance intervals and Student-t confidence intervals. The special
//! functions they need (log-gamma, regularized incomplete beta, binomial and
//! Student-t quantiles) are implemented here.
use crate::error::CampusError;
use std::f64::consts::PI;

/// A closed interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Lower bound.
    pub lower: f64,

    /// Upper bound.
    pub upper: f64,
}

/// Arithmetic mean, `NaN` for an empty sample.
pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Median, `NaN` for an empty sample.
pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Variance with `ddof` delta degrees of freedom.
pub fn variance(xs: &[f64], ddof: usize) -> f64 {
    let n = xs.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// `1 - Var(actual - predicted) / Var(actual)` with population variances.
///
/// Returns `0.0` when `Var(actual)` is zero (including empty input).
pub fn explained_variance(actual: &[f32], predicted: &[f32]) -> Result<f64, CampusError> {
    CampusError::check_len("predicted", actual.len(), predicted.len())?;
    if actual.is_empty() {
        return Ok(0.0);
    }
    let actual = actual.iter().map(|&v| v as f64).collect::<Vec<_>>();
    let residual = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, &p)| a - p as f64)
        .collect::<Vec<_>>();
    let var_y = variance(&actual, 0);
    if var_y == 0.0 {
        Ok(0.0)
    } else {
        Ok(1.0 - variance(&residual, 0) / var_y)
    }
}

/// Nonparametric `(alpha, beta)` tolerance interval.
///
/// With `nu = binom.ppf(1 - alpha, n, beta)`, returns the order statistics at
/// `floor(nu / 2)` and `ceil(n - nu / 2)` of the sorted sample, or the full
/// range if `nu >= n`. Returns `None` for an empty sample.
pub fn tolerance_interval(data: &[f64], alpha: f64, beta: f64) -> Option<Interval> {
    let n = data.len();
    if n == 0 {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let nu = binomial_ppf(1.0 - alpha, n, beta);
    if nu >= n {
        return Some(Interval {
            lower: sorted[0],
            upper: sorted[n - 1],
        });
    }

    let l = nu / 2;
    let u = ((n as f64 - nu as f64 / 2.0).ceil() as usize).min(n - 1);
    Some(Interval {
        lower: sorted[l],
        upper: sorted[u],
    })
}

/// Student-t confidence interval of the mean at level `1 - alpha`.
///
/// Returns `None` with fewer than two data points.
pub fn confidence_interval(data: &[f64], alpha: f64) -> Option<Interval> {
    let n = data.len();
    if n < 2 {
        return None;
    }
    let m = mean(data);
    let std_err = variance(data, 1).sqrt() / (n as f64).sqrt();
    let t = student_t_ppf(1.0 - alpha / 2.0, (n - 1) as f64);
    let margin = t * std_err;
    Some(Interval {
        lower: m - margin,
        upper: m + margin,
    })
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEF: [f64; 9] = [
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

/// Natural logarithm of the gamma function (Lanczos approximation).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula
        (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let t = x + LANCZOS_G + 0.5;
        let a = LANCZOS_COEF[1..]
            .iter()
            .enumerate()
            .fold(LANCZOS_COEF[0], |a, (i, c)| a + c / (x + (i + 1) as f64));
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

/// Smallest `k` with `P(X <= k) >= q` for `X ~ Binomial(n, p)`.
pub fn binomial_ppf(q: f64, n: usize, p: f64) -> usize {
    if q <= 0.0 || p <= 0.0 {
        return 0;
    }
    if q >= 1.0 || p >= 1.0 {
        return n;
    }

    let nf = n as f64;
    let ln_n_fact = ln_gamma(nf + 1.0);
    let mut cdf = 0.0;
    for k in 0..=n {
        let kf = k as f64;
        let ln_pmf = ln_n_fact - ln_gamma(kf + 1.0) - ln_gamma(nf - kf + 1.0)
            + kf * p.ln()
            + (nf - kf) * (1.0 - p).ln();
        cdf += ln_pmf.exp();
        // Relative tolerance absorbs rounding in the accumulated sum
        if cdf >= q * (1.0 - 1e-12) {
            return k;
        }
    }
    n
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-15;
    const FP_MIN: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < FP_MIN { FP_MIN } else { v };
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta function `I_x(a, b)`.
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Cumulative distribution function of Student's t distribution.
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    let tail = 0.5 * regularized_incomplete_beta(0.5 * df, 0.5, x);
    if t >= 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Quantile function of Student's t distribution, found by bisection.
pub fn student_t_ppf(p: f64, df: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < 0.5 {
        return -student_t_ppf(1.0 - p, df);
    }
    if p == 0.5 {
        return 0.0;
    }

    let mut lo = 0.0;
    let mut hi = 1.0;
    while student_t_cdf(hi, df) < p && hi < 1e12 {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if student_t_cdf(mid, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 * hi.max(1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}
