//! Numerically stable primitives for log-domain probability arithmetic.
//!
//! Seating probabilities are routinely products of many small factors, so
//! the hierarchy and the particle filter work on log weights. Every function
//! here is total: invalid inputs map to NaN or infinities instead of panics.

use std::f64::consts::{LN_2, PI};

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // published Lanczos coefficients
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// ln(1 + e^x) without overflow for large x or underflow for very negative x.
pub fn log1pexp(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= -37.0 {
        x.exp()
    } else if x <= 18.0 {
        x.exp().ln_1p()
    } else if x <= 33.3 {
        x + (-x).exp()
    } else {
        x
    }
}

/// ln(1 - e^-a) for a >= 0.
///
/// Switches between `expm1` and `ln_1p` at ln 2 to keep full precision on
/// both sides. Returns `-inf` at a == 0 and NaN for negative a.
pub fn log1mexp(a: f64) -> f64 {
    if a.is_nan() || a < 0.0 {
        return f64::NAN;
    }
    if a == 0.0 {
        return f64::NEG_INFINITY;
    }
    if a <= LN_2 {
        (-(-a).exp_m1()).ln()
    } else {
        (-(-a).exp()).ln_1p()
    }
}

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Stable log(exp(a) + exp(b)).
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    if a == f64::INFINITY || b == f64::INFINITY {
        return f64::INFINITY;
    }
    if a > b {
        a + log1pexp(b - a)
    } else {
        b + log1pexp(a - b)
    }
}

/// Stable log(exp(a) - exp(b)). Requires a >= b for a real-valued result.
pub fn log_sub_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    if a == f64::INFINITY {
        // inf - inf is undefined
        return if b == f64::INFINITY { f64::NAN } else { f64::INFINITY };
    }
    if a == b {
        return f64::NEG_INFINITY;
    }
    if a < b {
        return f64::NAN;
    }
    a + log1mexp(a - b)
}

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Uses a Lanczos approximation with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() || z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z <= 0.0 && (z - z.round()).abs() < 1e-15 {
        return f64::NAN;
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// Alias for log_gamma, matching typical lgamma naming.
pub fn lgamma(x: f64) -> f64 {
    log_gamma(x)
}

/// log Beta(a, b) = log Gamma(a) + log Gamma(b) - log Gamma(a+b).
pub fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

/// log(n!) using the Gamma function.
pub fn log_factorial(n: u64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    log_gamma((n as f64) + 1.0)
}

/// Running log-space accumulator, `-inf` until the first term arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogAccumulator(f64);

impl Default for LogAccumulator {
    fn default() -> Self {
        LogAccumulator(f64::NEG_INFINITY)
    }
}

impl LogAccumulator {
    pub fn add(&mut self, log_value: f64) {
        self.0 = log_add_exp(self.0, log_value);
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}
