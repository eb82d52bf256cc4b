//! Beta density, used as the prior over per-node discounts.

use super::stable::log_beta;

/// Log of the Beta PDF at x.
///
/// Boundary points follow the limiting density: +inf when the matching shape
/// is below one, -inf when above, finite when exactly one.
pub fn log_beta_pdf(x: f64, alpha: f64, beta: f64) -> f64 {
    if x.is_nan() || alpha.is_nan() || beta.is_nan() {
        return f64::NAN;
    }
    if alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    if !(0.0..=1.0).contains(&x) {
        return f64::NEG_INFINITY;
    }
    if x == 0.0 {
        return boundary(alpha, -log_beta(1.0, beta));
    }
    if x == 1.0 {
        return boundary(beta, -log_beta(alpha, 1.0));
    }
    (alpha - 1.0) * x.ln() + (beta - 1.0) * (-x).ln_1p() - log_beta(alpha, beta)
}

fn boundary(shape: f64, at_one: f64) -> f64 {
    if shape < 1.0 {
        f64::INFINITY
    } else if shape > 1.0 {
        f64::NEG_INFINITY
    } else {
        at_one
    }
}
