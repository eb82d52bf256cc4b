//! Gamma density, used as the prior over per-node concentrations.
//!
//! Uses **rate parameterization**: `Gamma(α, β)` with shape α > 0 and
//! rate β > 0, density `β^α / Γ(α) * t^(α-1) * e^(-βt)`.

use super::stable::log_gamma;

/// Log of the Gamma distribution PDF at t.
pub fn gamma_log_pdf(t: f64, alpha: f64, beta: f64) -> f64 {
    if t.is_nan() || alpha.is_nan() || beta.is_nan() {
        return f64::NAN;
    }
    if alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    if t < 0.0 {
        return f64::NEG_INFINITY;
    }
    if t == 0.0 {
        return if alpha < 1.0 {
            f64::INFINITY
        } else if alpha == 1.0 {
            beta.ln()
        } else {
            f64::NEG_INFINITY
        };
    }
    alpha * beta.ln() - log_gamma(alpha) + (alpha - 1.0) * t.ln() - beta * t
}
