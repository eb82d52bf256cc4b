//! Pitman-Yor predictive rule.
//!
//! With per-dish counts `cw`, `tw` and node totals `c`, `t`:
//!
//! ```text
//! p(dish) = (cw - d·tw + (a + d·t)·parent) / (c + a)
//! ```
//!
//! An empty node (`c == 0`) passes the parent probability through unchanged.

use pyp_math::log_add_exp;

pub fn predictive(
    cw: usize,
    tw: usize,
    c: usize,
    t: usize,
    parent: f64,
    discount: f64,
    concentration: f64,
) -> f64 {
    if c == 0 {
        return parent;
    }
    let cached = cw as f64 - discount * tw as f64;
    let fresh = (concentration + discount * t as f64) * parent;
    (cached + fresh) / (c as f64 + concentration)
}

/// Log-space [`predictive`], combining both terms with a stable log-add.
pub fn log_predictive(
    cw: usize,
    tw: usize,
    c: usize,
    t: usize,
    log_parent: f64,
    discount: f64,
    concentration: f64,
) -> f64 {
    if c == 0 {
        return log_parent;
    }
    let log_denom = (c as f64 + concentration).ln();
    log_add_exp(
        (cw as f64 - discount * tw as f64).ln() - log_denom,
        log_parent + (concentration + discount * t as f64).ln() - log_denom,
    )
}

/// `ln((cw - d·tw) / (c + a))`, or `-inf` for an unseen dish.
pub fn log_cache_probability(
    cw: usize,
    tw: usize,
    c: usize,
    discount: f64,
    concentration: f64,
) -> f64 {
    if cw == 0 {
        return f64::NEG_INFINITY;
    }
    (cw as f64 - discount * tw as f64).ln() - (c as f64 + concentration).ln()
}

/// `ln((a + d·t) / (c + a)) + ln parent`.
pub fn log_new_table_probability(
    c: usize,
    t: usize,
    log_parent: f64,
    discount: f64,
    concentration: f64,
) -> f64 {
    (concentration + discount * t as f64).ln() + log_parent - (c as f64 + concentration).ln()
}
