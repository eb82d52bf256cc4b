//! Categorical sampling from linear- or log-space weight vectors.
//!
//! All draws go through a cumulative table and a lower-bound search, so a
//! slot whose weight is zero (or `-inf` in log space) can never be chosen.
//! Callers pass their own random stream; nothing here touches a global RNG.

use rand::Rng;

use super::stable::log_add_exp;

/// Uniform draw on the open interval (0, 1).
pub fn uniform_open<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.random();
        if u > 0.0 {
            return u;
        }
    }
}

/// Uniform draw on [lo, hi).
pub fn uniform_range<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * rng.random::<f64>()
}

/// Cumulative weight table for repeated categorical draws.
#[derive(Debug, Clone)]
pub struct Cumulative {
    cumsum: Vec<f64>,
    log_space: bool,
}

impl Cumulative {
    /// Build from non-negative linear weights.
    ///
    /// Returns `None` for empty input, any negative or NaN weight, or a
    /// total mass that is zero or infinite.
    pub fn linear(weights: &[f64]) -> Option<Self> {
        let mut cumsum = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for &w in weights {
            if w.is_nan() || w < 0.0 {
                return None;
            }
            total += w;
            cumsum.push(total);
        }
        if !(total > 0.0 && total.is_finite()) {
            return None;
        }
        Some(Cumulative {
            cumsum,
            log_space: false,
        })
    }

    /// Build from unnormalized log weights.
    ///
    /// Returns `None` for empty input, any NaN or `+inf` entry, or when every
    /// entry is `-inf`.
    pub fn log(log_weights: &[f64]) -> Option<Self> {
        let mut cumsum = Vec::with_capacity(log_weights.len());
        let mut total = f64::NEG_INFINITY;
        for &lw in log_weights {
            if lw.is_nan() || lw == f64::INFINITY {
                return None;
            }
            total = log_add_exp(total, lw);
            cumsum.push(total);
        }
        if total == f64::NEG_INFINITY || total.is_nan() {
            return None;
        }
        Some(Cumulative {
            cumsum,
            log_space: true,
        })
    }

    pub fn len(&self) -> usize {
        self.cumsum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumsum.is_empty()
    }

    /// Total mass (log total for log tables).
    pub fn total(&self) -> f64 {
        self.cumsum.last().copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Draw one index.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let total = self.total();
        let z = if self.log_space {
            uniform_open(rng).ln() + total
        } else {
            uniform_open(rng) * total
        };
        let idx = self.cumsum.partition_point(|&c| c < z);
        if idx < self.cumsum.len() {
            return idx;
        }
        // Rounding pushed z past the last bucket; fall back to the last
        // index carrying mass.
        let last = self.cumsum.len() - 1;
        (0..=last)
            .rev()
            .find(|&i| i == 0 || self.cumsum[i] > self.cumsum[i - 1])
            .unwrap_or(last)
    }
}

/// Draw from weights that already sum to one.
pub fn sample_normalized<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> Option<usize> {
    sample_unnormalized(probs, rng)
}

/// Draw proportional to non-negative linear weights.
pub fn sample_unnormalized<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    Cumulative::linear(weights).map(|c| c.draw(rng))
}

/// Draw proportional to `exp(log_weights)`.
pub fn sample_unnormalized_log<R: Rng + ?Sized>(log_weights: &[f64], rng: &mut R) -> Option<usize> {
    Cumulative::log(log_weights).map(|c| c.draw(rng))
}

/// `n` categorical draws aggregated into per-slot counts.
pub fn multinomial_counts<R: Rng + ?Sized>(
    weights: &[f64],
    n: usize,
    rng: &mut R,
) -> Option<Vec<usize>> {
    let mut counts = vec![0usize; weights.len()];
    if n == 0 {
        return Some(counts);
    }
    let table = Cumulative::linear(weights)?;
    for _ in 0..n {
        counts[table.draw(rng)] += 1;
    }
    Some(counts)
}
