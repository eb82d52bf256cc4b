//! Resampling strategies.
//!
//! Every strategy turns normalized probabilities `p` into copy counts that
//! sum to `N` with `E[count_m] = N · p_m`. [`apply_counts`] then rewrites
//! the population in place.

use pyp_config::ResampleMethod;
use pyp_math::{multinomial_counts, uniform_range};
use rand::Rng;

use super::system::ParticleSystem;
use super::SmcError;

/// Copy counts for each particle under `method`.
///
/// `probs` must carry positive, finite total mass; otherwise the population
/// is degenerate.
pub fn resample_counts<R: Rng + ?Sized>(
    method: ResampleMethod,
    probs: &[f64],
    rng: &mut R,
) -> Result<Vec<usize>, SmcError> {
    let n = probs.len();
    let total: f64 = probs.iter().sum();
    if n == 0 || !(total > 0.0 && total.is_finite()) {
        return Err(SmcError::Degenerate { particles: n });
    }
    let counts = match method {
        ResampleMethod::None => Some(vec![1; n]),
        ResampleMethod::Multinomial => multinomial_counts(probs, n, rng),
        ResampleMethod::Residual => residual(probs, total, rng),
        ResampleMethod::Stratified => Some(strata(probs, total, || uniform_range(rng, 0.0, 1.0))),
        ResampleMethod::Systematic => {
            let jitter = uniform_range(rng, 0.0, 1.0);
            Some(strata(probs, total, || jitter))
        }
    };
    counts.ok_or(SmcError::Degenerate { particles: n })
}

/// `floor(N p_m)` deterministic copies plus a multinomial draw of the
/// remaining slots over the fractional parts.
fn residual<R: Rng + ?Sized>(probs: &[f64], total: f64, rng: &mut R) -> Option<Vec<usize>> {
    let n = probs.len();
    let mut whole = Vec::with_capacity(n);
    let mut fractions = Vec::with_capacity(n);
    for &p in probs {
        let expected = n as f64 * p / total;
        let floor = expected.floor();
        whole.push(floor as usize);
        fractions.push(expected - floor);
    }
    let remaining = n.saturating_sub(whole.iter().sum());
    let extra = multinomial_counts(&fractions, remaining, rng)?;
    Some(whole.iter().zip(extra).map(|(w, e)| w + e).collect())
}

/// One point per stratum `[j/N, (j+1)/N)` at offset `jitter()`, matched
/// against the cumulative weights.
fn strata(probs: &[f64], total: f64, mut jitter: impl FnMut() -> f64) -> Vec<usize> {
    let n = probs.len();
    let mut counts = vec![0; n];
    let mut k = 0;
    let mut cumulative = probs[0] / total;
    let mut last_live = if probs[0] > 0.0 { Some(0) } else { None };
    for j in 0..n {
        let u = (j as f64 + jitter()) / n as f64;
        while cumulative <= u && k + 1 < n {
            k += 1;
            cumulative += probs[k] / total;
            if probs[k] > 0.0 {
                last_live = Some(k);
            }
        }
        // Rounding at the top end can leave k on a dead slot.
        counts[last_live.unwrap_or(k)] += 1;
    }
    counts
}

/// Ancestor slot for every position given copy counts.
///
/// Survivors keep their own slot; extra copies fill the slots of particles
/// with no copies, in order.
pub fn ancestors(counts: &[usize]) -> Vec<usize> {
    let n = counts.len();
    let mut ancestors: Vec<usize> = (0..n).collect();
    let mut free = (0..n).filter(|&m| counts[m] == 0);
    for (m, &c) in counts.iter().enumerate() {
        for _ in 1..c {
            if let Some(slot) = free.next() {
                ancestors[slot] = m;
            }
        }
    }
    ancestors
}

/// Rewrite the population according to `counts`, then reset weights.
pub fn apply_counts<P: Clone>(system: &mut ParticleSystem<P>, counts: &[usize]) {
    for (m, ancestor) in ancestors(counts).into_iter().enumerate() {
        if ancestor != m {
            let copy = system.particles[ancestor].clone();
            system.particles[m] = copy;
        }
    }
    system.reset_weights();
}
