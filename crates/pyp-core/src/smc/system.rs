//! Weighted particle population.

use pyp_math::log_sum_exp;

/// `N` particles with their log weights and normalized log probabilities.
///
/// After [`ParticleSystem::normalize`], `log_probs` is `log_weights` minus
/// their log-sum-exp, so the probabilities sum to one and `1 <= ess <= N`
/// whenever some weight is finite. When every weight is `-inf` the
/// probabilities and the ESS are NaN.
///
/// Each resample banks the mean weight of the population it replaces, so
/// [`ParticleSystem::log_partition`] covers every step since the last
/// [`ParticleSystem::clear_evidence`].
#[derive(Debug, Clone)]
pub struct ParticleSystem<P> {
    pub(crate) particles: Vec<P>,
    pub(crate) log_weights: Vec<f64>,
    log_probs: Vec<f64>,
    ess: f64,
    log_z: f64,
    banked: f64,
}

impl<P: Clone + Default> ParticleSystem<P> {
    /// `n` default particles with uniform weight.
    pub fn new(n: usize) -> Self {
        let mut system = ParticleSystem {
            particles: vec![P::default(); n],
            log_weights: vec![0.0; n],
            log_probs: vec![0.0; n],
            ess: n as f64,
            log_z: 0.0,
            banked: 0.0,
        };
        system.normalize();
        system
    }
}

impl<P> ParticleSystem<P> {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[P] {
        &self.particles
    }

    pub fn particle(&self, m: usize) -> &P {
        &self.particles[m]
    }

    pub fn log_weights(&self) -> &[f64] {
        &self.log_weights
    }

    pub fn log_probs(&self) -> &[f64] {
        &self.log_probs
    }

    /// Normalized linear probabilities.
    pub fn probabilities(&self) -> Vec<f64> {
        self.log_probs.iter().map(|lp| lp.exp()).collect()
    }

    pub fn particle_log_probs(&self) -> impl Iterator<Item = (&P, f64)> {
        self.particles.iter().zip(self.log_probs.iter().copied())
    }

    pub fn ess(&self) -> f64 {
        self.ess
    }

    /// Log of the summed (unnormalized) weights.
    pub fn log_z(&self) -> f64 {
        self.log_z
    }

    /// Log partition estimate: the banked evidence of earlier resampling
    /// epochs plus `log_z - ln N` of the current one.
    pub fn log_partition(&self) -> f64 {
        self.banked + self.log_z - (self.len() as f64).ln()
    }

    /// Forget banked evidence before a fresh run.
    pub fn clear_evidence(&mut self) {
        self.banked = 0.0;
    }

    /// No particle carries finite weight.
    pub fn is_degenerate(&self) -> bool {
        !self.log_z.is_finite()
    }

    /// Recompute `log_z`, normalized log probabilities and ESS.
    pub fn normalize(&mut self) {
        self.log_z = log_sum_exp(&self.log_weights);
        for (lp, lw) in self.log_probs.iter_mut().zip(&self.log_weights) {
            *lp = lw - self.log_z;
        }
        let sum_sq: f64 = self.log_probs.iter().map(|lp| (2.0 * lp).exp()).sum();
        self.ess = 1.0 / sum_sq;
    }

    /// Uniform weights after resampling: log weight 0, log probability `ln(1/N)`.
    /// The replaced population's mean weight is banked first.
    pub fn reset_weights(&mut self) {
        let ln_n = (self.len() as f64).ln();
        let uniform = -ln_n;
        self.banked += self.log_z - ln_n;
        self.log_z = ln_n;
        self.log_weights.iter_mut().for_each(|w| *w = 0.0);
        self.log_probs.iter_mut().for_each(|p| *p = uniform);
        self.ess = self.len() as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(weights: &[f64]) -> ParticleSystem<u32> {
        let mut s = ParticleSystem::new(weights.len());
        s.log_weights.copy_from_slice(weights);
        s.normalize();
        s
    }

    #[test]
    fn test_uniform_start() {
        let s: ParticleSystem<u32> = ParticleSystem::new(8);
        assert!((s.ess() - 8.0).abs() < 1e-9);
        assert!((s.log_partition()).abs() < 1e-12);
        assert!(s.log_probs().iter().all(|lp| (lp + 8f64.ln()).abs() < 1e-12));
    }

    #[test]
    fn test_normalize_and_ess() {
        let s = system(&[0.7f64.ln(), 0.1f64.ln(), 0.1f64.ln(), 0.1f64.ln()]);
        let total: f64 = s.probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        let expected = 1.0 / (0.49 + 3.0 * 0.01);
        assert!((s.ess() - expected).abs() < 1e-9);
        assert!(s.log_z().abs() < 1e-12);
    }

    #[test]
    fn test_single_live_particle_has_ess_one() {
        let s = system(&[f64::NEG_INFINITY, -3.0, f64::NEG_INFINITY]);
        assert!((s.ess() - 1.0).abs() < 1e-12);
        assert!(!s.is_degenerate());
    }

    #[test]
    fn test_all_dead_is_degenerate() {
        let s = system(&[f64::NEG_INFINITY; 3]);
        assert!(s.is_degenerate());
        assert!(s.ess().is_nan());
    }

    #[test]
    fn test_reset_weights() {
        let mut s = system(&[-1.0, -5.0]);
        s.reset_weights();
        assert_eq!(s.log_weights(), &[0.0, 0.0]);
        assert!((s.ess() - 2.0).abs() < 1e-12);
        assert!(s.particle_log_probs().all(|(_, lp)| (lp - 0.5f64.ln()).abs() < 1e-12));
    }

    #[test]
    fn test_reset_banks_evidence() {
        // Mean weight (e^-1 + e^-5) / 2 survives the reset.
        let mut s = system(&[-1.0, -5.0]);
        let before = s.log_partition();
        s.reset_weights();
        assert!((s.log_partition() - before).abs() < 1e-12);
        s.log_weights.copy_from_slice(&[0.5f64.ln(), 0.5f64.ln()]);
        s.normalize();
        assert!((s.log_partition() - (before + 0.5f64.ln())).abs() < 1e-12);
        s.clear_evidence();
        assert!((s.log_partition() - 0.5f64.ln()).abs() < 1e-12);
    }
}
