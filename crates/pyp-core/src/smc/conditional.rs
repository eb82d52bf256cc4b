//! Conditional SMC: one slot replays a reference trajectory.
//!
//! Slot 0 receives the reference through [`SmcModel::swap`] and starts with
//! log weight 0. At step `t` it gains [`SmcModel::score`] for its recorded
//! choice while slots `1..N` are extended as usual. Normalization and
//! resampling cover all `N` slots, so resampling may overwrite slot 0 with
//! a copy of another particle; the reference is not guaranteed to survive.

use super::{Filter, SmcError};
use crate::model::SmcModel;

impl<P: Clone + Send + Sync + Default> Filter<P> {
    /// Run conditional SMC with `fixed` as the reference trajectory.
    pub fn run_conditional<M>(
        &mut self,
        model: &M,
        fixed: &P,
        observations: &[M::Observation],
    ) -> Result<(), SmcError>
    where
        M: SmcModel<Particle = P>,
    {
        let free = self
            .pool
            .par_map(&mut self.system.particles[1..], |_, p, rng| model.init(p, rng));
        self.system.log_weights[1..].copy_from_slice(&free);
        model.swap(&mut self.system.particles[0], fixed);
        self.system.log_weights[0] = 0.0;
        self.system.clear_evidence();
        self.system.normalize();

        for (t, observation) in observations.iter().enumerate() {
            let reference = model.score(&mut self.system.particles[0], observation, t);
            let increments = self
                .pool
                .par_map(&mut self.system.particles[1..], |_, p, rng| {
                    model.extend(p, observation, rng)
                });
            self.system.log_weights[0] += reference;
            for (lw, inc) in self.system.log_weights[1..].iter_mut().zip(increments) {
                *lw += inc;
            }
            self.system.normalize();
            self.resample_if_needed()?;
        }
        Ok(())
    }

    /// Conditional run followed by a weighted draw over all slots.
    pub fn conditional_sample<M>(
        &mut self,
        model: &M,
        fixed: &P,
        observations: &[M::Observation],
    ) -> Result<P, SmcError>
    where
        M: SmcModel<Particle = P>,
    {
        self.run_conditional(model, fixed, observations)?;
        self.draw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyp_config::{FilterConfig, ResampleMethod};
    use rand::Rng;

    /// Trajectory of coin flips; weight rewards matching the observation.
    struct Flips;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Path {
        bits: Vec<bool>,
        cursor: usize,
    }

    impl SmcModel for Flips {
        type Particle = Path;
        type Observation = bool;

        fn init<R: Rng + ?Sized>(&self, p: &mut Path, _rng: &mut R) -> f64 {
            *p = Path::default();
            0.0
        }

        fn extend<R: Rng + ?Sized>(&self, p: &mut Path, obs: &bool, rng: &mut R) -> f64 {
            let bit = rng.random::<bool>();
            p.bits.truncate(p.cursor);
            p.bits.push(bit);
            p.cursor += 1;
            if bit == *obs {
                0.0
            } else {
                -2.0
            }
        }

        fn score(&self, p: &mut Path, obs: &bool, t: usize) -> f64 {
            let bit = p.bits.get(t).copied().unwrap_or(*obs);
            p.bits.truncate(t);
            p.bits.push(bit);
            p.cursor = t + 1;
            if bit == *obs {
                0.0
            } else {
                -2.0
            }
        }

        fn swap(&self, dst: &mut Path, src: &Path) {
            dst.bits = src.bits.clone();
            dst.cursor = 0;
        }
    }

    #[test]
    fn test_reference_slot_replays_fixed_trajectory_without_resampling() {
        let cfg = FilterConfig::default().with_particles(16);
        let mut filter = Filter::new(cfg, 3).unwrap();
        let fixed = Path {
            bits: vec![true, false, false, true],
            cursor: 4,
        };
        let obs = [true, true, false, true];
        filter.run_conditional(&Flips, &fixed, &obs).unwrap();
        assert_eq!(filter.system().particle(0).bits, fixed.bits);
        // One mismatch at t = 1.
        assert_eq!(filter.system().log_weights()[0], -2.0);
        let total: f64 = filter.system().probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_conditional_sample_returns_complete_trajectories() {
        let cfg = FilterConfig::default()
            .with_particles(24)
            .with_resample(ResampleMethod::Residual, 0.7);
        let mut filter = Filter::new(cfg, 8).unwrap();
        let fixed = Path {
            bits: vec![false; 6],
            cursor: 6,
        };
        let obs = [true; 6];
        for _ in 0..20 {
            let drawn = filter.conditional_sample(&Flips, &fixed, &obs).unwrap();
            assert_eq!(drawn.bits.len(), 6);
            assert!(filter.ess() >= 1.0 - 1e-9);
        }
    }
}
