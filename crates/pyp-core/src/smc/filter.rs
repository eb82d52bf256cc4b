//! Generic particle filter.

use pyp_config::validate::validate_filter;
use pyp_config::{FilterConfig, ResampleMethod};
use pyp_math::sample_unnormalized_log;
use tracing::{debug, error, trace};

use super::resample::{apply_counts, resample_counts};
use super::system::ParticleSystem;
use super::SmcError;
use crate::logging::event_names;
use crate::model::SmcModel;
use crate::rng::RngPool;

/// Particle filter with its own population and random streams.
///
/// Streams persist across runs, so repeated runs from one filter continue
/// the same seeded sequence.
#[derive(Debug, Clone)]
pub struct Filter<P> {
    config: FilterConfig,
    pub(crate) system: ParticleSystem<P>,
    pub(crate) pool: RngPool,
    zero_fraction: f64,
    resamples: usize,
}

impl<P: Clone + Send + Sync + Default> Filter<P> {
    pub fn new(config: FilterConfig, seed: u64) -> Result<Self, SmcError> {
        validate_filter(&config)?;
        Ok(Filter {
            system: ParticleSystem::new(config.num_particles),
            pool: RngPool::new(seed, config.streams),
            config,
            zero_fraction: 0.0,
            resamples: 0,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn system(&self) -> &ParticleSystem<P> {
        &self.system
    }

    pub fn num_particles(&self) -> usize {
        self.system.len()
    }

    pub fn ess(&self) -> f64 {
        self.system.ess()
    }

    pub fn log_partition(&self) -> f64 {
        self.system.log_partition()
    }

    /// Share of particles with zero probability at the last draw.
    pub fn zero_fraction(&self) -> f64 {
        self.zero_fraction
    }

    /// Resampling events since construction.
    pub fn resamples(&self) -> usize {
        self.resamples
    }

    /// `init` every particle in parallel, then normalize.
    pub fn initialize<M>(&mut self, model: &M)
    where
        M: SmcModel<Particle = P>,
    {
        self.system.log_weights = self
            .pool
            .par_map(&mut self.system.particles, |_, p, rng| model.init(p, rng));
        self.system.clear_evidence();
        self.system.normalize();
    }

    /// `extend` every particle by `observation`, normalize, and resample
    /// when the ESS falls below the threshold.
    pub fn advance<M>(&mut self, model: &M, observation: &M::Observation) -> Result<(), SmcError>
    where
        M: SmcModel<Particle = P>,
    {
        let increments = self.pool.par_map(&mut self.system.particles, |_, p, rng| {
            model.extend(p, observation, rng)
        });
        for (lw, inc) in self.system.log_weights.iter_mut().zip(increments) {
            *lw += inc;
        }
        self.system.normalize();
        trace!(ess = self.system.ess(), log_z = self.system.log_z(), "filter step");
        self.resample_if_needed()
    }

    pub(crate) fn resample_if_needed(&mut self) -> Result<(), SmcError> {
        if self.needs_resampling() {
            self.resample()?;
        }
        Ok(())
    }

    /// Threshold is a fraction of `N` below 1 and an absolute ESS otherwise.
    /// A degenerate population (NaN ESS) never triggers resampling.
    fn needs_resampling(&self) -> bool {
        if self.config.resample == ResampleMethod::None {
            return false;
        }
        let ess = self.system.ess();
        let threshold = self.config.resample_threshold;
        if threshold < 1.0 {
            ess / (self.system.len() as f64) < threshold
        } else {
            ess < threshold
        }
    }

    /// Resample with the configured method and reset weights to uniform.
    pub fn resample(&mut self) -> Result<(), SmcError> {
        let ess = self.system.ess();
        let probs = self.system.probabilities();
        let counts = resample_counts(self.config.resample, &probs, self.pool.main())?;
        apply_counts(&mut self.system, &counts);
        self.resamples += 1;
        debug!(
            event = event_names::SMC_RESAMPLED,
            method = %self.config.resample,
            ess_before = ess,
            survivors = counts.iter().filter(|&&c| c > 0).count(),
            "resampled particles"
        );
        Ok(())
    }

    /// `initialize`, then `advance` over each observation.
    pub fn run<M>(&mut self, model: &M, observations: &[M::Observation]) -> Result<(), SmcError>
    where
        M: SmcModel<Particle = P>,
    {
        self.initialize(model);
        for observation in observations {
            self.advance(model, observation)?;
        }
        Ok(())
    }

    /// Run, then draw one particle proportional to its weight.
    pub fn sample<M>(&mut self, model: &M, observations: &[M::Observation]) -> Result<P, SmcError>
    where
        M: SmcModel<Particle = P>,
    {
        self.run(model, observations)?;
        self.draw()
    }

    /// Log partition estimate after a full run.
    pub fn estimate_log_partition<M>(
        &mut self,
        model: &M,
        observations: &[M::Observation],
    ) -> Result<f64, SmcError>
    where
        M: SmcModel<Particle = P>,
    {
        self.run(model, observations)?;
        Ok(self.log_partition())
    }

    /// Draw one particle from the current population.
    pub(crate) fn draw(&mut self) -> Result<P, SmcError> {
        let n = self.system.len();
        let zeros = self
            .system
            .log_probs()
            .iter()
            .filter(|lp| !(lp.exp() > 0.0))
            .count();
        self.zero_fraction = zeros as f64 / n as f64;

        match sample_unnormalized_log(self.system.log_probs(), self.pool.main()) {
            Some(m) => {
                trace!(
                    event = event_names::SMC_SAMPLED,
                    slot = m,
                    zero_fraction = self.zero_fraction,
                    "drew particle"
                );
                Ok(self.system.particle(m).clone())
            }
            None => {
                error!(
                    event = event_names::SMC_DEGENERATE,
                    particles = n,
                    "no particle carries weight"
                );
                Err(SmcError::Degenerate { particles: n })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Random walk on integers; weight favors staying near the observation.
    struct Walk;

    impl SmcModel for Walk {
        type Particle = Vec<i32>;
        type Observation = i32;

        fn init<R: Rng + ?Sized>(&self, p: &mut Vec<i32>, _rng: &mut R) -> f64 {
            p.clear();
            0.0
        }

        fn extend<R: Rng + ?Sized>(&self, p: &mut Vec<i32>, obs: &i32, rng: &mut R) -> f64 {
            let last = p.last().copied().unwrap_or(0);
            let next = last + if rng.random::<bool>() { 1 } else { -1 };
            p.push(next);
            -((next - obs).abs() as f64)
        }

        fn score(&self, p: &mut Vec<i32>, obs: &i32, t: usize) -> f64 {
            -((p[t] - obs).abs() as f64)
        }
    }

    /// Every particle dies at the first step.
    struct Dead;

    impl SmcModel for Dead {
        type Particle = u8;
        type Observation = ();

        fn init<R: Rng + ?Sized>(&self, _p: &mut u8, _rng: &mut R) -> f64 {
            0.0
        }

        fn extend<R: Rng + ?Sized>(&self, _p: &mut u8, _obs: &(), _rng: &mut R) -> f64 {
            f64::NEG_INFINITY
        }

        fn score(&self, _p: &mut u8, _obs: &(), _t: usize) -> f64 {
            f64::NEG_INFINITY
        }
    }

    fn config(method: ResampleMethod) -> FilterConfig {
        FilterConfig::default().with_particles(64).with_resample(method, 0.5)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Filter::<u8>::new(FilterConfig::default().with_particles(0), 0).unwrap_err();
        assert_eq!(err.code(), 65);
    }

    #[test]
    fn test_run_keeps_population_and_bounds_ess() {
        for &method in ResampleMethod::ALL {
            let mut filter = Filter::new(config(method), 5).unwrap();
            filter.run(&Walk, &[1, 2, 3, 2, 1]).unwrap();
            let n = filter.num_particles() as f64;
            assert_eq!(filter.system().len(), 64);
            assert!(filter.ess() >= 1.0 - 1e-9 && filter.ess() <= n + 1e-9, "{method}");
            assert!(filter.system().particles().iter().all(|p| p.len() == 5));
        }
    }

    #[test]
    fn test_no_resampling_with_none_method() {
        let mut filter = Filter::new(config(ResampleMethod::None), 5).unwrap();
        filter.run(&Walk, &[3, 3, 3]).unwrap();
        assert_eq!(filter.resamples(), 0);
    }

    #[test]
    fn test_absolute_threshold_triggers_resampling() {
        let cfg = FilterConfig::default()
            .with_particles(32)
            .with_resample(ResampleMethod::Systematic, 31.5);
        let mut filter = Filter::new(cfg, 1).unwrap();
        filter.run(&Walk, &[1, 2, 3]).unwrap();
        assert!(filter.resamples() > 0);
    }

    #[test]
    fn test_same_seed_same_draw() {
        let draw = |seed| {
            let mut filter = Filter::new(config(ResampleMethod::Stratified), seed).unwrap();
            filter.sample(&Walk, &[1, 0, -1, 0]).unwrap()
        };
        assert_eq!(draw(11), draw(11));
    }

    #[test]
    fn test_degenerate_population_reported_from_sample() {
        let mut filter = Filter::new(config(ResampleMethod::Multinomial), 2).unwrap();
        let err = filter.sample(&Dead, &[()]).unwrap_err();
        assert_eq!(err.code(), 30);
        assert_eq!(filter.zero_fraction(), 1.0);
    }

    #[test]
    fn test_log_partition_of_constant_weights() {
        let mut filter = Filter::<u8>::new(config(ResampleMethod::None), 0).unwrap();
        struct Half;
        impl SmcModel for Half {
            type Particle = u8;
            type Observation = ();
            fn init<R: Rng + ?Sized>(&self, _p: &mut u8, _rng: &mut R) -> f64 {
                0.0
            }
            fn extend<R: Rng + ?Sized>(&self, _p: &mut u8, _o: &(), _rng: &mut R) -> f64 {
                0.5f64.ln()
            }
            fn score(&self, _p: &mut u8, _o: &(), _t: usize) -> f64 {
                0.5f64.ln()
            }
        }
        let z = filter.estimate_log_partition(&Half, &[(), (), ()]).unwrap();
        assert!((z - 3.0 * 0.5f64.ln()).abs() < 1e-12);
    }
}
