//! Particle Gibbs over train, unlabeled and test pools.
//!
//! Every instance keeps one trajectory. A sweep visits the instances in
//! order: retract the trajectory's statistics, draw a replacement with
//! conditional SMC around it, and commit the replacement. Instances are
//! visited sequentially because each one mutates the shared model.

use chrono::{DateTime, Utc};
use pyp_config::validate::validate_gibbs;
use pyp_config::{FilterConfig, GibbsConfig, ValidationError};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::logging::{event_names, generate_run_id, Stage};
use crate::model::{Model, ModelError};
use crate::rng::Stream;
use crate::smc::{Filter, SmcError};

/// How much of an instance's labeling is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// Labels are fixed and never resampled.
    Full,
    /// Labels are latent.
    #[default]
    None,
}

/// One sequence with its (possibly absent) labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance<O, T> {
    pub observations: Vec<O>,
    pub tags: Vec<T>,
    pub lens: Vec<usize>,
    pub annotation: Annotation,
}

impl<O, T> Instance<O, T> {
    pub fn unlabeled(observations: Vec<O>) -> Self {
        Instance {
            observations,
            tags: Vec::new(),
            lens: Vec::new(),
            annotation: Annotation::None,
        }
    }

    pub fn labeled(observations: Vec<O>, tags: Vec<T>, lens: Vec<usize>) -> Self {
        Instance {
            observations,
            tags,
            lens,
            annotation: Annotation::Full,
        }
    }
}

#[derive(Debug, Error)]
pub enum GibbsError {
    #[error("invalid sampler configuration: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Filter(#[from] SmcError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model statistics inconsistent after iteration {iteration}")]
    Inconsistent { iteration: usize },
}

impl GibbsError {
    pub fn code(&self) -> u32 {
        match self {
            GibbsError::Config(e) => e.code(),
            GibbsError::Filter(e) => e.code(),
            GibbsError::Model(e) => e.code(),
            GibbsError::Inconsistent { .. } => 50,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Configured iterations; the first is initialization.
    pub iterations: usize,
    /// Mean ESS of each sweep over the instances that were sampled.
    pub mean_ess: Vec<f64>,
    pub hyper_updates: usize,
}

/// Called with the test trajectories before each sweep and after the last.
pub type Evaluator<P> = Box<dyn FnMut(&[P])>;
/// Called with the train trajectories after each sweep.
pub type Inspector<P> = Box<dyn FnMut(&[P])>;
/// Called with the iteration and the test trajectories.
pub type Writer<P> = Box<dyn FnMut(usize, &[P])>;

pub struct ParticleGibbs<P> {
    config: GibbsConfig,
    filter: Filter<P>,
    rng: Stream,
    train: Vec<P>,
    unlabeled: Vec<P>,
    test: Vec<P>,
    evaluators: Vec<Evaluator<P>>,
    inspectors: Vec<Inspector<P>>,
    writers: Vec<Writer<P>>,
    run_id: String,
}

impl<P: Clone + Send + Sync + Default> ParticleGibbs<P> {
    /// Sampler whose filter and bookkeeping streams derive from `seed`.
    pub fn new(config: GibbsConfig, filter: FilterConfig, seed: u64) -> Result<Self, GibbsError> {
        validate_gibbs(&config)?;
        let mut master = Stream::seed_from_u64(seed);
        let filter = Filter::new(filter, master.random::<u64>())?;
        Ok(ParticleGibbs {
            config,
            filter,
            rng: Stream::from_rng(&mut master),
            train: Vec::new(),
            unlabeled: Vec::new(),
            test: Vec::new(),
            evaluators: Vec::new(),
            inspectors: Vec::new(),
            writers: Vec::new(),
            run_id: generate_run_id(),
        })
    }

    pub fn add_evaluator(&mut self, f: impl FnMut(&[P]) + 'static) {
        self.evaluators.push(Box::new(f));
    }

    pub fn add_inspector(&mut self, f: impl FnMut(&[P]) + 'static) {
        self.inspectors.push(Box::new(f));
    }

    pub fn add_writer(&mut self, f: impl FnMut(usize, &[P]) + 'static) {
        self.writers.push(Box::new(f));
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn filter(&self) -> &Filter<P> {
        &self.filter
    }

    pub fn train_states(&self) -> &[P] {
        &self.train
    }

    pub fn unlabeled_states(&self) -> &[P] {
        &self.unlabeled
    }

    pub fn test_states(&self) -> &[P] {
        &self.test
    }

    /// Draw and commit a first trajectory for every instance.
    ///
    /// Fully annotated instances enter through `make_particle`; the rest
    /// through an unconditional filter draw.
    pub fn initialize<M>(
        &mut self,
        model: &mut M,
        train: &[Instance<M::Observation, M::Tag>],
        unlabeled: &[Instance<M::Observation, M::Tag>],
        test: &[Instance<M::Observation, M::Tag>],
    ) -> Result<(), GibbsError>
    where
        M: Model<Particle = P>,
    {
        self.train = self.initial_pool(model, train)?;
        self.unlabeled = self.initial_pool(model, unlabeled)?;
        self.test = self.initial_pool(model, test)?;
        info!(
            event = event_names::GIBBS_INITIALIZED,
            run_id = %self.run_id,
            stage = %Stage::Init,
            train = train.len(),
            unlabeled = unlabeled.len(),
            test = test.len(),
            "sampler state initialized"
        );
        self.write(0);
        Ok(())
    }

    fn initial_pool<M>(
        &mut self,
        model: &mut M,
        instances: &[Instance<M::Observation, M::Tag>],
    ) -> Result<Vec<P>, GibbsError>
    where
        M: Model<Particle = P>,
    {
        let mut states = Vec::with_capacity(instances.len());
        for instance in instances {
            let particle = match instance.annotation {
                Annotation::Full => model.make_particle(&instance.tags, &instance.lens)?,
                Annotation::None => self.filter.sample(&*model, &instance.observations)?,
            };
            model.observe(&particle, &instance.observations, &mut self.rng)?;
            states.push(particle);
        }
        Ok(states)
    }

    /// Initialize, resample hyperparameters, then run `num_iter - 1` sweeps.
    pub fn run<M>(
        &mut self,
        model: &mut M,
        train: &[Instance<M::Observation, M::Tag>],
        unlabeled: &[Instance<M::Observation, M::Tag>],
        test: &[Instance<M::Observation, M::Tag>],
    ) -> Result<SweepReport, GibbsError>
    where
        M: Model<Particle = P>,
    {
        let started_at = Utc::now();
        info!(
            event = event_names::GIBBS_STARTED,
            run_id = %self.run_id,
            iterations = self.config.num_iter,
            particles = self.filter.num_particles(),
            "starting particle Gibbs"
        );
        self.initialize(model, train, unlabeled, test)?;
        let hyper_updates = model.resample_hyperparameters(&mut self.rng);

        let mut mean_ess = Vec::with_capacity(self.config.num_iter.saturating_sub(1));
        for iteration in 1..self.config.num_iter {
            self.evaluate();
            let mut ess = EssMean::default();
            for (j, instance) in train.iter().enumerate() {
                let sampled = resample_one(&mut self.filter, &mut self.rng, model, &mut self.train[j], instance)?;
                ess.record(sampled);
            }
            for (j, instance) in unlabeled.iter().enumerate() {
                let sampled = resample_one(&mut self.filter, &mut self.rng, model, &mut self.unlabeled[j], instance)?;
                ess.record(sampled);
            }
            for (j, instance) in test.iter().enumerate() {
                let sampled = resample_one(&mut self.filter, &mut self.rng, model, &mut self.test[j], instance)?;
                ess.record(sampled);
            }

            let mean = ess.mean();
            mean_ess.push(mean);
            info!(
                event = event_names::GIBBS_SWEEP_FINISHED,
                run_id = %self.run_id,
                stage = %Stage::Sweep,
                iteration,
                of = self.config.num_iter,
                mean_ess = mean,
                "sweep finished"
            );
            for inspect in &mut self.inspectors {
                inspect(&self.train);
            }
            self.write(iteration);

            if self.config.check_consistency && !model.consistent() {
                error!(
                    event = event_names::GIBBS_INCONSISTENT,
                    run_id = %self.run_id,
                    iteration,
                    "model statistics inconsistent"
                );
                return Err(GibbsError::Inconsistent { iteration });
            }
        }
        self.evaluate();

        let report = SweepReport {
            run_id: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            iterations: self.config.num_iter,
            mean_ess,
            hyper_updates,
        };
        info!(
            event = event_names::GIBBS_FINISHED,
            run_id = %self.run_id,
            sweeps = report.mean_ess.len(),
            "particle Gibbs finished"
        );
        Ok(report)
    }

    fn evaluate(&mut self) {
        for evaluate in &mut self.evaluators {
            evaluate(&self.test);
        }
    }

    fn write(&mut self, iteration: usize) {
        for write in &mut self.writers {
            write(iteration, &self.test);
        }
    }
}

/// Replace one instance's trajectory; returns the filter ESS when sampled.
fn resample_one<M, P>(
    filter: &mut Filter<P>,
    rng: &mut Stream,
    model: &mut M,
    state: &mut P,
    instance: &Instance<M::Observation, M::Tag>,
) -> Result<Option<f64>, GibbsError>
where
    M: Model<Particle = P>,
    P: Clone + Send + Sync + Default,
{
    model.remove(state, &instance.observations, rng)?;
    let (next, ess) = match instance.annotation {
        Annotation::Full => (model.make_particle(&instance.tags, &instance.lens)?, None),
        Annotation::None => {
            let next = filter.conditional_sample(&*model, state, &instance.observations)?;
            (next, Some(filter.ess()))
        }
    };
    model.observe(&next, &instance.observations, rng)?;
    *state = next;
    Ok(ess)
}

/// Running mean of per-instance ESS for one sweep.
#[derive(Debug, Default)]
struct EssMean {
    sum: f64,
    count: usize,
}

impl EssMean {
    fn record(&mut self, ess: Option<f64>) {
        if let Some(ess) = ess {
            self.sum += ess;
            self.count += 1;
        }
    }

    /// 0 when nothing was sampled.
    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}
