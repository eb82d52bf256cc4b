//! Latent tag model: hierarchical transitions and per-tag emissions.
//!
//! Tags are `0..num_tags`. Transitions predict the next tag (or the end tag
//! `num_tags`) from the tag history, which starts with the start tag
//! `num_tags + 1`. Emissions predict a word from the current tag.
//!
//! Particles propose with the locally optimal kernel: tag `k` is drawn
//! proportional to `p(k | history) · p(word | k)` and the incremental weight
//! is the log of the normalizer.

use pyp_config::HpypConfig;
use pyp_math::{log_sum_exp, sample_unnormalized_log};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::base_measure::Uniform;
use crate::hpyp::Hpyp;
use crate::model::{Model, ModelError, SmcModel};

pub type Tag = u32;
pub type Word = u32;

/// Tag trajectory with a cursor.
///
/// A reference trajectory carries all its tags up front; `len` counts how
/// many of them the current run has consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPath {
    tags: Vec<Tag>,
    len: usize,
}

impl TagPath {
    pub fn tags(&self) -> &[Tag] {
        &self.tags[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSequenceModel {
    num_tags: u32,
    vocabulary: u32,
    transitions: Hpyp<Tag, Tag, Uniform>,
    emissions: Hpyp<Tag, Word, Uniform>,
}

impl TagSequenceModel {
    /// `transitions` configures the tag hierarchy; emissions condition on
    /// exactly one tag and reuse its parameters otherwise.
    pub fn new(num_tags: u32, vocabulary: u32, transitions: &HpypConfig) -> Result<Self, ModelError> {
        let emissions = transitions.clone().with_max_depth(3);
        Ok(TagSequenceModel {
            num_tags,
            vocabulary,
            transitions: Hpyp::new(Uniform::new(num_tags as usize + 1), transitions)?,
            emissions: Hpyp::new(Uniform::new(vocabulary as usize), &emissions)?,
        })
    }

    pub fn num_tags(&self) -> u32 {
        self.num_tags
    }

    pub fn end_tag(&self) -> Tag {
        self.num_tags
    }

    pub fn start_tag(&self) -> Tag {
        self.num_tags + 1
    }

    pub fn transitions(&self) -> &Hpyp<Tag, Tag, Uniform> {
        &self.transitions
    }

    pub fn emissions(&self) -> &Hpyp<Tag, Word, Uniform> {
        &self.emissions
    }

    /// Start tag followed by the first `len` tags of `tags`.
    fn history(&self, tags: &[Tag], len: usize) -> Vec<Tag> {
        let mut history = Vec::with_capacity(len + 1);
        history.push(self.start_tag());
        history.extend_from_slice(&tags[..len]);
        history
    }

    /// `ln p(k | history) + ln p(word | k)` for every tag `k`.
    fn joint(&self, history: &[Tag], word: Word) -> Vec<f64> {
        (0..self.num_tags)
            .map(|k| self.transitions.log_probability(history, &k) + self.emissions.log_probability(&[k], &word))
            .collect()
    }

    /// Joint log probability of a complete tagging, end transition included.
    pub fn log_joint(&self, tags: &[Tag], words: &[Word]) -> Result<f64, ModelError> {
        if tags.len() != words.len() {
            return Err(ModelError::arity("tags", words.len(), tags.len()));
        }
        let history = self.history(tags, tags.len());
        let steps: f64 = tags
            .iter()
            .zip(words)
            .enumerate()
            .map(|(i, (tag, word))| {
                self.transitions.log_probability(&history[..=i], tag) + self.emissions.log_probability(&[*tag], word)
            })
            .sum();
        Ok(steps + self.transitions.log_probability(&history, &self.end_tag()))
    }

    fn check_words(&self, words: &[Word]) -> Result<(), ModelError> {
        match words.iter().find(|&&w| w >= self.vocabulary) {
            Some(w) => Err(ModelError::UnknownSymbol(format!("word {w}"))),
            None => Ok(()),
        }
    }

    fn check_committable(&self, particle: &TagPath, words: &[Word]) -> Result<(), ModelError> {
        if particle.len != words.len() {
            return Err(ModelError::arity("tagged words", words.len(), particle.len));
        }
        self.check_words(words)
    }
}

impl SmcModel for TagSequenceModel {
    type Particle = TagPath;
    type Observation = Word;

    fn init<R: Rng + ?Sized>(&self, particle: &mut TagPath, _rng: &mut R) -> f64 {
        particle.tags.clear();
        particle.len = 0;
        0.0
    }

    fn extend<R: Rng + ?Sized>(&self, particle: &mut TagPath, word: &Word, rng: &mut R) -> f64 {
        particle.tags.truncate(particle.len);
        let joint = self.joint(&self.history(&particle.tags, particle.len), *word);
        let tag = sample_unnormalized_log(&joint, rng).unwrap_or(0);
        particle.tags.push(tag as Tag);
        particle.len += 1;
        log_sum_exp(&joint)
    }

    /// Log normalizer over the reference prefix, then consume the recorded
    /// tag; a particle copied in by resampling has none, so the most
    /// probable tag stands in.
    fn score(&self, particle: &mut TagPath, word: &Word, t: usize) -> f64 {
        let len = t.min(particle.tags.len());
        let joint = self.joint(&self.history(&particle.tags, len), *word);
        if particle.tags.len() <= len {
            let best = joint
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (k, &lp)| if lp > best.1 { (k, lp) } else { best })
                .0;
            particle.tags.truncate(len);
            particle.tags.push(best as Tag);
        }
        particle.len = len + 1;
        log_sum_exp(&joint)
    }

    fn swap(&self, dst: &mut TagPath, src: &TagPath) {
        dst.tags.clone_from(&src.tags);
        dst.len = 0;
    }
}

impl Model for TagSequenceModel {
    type Tag = Tag;

    fn observe<R: Rng + ?Sized>(&mut self, particle: &TagPath, words: &[Word], rng: &mut R) -> Result<(), ModelError> {
        self.check_committable(particle, words)?;
        let history = self.history(&particle.tags, particle.len);
        for (i, (tag, word)) in particle.tags().iter().zip(words).enumerate() {
            self.transitions.observe(&history[..=i], tag, rng)?;
            self.emissions.observe(&[*tag], word, rng)?;
        }
        self.transitions.observe(&history, &self.end_tag(), rng)?;
        Ok(())
    }

    fn remove<R: Rng + ?Sized>(&mut self, particle: &TagPath, words: &[Word], rng: &mut R) -> Result<(), ModelError> {
        self.check_committable(particle, words)?;
        let history = self.history(&particle.tags, particle.len);
        self.transitions.remove(&history, &self.end_tag(), rng)?;
        for (i, (tag, word)) in particle.tags().iter().zip(words).enumerate().rev() {
            self.emissions.remove(&[*tag], word, rng)?;
            self.transitions.remove(&history[..=i], tag, rng)?;
        }
        Ok(())
    }

    /// Every token is its own segment, so `lens` must be all ones.
    fn make_particle(&self, tags: &[Tag], lens: &[usize]) -> Result<TagPath, ModelError> {
        if lens.len() != tags.len() {
            return Err(ModelError::arity("segment lengths", tags.len(), lens.len()));
        }
        if let Some(&len) = lens.iter().find(|&&l| l != 1) {
            return Err(ModelError::arity("segment length", 1, len));
        }
        if let Some(tag) = tags.iter().find(|&&t| t >= self.num_tags) {
            return Err(ModelError::UnknownSymbol(format!("tag {tag}")));
        }
        Ok(TagPath {
            tags: tags.to_vec(),
            len: tags.len(),
        })
    }

    fn tags(&self, particle: &TagPath) -> Vec<Tag> {
        particle.tags().to_vec()
    }

    fn lens(&self, particle: &TagPath) -> Vec<usize> {
        vec![1; particle.len]
    }

    fn consistent(&self) -> bool {
        self.transitions.check_consistency() && self.emissions.check_consistency()
    }

    fn resample_hyperparameters<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        self.transitions.resample_hyperparameters(rng) + self.emissions.resample_hyperparameters(rng)
    }
}
