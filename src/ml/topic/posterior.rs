//! Topic posterior estimation for held-out documents.
//!
//! An estimator fills a per-topic weight vector for one document. The
//! calculator owns the vector and hands it to the estimator right before the
//! document's words are scored; its contents are only meaningful until the
//! next document is estimated.

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::{DocumentView, TopicModel};
use crate::error::{Error, Result};

/// Strategy producing `P(topic | document)` for a held-out document.
pub trait PosteriorEstimator {
    /// Writes one non-negative weight per topic into `posterior`.
    ///
    /// `posterior.len()` equals `model.num_topics()`. `document` holds the
    /// in-vocabulary words of the held-out document resolved to training
    /// indices, its effective size and its position in the corpus.
    fn update_posterior<M: TopicModel>(
        &self,
        model: &M,
        document: &DocumentView,
        posterior: &mut [f64],
    ) -> Result<()>;
}

impl<E: PosteriorEstimator> PosteriorEstimator for &E {
    fn update_posterior<M: TopicModel>(
        &self,
        model: &M,
        document: &DocumentView,
        posterior: &mut [f64],
    ) -> Result<()> {
        (**self).update_posterior(model, document, posterior)
    }
}

/// Assigns the same weight to every topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEstimator;

impl PosteriorEstimator for UniformEstimator {
    fn update_posterior<M: TopicModel>(
        &self,
        _model: &M,
        _document: &DocumentView,
        posterior: &mut [f64],
    ) -> Result<()> {
        let weight = 1.0 / posterior.len() as f64;
        posterior.fill(weight);
        Ok(())
    }
}

/// Looks up document-topic counts captured ahead of time, keyed by corpus
/// position, and smooths them with a symmetric Dirichlet prior.
#[derive(Debug, Clone)]
pub struct CachedAssignmentEstimator {
    document_topic_counts: Array2<u64>,
    alpha: f64,
}

impl CachedAssignmentEstimator {
    /// `document_topic_counts[[d, t]]` is the number of words of the document
    /// at position `d` assigned to topic `t`.
    pub fn new(document_topic_counts: Array2<u64>, alpha: f64) -> Result<Self> {
        if !(alpha >= 0.0 && alpha.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "alpha must be finite and non-negative, got {alpha}"
            )));
        }
        Ok(Self {
            document_topic_counts,
            alpha,
        })
    }

    /// Builds the cache from per-token topic assignments, one list per
    /// document position.
    pub fn from_token_assignments(
        num_topics: usize,
        assignments: &[Vec<usize>],
        alpha: f64,
    ) -> Result<Self> {
        let mut counts = Array2::<u64>::zeros((assignments.len(), num_topics));
        for (document, topics) in assignments.iter().enumerate() {
            for &topic in topics {
                if topic >= num_topics {
                    return Err(Error::InvalidAssignment {
                        document,
                        topic,
                        num_topics,
                    });
                }
                counts[[document, topic]] += 1;
            }
        }
        Self::new(counts, alpha)
    }
}

impl PosteriorEstimator for CachedAssignmentEstimator {
    fn update_posterior<M: TopicModel>(
        &self,
        model: &M,
        document: &DocumentView,
        posterior: &mut [f64],
    ) -> Result<()> {
        let (cached, num_topics) = self.document_topic_counts.dim();
        if num_topics != model.num_topics() {
            return Err(Error::DimensionMismatch {
                what: "cached topic count",
                expected: model.num_topics(),
                found: num_topics,
            });
        }
        let position = document.position();
        if position >= cached {
            return Err(Error::PositionOutOfRange {
                position,
                available: cached,
            });
        }

        let row = self.document_topic_counts.row(position);
        let assigned: u64 = row.sum();
        let denominator = assigned as f64 + num_topics as f64 * self.alpha;
        if denominator == 0.0 {
            posterior.fill(1.0 / num_topics as f64);
            return Ok(());
        }
        for (weight, &count) in posterior.iter_mut().zip(row.iter()) {
            *weight = (count as f64 + self.alpha) / denominator;
        }
        Ok(())
    }
}

/// Configuration of the Gibbs fold-in estimator.
#[derive(Debug, Clone)]
pub struct FoldInConfig {
    /// Symmetric Dirichlet prior on document-topic proportions.
    pub alpha: f64,
    /// Symmetric Dirichlet prior on topic-word distributions.
    pub beta: f64,
    /// Number of full sampling sweeps over the document.
    pub iterations: usize,
    /// Base seed; each document samples from its own stream derived from it.
    pub seed: u64,
}

impl FoldInConfig {
    /// Create a config with alpha = 0.1, beta = 0.01 and 50 sweeps.
    pub fn new(seed: u64) -> Self {
        Self {
            alpha: 0.1,
            beta: 0.01,
            iterations: 50,
            seed,
        }
    }

    /// Customize the document-topic prior.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Customize the topic-word prior.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Customize the number of sampling sweeps.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

impl Default for FoldInConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Re-samples topic assignments of the held-out document while keeping the
/// trained topic-word counts fixed, then reads off the document's topic
/// proportions.
///
/// Sampling for a document depends only on the base seed and the document's
/// position, so results do not depend on evaluation order.
#[derive(Debug, Clone)]
pub struct FoldInEstimator {
    config: FoldInConfig,
}

impl FoldInEstimator {
    pub fn new(config: FoldInConfig) -> Result<Self> {
        if !(config.alpha > 0.0 && config.alpha.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "alpha must be positive, got {}",
                config.alpha
            )));
        }
        if !(config.beta > 0.0 && config.beta.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "beta must be positive, got {}",
                config.beta
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &FoldInConfig {
        &self.config
    }
}

impl PosteriorEstimator for FoldInEstimator {
    fn update_posterior<M: TopicModel>(
        &self,
        model: &M,
        document: &DocumentView,
        posterior: &mut [f64],
    ) -> Result<()> {
        let k = model.num_topics();
        let alpha = self.config.alpha;
        let beta = self.config.beta;
        let vb = model.vocabulary_size() as f64 * beta;

        // phi[i * k + t] = (n_tw + beta) / (n_t + V * beta) for the i-th slot
        let slots = document.slots();
        let mut phi = vec![0.0; slots.len() * k];
        for (i, slot) in slots.iter().enumerate() {
            for t in 0..k {
                phi[i * k + t] = (model.assignment_count(t, slot.index) as f64 + beta)
                    / (model.topic_frequency(t) as f64 + vb);
            }
        }

        let tokens: Vec<usize> = document.tokens().map(|(slot, _)| slot).collect();

        let mut rng =
            ChaCha20Rng::seed_from_u64(self.config.seed.wrapping_add(document.position() as u64));
        let mut assignments: Vec<usize> = Vec::with_capacity(tokens.len());
        let mut topic_counts = vec![0_u64; k];
        for _ in &tokens {
            let topic = rng.gen_range(0..k);
            assignments.push(topic);
            topic_counts[topic] += 1;
        }

        let mut weights = vec![0.0; k];
        for _ in 0..self.config.iterations {
            for (token, &slot) in tokens.iter().enumerate() {
                let old = assignments[token];
                topic_counts[old] -= 1;

                let mut total = 0.0;
                for t in 0..k {
                    weights[t] = (topic_counts[t] as f64 + alpha) * phi[slot * k + t];
                    total += weights[t];
                }

                let mut u = rng.gen_range(0.0..total);
                let mut new = k - 1;
                for (t, &w) in weights.iter().enumerate() {
                    if u < w {
                        new = t;
                        break;
                    }
                    u -= w;
                }

                assignments[token] = new;
                topic_counts[new] += 1;
            }
        }

        log::trace!(
            "fold-in of document {} finished after {} sweeps over {} tokens",
            document.position(),
            self.config.iterations,
            tokens.len()
        );

        let denominator = tokens.len() as f64 + k as f64 * alpha;
        for (weight, &count) in posterior.iter_mut().zip(&topic_counts) {
            *weight = (count as f64 + alpha) / denominator;
        }
        Ok(())
    }
}

/// Rejects negative or non-finite weights.
pub(crate) fn validate(posterior: &[f64]) -> Result<()> {
    match posterior
        .iter()
        .enumerate()
        .find(|&(_, &value)| !(value >= 0.0 && value.is_finite()))
    {
        Some((topic, &value)) => Err(Error::InvalidPosterior { topic, value }),
        None => Ok(()),
    }
}

/// Rescales the weights to sum to one. All-zero weights are left as they are.
pub(crate) fn normalize(posterior: &mut [f64]) {
    let sum: f64 = posterior.iter().sum();
    if sum > 0.0 {
        for weight in posterior.iter_mut() {
            *weight /= sum;
        }
    }
}
