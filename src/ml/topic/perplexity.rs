//! Held-out perplexity of a topic model.
//!
//! Two scoring modes are available:
//! - full document: every in-vocabulary word occurrence of every held-out
//!   document is scored, and the perplexity is normalized per word
//! - held-out word: one randomly drawn word occurrence per document is
//!   scored, and the perplexity is normalized per document
//!
//! Documents that cannot be scored (no word known to the training
//! vocabulary) are left out of both the log-likelihood and the denominator.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use super::bridge::{DocumentView, VocabularyBridge};
use super::likelihood::{document_log_probability, score_word};
use super::posterior::{normalize, validate, PosteriorEstimator};
use super::{Document, DocumentProvider, TopicModel};
use crate::error::{Error, Result};

/// How held-out documents are turned into log-likelihood terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// Score every in-vocabulary word occurrence.
    #[default]
    FullDocument,
    /// Score a single uniformly drawn word occurrence per document.
    HeldOutWord,
}

/// Configuration options for perplexity evaluation.
#[derive(Debug, Clone, Default)]
pub struct PerplexityConfig {
    pub mode: ScoringMode,
    /// Include the multinomial coefficient of each document's word multiset.
    /// Only used by [`ScoringMode::FullDocument`].
    pub bow_factor: bool,
    /// Rescale estimated posteriors to sum to one before scoring.
    pub normalize_posterior: bool,
}

impl PerplexityConfig {
    /// Create a config for `mode` without the bag-of-words factor and without
    /// posterior normalization.
    pub fn new(mode: ScoringMode) -> Self {
        Self {
            mode,
            bow_factor: false,
            normalize_posterior: false,
        }
    }

    /// Customize whether the multinomial coefficient of each document is included.
    pub fn with_bow_factor(mut self, bow_factor: bool) -> Self {
        self.bow_factor = bow_factor;
        self
    }

    /// Customize whether estimated posteriors are rescaled to sum to one.
    pub fn with_normalized_posterior(mut self, normalize_posterior: bool) -> Self {
        self.normalize_posterior = normalize_posterior;
        self
    }
}

/// Outcome of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerplexityStats {
    /// `exp(-log_likelihood / weight)`.
    pub perplexity: f64,
    /// Summed log-likelihood of all scored documents.
    pub log_likelihood: f64,
    /// Scored word occurrences (full document) or scored documents (held-out word).
    pub weight: u64,
    pub scored_documents: usize,
    pub skipped_documents: usize,
}

/// Log-likelihood and weight contributed by one scored document.
#[derive(Debug, Clone, Copy)]
struct Contribution {
    log_probability: f64,
    weight: u64,
}

#[derive(Debug, Default)]
struct Totals {
    log_likelihood: f64,
    weight: u64,
    scored_documents: usize,
    skipped_documents: usize,
}

impl Totals {
    fn add(&mut self, contribution: Option<Contribution>) {
        match contribution {
            Some(c) => {
                self.log_likelihood += c.log_probability;
                self.weight += c.weight;
                self.scored_documents += 1;
            }
            None => self.skipped_documents += 1,
        }
    }

    fn finish(self, mode: ScoringMode) -> Result<PerplexityStats> {
        if self.weight == 0 {
            return Err(Error::NoScoreableDocuments);
        }
        let perplexity = (-self.log_likelihood / self.weight as f64).exp();
        log::info!(
            "{:?} perplexity {:.4} over {} documents ({} skipped, weight {})",
            mode,
            perplexity,
            self.scored_documents,
            self.skipped_documents,
            self.weight
        );
        Ok(PerplexityStats {
            perplexity,
            log_likelihood: self.log_likelihood,
            weight: self.weight,
            scored_documents: self.scored_documents,
            skipped_documents: self.skipped_documents,
        })
    }
}

/// Computes held-out perplexity with a pluggable posterior estimator.
///
/// The calculator owns a posterior buffer reused for every document of a run
/// and, for [`ScoringMode::HeldOutWord`], the random source drawing held-out
/// positions. Draws are consumed one per document in corpus order, so a
/// seeded calculator reproduces its results on the same corpus.
#[derive(Debug, Clone)]
pub struct PerplexityCalculator<E, R = ChaCha20Rng> {
    config: PerplexityConfig,
    estimator: E,
    rng: R,
    posterior: Vec<f64>,
}

impl<E: PosteriorEstimator> PerplexityCalculator<E, ChaCha20Rng> {
    /// Create a calculator whose random source is seeded from system entropy.
    pub fn new(config: PerplexityConfig, estimator: E) -> Self {
        Self::with_rng(config, estimator, ChaCha20Rng::from_entropy())
    }

    /// Create a calculator with a reproducible random source.
    pub fn with_seed(config: PerplexityConfig, estimator: E, seed: u64) -> Self {
        Self::with_rng(config, estimator, ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<E: PosteriorEstimator, R: Rng> PerplexityCalculator<E, R> {
    /// Create a calculator drawing held-out positions from `rng`.
    pub fn with_rng(config: PerplexityConfig, estimator: E, rng: R) -> Self {
        Self {
            config,
            estimator,
            rng,
            posterior: Vec::new(),
        }
    }

    pub fn config(&self) -> &PerplexityConfig {
        &self.config
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// The random source used to draw held-out word positions.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Perplexity of `model` on the documents of `test`.
    ///
    /// Returns `+inf` when some scored word cannot be explained by any topic,
    /// and [`Error::NoScoreableDocuments`] when every document is excluded.
    pub fn compute_perplexity<T, M>(&mut self, test: &T, model: &M) -> Result<f64>
    where
        T: DocumentProvider,
        M: TopicModel,
        M::Provider: DocumentProvider<Word = T::Word>,
    {
        self.evaluate(test, model).map(|stats| stats.perplexity)
    }

    /// Like [`compute_perplexity`](Self::compute_perplexity), but returns the
    /// accumulated statistics as well.
    pub fn evaluate<T, M>(&mut self, test: &T, model: &M) -> Result<PerplexityStats>
    where
        T: DocumentProvider,
        M: TopicModel,
        M::Provider: DocumentProvider<Word = T::Word>,
    {
        let num_topics = model.num_topics();
        if num_topics == 0 {
            return Err(Error::EmptyModel);
        }
        if self.posterior.len() != num_topics {
            self.posterior = vec![0.0; num_topics];
        }

        let bridge = VocabularyBridge::new(test, model.document_provider());
        let mut totals = Totals::default();
        for (position, document) in test.documents().iter().enumerate() {
            let contribution = match self.config.mode {
                ScoringMode::FullDocument => full_document_contribution(
                    &self.config,
                    &self.estimator,
                    model,
                    &bridge,
                    document,
                    position,
                    &mut self.posterior,
                )?,
                ScoringMode::HeldOutWord => held_out_contribution(
                    &self.config,
                    &self.estimator,
                    model,
                    &bridge,
                    document,
                    position,
                    &mut self.posterior,
                    &mut self.rng,
                )?,
            };
            totals.add(contribution);
        }
        totals.finish(self.config.mode)
    }
}

impl<E: PosteriorEstimator + Sync, R> PerplexityCalculator<E, R> {
    /// Evaluates documents in parallel.
    ///
    /// Every document gets its own posterior buffer and, in held-out mode, its
    /// own random stream seeded from `seed` and the document position. The
    /// result does not depend on thread scheduling, but held-out draws differ
    /// from those of the sequential [`evaluate`](PerplexityCalculator::evaluate).
    pub fn par_evaluate<T, M>(&self, test: &T, model: &M, seed: u64) -> Result<PerplexityStats>
    where
        T: DocumentProvider + Sync,
        T::Doc: Sync,
        M: TopicModel + Sync,
        M::Provider: DocumentProvider<Word = T::Word> + Sync,
    {
        let num_topics = model.num_topics();
        if num_topics == 0 {
            return Err(Error::EmptyModel);
        }

        let config = &self.config;
        let estimator = &self.estimator;
        let bridge = VocabularyBridge::new(test, model.document_provider());
        let contributions = test
            .documents()
            .par_iter()
            .enumerate()
            .map(|(position, document)| {
                let mut posterior = vec![0.0; num_topics];
                match config.mode {
                    ScoringMode::FullDocument => full_document_contribution(
                        config,
                        estimator,
                        model,
                        &bridge,
                        document,
                        position,
                        &mut posterior,
                    ),
                    ScoringMode::HeldOutWord => {
                        let mut rng = ChaCha20Rng::seed_from_u64(seed.wrapping_add(position as u64));
                        held_out_contribution(
                            config,
                            estimator,
                            model,
                            &bridge,
                            document,
                            position,
                            &mut posterior,
                            &mut rng,
                        )
                    }
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut totals = Totals::default();
        for contribution in contributions {
            totals.add(contribution);
        }
        totals.finish(config.mode)
    }
}

/// Training index of the word occurrence at `target` in `document`.
///
/// Slots are walked in order, accumulating frequencies; the first slot whose
/// cumulative count reaches `target` is the candidate. If the candidate is
/// unknown to the training vocabulary the first known word of the document
/// is used instead. Slots with frequency 0 hold no occurrence and are never
/// chosen. `None` means the document has no known word occurrence at all.
///
/// A slot is reached as soon as its cumulative count equals `target`, so for
/// targets in `[0, size)` the choice is not uniform over occurrences: the
/// occurrence at the last position of the document is never the candidate.
pub fn held_out_word<T, P, D>(
    document: &D,
    bridge: &VocabularyBridge<'_, T, P>,
    target: u64,
) -> Option<usize>
where
    T: DocumentProvider,
    P: DocumentProvider<Word = T::Word>,
    D: Document,
{
    let mut seen = 0_u64;
    let mut candidate = None;
    for slot in document.word_slots() {
        if slot.frequency == 0 {
            continue;
        }
        seen += u64::from(slot.frequency);
        if seen >= target {
            candidate = bridge.training_index(slot.index);
            break;
        }
    }
    candidate.or_else(|| {
        document
            .word_slots()
            .iter()
            .filter(|slot| slot.frequency > 0)
            .find_map(|slot| bridge.training_index(slot.index))
    })
}

/// Draws a uniform occurrence position in `[0, size)` and resolves it with
/// [`held_out_word`]. Empty documents return `None` without consuming a draw.
pub fn select_held_out_word<T, P, D, G>(
    document: &D,
    bridge: &VocabularyBridge<'_, T, P>,
    rng: &mut G,
) -> Option<usize>
where
    T: DocumentProvider,
    P: DocumentProvider<Word = T::Word>,
    D: Document,
    G: Rng + ?Sized,
{
    let size = document.size();
    if size == 0 {
        return None;
    }
    let target = rng.gen_range(0..size);
    held_out_word(document, bridge, target)
}

fn estimate<E, M>(
    config: &PerplexityConfig,
    estimator: &E,
    model: &M,
    view: &DocumentView,
    posterior: &mut [f64],
) -> Result<()>
where
    E: PosteriorEstimator,
    M: TopicModel,
{
    estimator.update_posterior(model, view, posterior)?;
    validate(posterior)?;
    if config.normalize_posterior {
        normalize(posterior);
    }
    Ok(())
}

fn full_document_contribution<E, M, T, D>(
    config: &PerplexityConfig,
    estimator: &E,
    model: &M,
    bridge: &VocabularyBridge<'_, T, M::Provider>,
    document: &D,
    position: usize,
    posterior: &mut [f64],
) -> Result<Option<Contribution>>
where
    E: PosteriorEstimator,
    M: TopicModel,
    T: DocumentProvider,
    M::Provider: DocumentProvider<Word = T::Word>,
    D: Document,
{
    let view = bridge.resolve(document, position);
    let size = view.effective_size();
    if size == 0 {
        log::debug!("skipping document {position}: no word in the training vocabulary");
        return Ok(None);
    }

    estimate(config, estimator, model, &view, posterior)?;
    let log_probability =
        document_log_probability(model, posterior, view.slots(), size, config.bow_factor);
    log::trace!("document {position}: {size} words, log-probability {log_probability}");

    Ok(Some(Contribution {
        log_probability,
        weight: size,
    }))
}

#[allow(clippy::too_many_arguments)]
fn held_out_contribution<E, M, T, D, G>(
    config: &PerplexityConfig,
    estimator: &E,
    model: &M,
    bridge: &VocabularyBridge<'_, T, M::Provider>,
    document: &D,
    position: usize,
    posterior: &mut [f64],
    rng: &mut G,
) -> Result<Option<Contribution>>
where
    E: PosteriorEstimator,
    M: TopicModel,
    T: DocumentProvider,
    M::Provider: DocumentProvider<Word = T::Word>,
    D: Document,
    G: Rng + ?Sized,
{
    let Some(word) = select_held_out_word(document, bridge, rng) else {
        log::debug!("skipping document {position}: no word in the training vocabulary");
        return Ok(None);
    };

    // the posterior sees the whole document, held-out occurrence included
    let view = bridge.resolve(document, position);
    estimate(config, estimator, model, &view, posterior)?;
    let log_probability = score_word(model, posterior, word);
    log::trace!("document {position}: held-out word {word}, log-probability {log_probability}");

    Ok(Some(Contribution {
        log_probability,
        weight: 1,
    }))
}
