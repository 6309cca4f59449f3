//! Held-out evaluation of count-based topic models.
//!
//! This module scores unseen documents against a trained LDA-style model
//! (per-topic word assignment counts plus per-topic totals) and reduces the
//! scores to a single perplexity value:
//! - `bridge`: maps held-out words into the training vocabulary and computes
//!   effective document sizes
//! - `likelihood`: the per-word log-probability under a topic posterior
//! - `posterior`: the pluggable posterior estimators
//! - `perplexity`: the calculator with its full-document and held-out-word
//!   scoring modes
//! - `corpus` / `model`: in-memory documents, vocabularies and count models
//!
//! # Examples
//!
//! ```rust
//! use topic_perplexity::topic::{
//!     CountModel, Corpus, PerplexityCalculator, PerplexityConfig, UniformEstimator,
//! };
//! use ndarray::array;
//!
//! let training = Corpus::from_tokens(vec![vec!["a", "a"], vec!["b", "b"]]);
//! let model = CountModel::from_counts(training, array![[2, 0], [0, 2]]).unwrap();
//! let test = Corpus::from_tokens(vec![vec!["a", "b"]]);
//!
//! let mut calculator =
//!     PerplexityCalculator::with_seed(PerplexityConfig::default(), UniformEstimator, 7);
//! let perplexity = calculator.compute_perplexity(&test, &model).unwrap();
//! assert!((perplexity - 2.0).abs() < 1e-12);
//! ```

pub mod bridge;
pub mod corpus;
pub mod likelihood;
pub mod model;
pub mod perplexity;
pub mod posterior;

/// One distinct word of a document together with its number of occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSlot {
    /// Index of the word in the owning provider's vocabulary.
    pub index: usize,
    pub frequency: u32,
}

/// An immutable bag of words owned by a [`DocumentProvider`].
pub trait Document {
    /// The distinct words of the document in slot order.
    fn word_slots(&self) -> &[WordSlot];

    /// Frequency of the word with the given provider index, 0 if absent.
    fn frequency_of(&self, index: usize) -> u32 {
        self.word_slots()
            .iter()
            .find(|slot| slot.index == index)
            .map_or(0, |slot| slot.frequency)
    }

    /// Total number of word occurrences.
    fn size(&self) -> u64 {
        self.word_slots()
            .iter()
            .map(|slot| u64::from(slot.frequency))
            .sum()
    }
}

/// A vocabulary plus the ordered documents expressed over it.
pub trait DocumentProvider {
    type Word;
    type Doc: Document;

    fn documents(&self) -> &[Self::Doc];

    /// The word stored at a vocabulary index.
    fn word(&self, index: usize) -> Option<&Self::Word>;

    /// The vocabulary index of a word, `None` if the word is unknown.
    fn index_of(&self, word: &Self::Word) -> Option<usize>;

    fn vocabulary_size(&self) -> usize;
}

/// Read-only statistics of a trained topic model.
pub trait TopicModel {
    type Provider: DocumentProvider;

    fn num_topics(&self) -> usize;

    /// Total number of word occurrences assigned to `topic` during training.
    fn topic_frequency(&self, topic: usize) -> u64;

    /// How often the training word `word` was assigned to `topic`.
    fn assignment_count(&self, topic: usize, word: usize) -> u64;

    /// The provider holding the training documents and vocabulary.
    fn document_provider(&self) -> &Self::Provider;

    fn vocabulary_size(&self) -> usize {
        self.document_provider().vocabulary_size()
    }
}

pub use bridge::{effective_size, DocumentView, VocabularyBridge};
pub use corpus::{BagOfWords, Corpus, Vocabulary};
pub use likelihood::{ln_factorial, score_word};
pub use model::CountModel;
pub use perplexity::{
    held_out_word, select_held_out_word, PerplexityCalculator, PerplexityConfig, PerplexityStats,
    ScoringMode,
};
pub use posterior::{
    CachedAssignmentEstimator, FoldInConfig, FoldInEstimator, PosteriorEstimator,
    UniformEstimator,
};
