//! Count-based topic model backed by dense matrices.

use ndarray::{Array1, Array2, Axis};

use super::{Document, DocumentProvider, TopicModel};
use crate::error::{Error, Result};

/// Topic-word assignment counts of a trained model.
///
/// `counts[[t, w]]` is how often training word `w` was assigned to topic `t`;
/// `topic_frequencies[t]` is the number of occurrences assigned to `t`.
#[derive(Debug, Clone)]
pub struct CountModel<P> {
    provider: P,
    counts: Array2<u64>,
    topic_frequencies: Array1<u64>,
}

impl<P: DocumentProvider> CountModel<P> {
    /// Builds a model whose topic frequencies are the row sums of `counts`.
    pub fn from_counts(provider: P, counts: Array2<u64>) -> Result<Self> {
        let topic_frequencies = counts.sum_axis(Axis(1));
        Self::from_parts(provider, counts, topic_frequencies.to_vec())
    }

    /// Builds a model from explicit counts and topic frequencies.
    ///
    /// Frequencies are taken as given, so a topic may carry word counts while
    /// having a zero total; such a topic never contributes to a word score.
    pub fn from_parts(provider: P, counts: Array2<u64>, topic_frequencies: Vec<u64>) -> Result<Self> {
        let (num_topics, vocabulary_size) = counts.dim();
        if num_topics == 0 {
            return Err(Error::EmptyModel);
        }
        if vocabulary_size != provider.vocabulary_size() {
            return Err(Error::DimensionMismatch {
                what: "topic-word count columns",
                expected: provider.vocabulary_size(),
                found: vocabulary_size,
            });
        }
        if topic_frequencies.len() != num_topics {
            return Err(Error::DimensionMismatch {
                what: "topic frequencies",
                expected: num_topics,
                found: topic_frequencies.len(),
            });
        }
        Ok(Self {
            provider,
            counts,
            topic_frequencies: Array1::from(topic_frequencies),
        })
    }

    /// Builds a model from the final state of a topic sampler.
    ///
    /// `assignments[d]` lists one topic per word occurrence of training
    /// document `d`, in slot order with each slot repeated `frequency` times.
    pub fn from_token_assignments(
        provider: P,
        num_topics: usize,
        assignments: &[Vec<usize>],
    ) -> Result<Self> {
        if num_topics == 0 {
            return Err(Error::EmptyModel);
        }
        let documents = provider.documents();
        if assignments.len() != documents.len() {
            return Err(Error::DimensionMismatch {
                what: "assigned training documents",
                expected: documents.len(),
                found: assignments.len(),
            });
        }

        let mut counts = Array2::<u64>::zeros((num_topics, provider.vocabulary_size()));
        for (d, (document, topics)) in documents.iter().zip(assignments).enumerate() {
            let size = document.size() as usize;
            if topics.len() != size {
                return Err(Error::DimensionMismatch {
                    what: "topic assignments of training document",
                    expected: size,
                    found: topics.len(),
                });
            }
            let words = document
                .word_slots()
                .iter()
                .flat_map(|slot| std::iter::repeat(slot.index).take(slot.frequency as usize));
            for (word, &topic) in words.zip(topics) {
                if topic >= num_topics {
                    return Err(Error::InvalidAssignment {
                        document: d,
                        topic,
                        num_topics,
                    });
                }
                counts[[topic, word]] += 1;
            }
        }
        Self::from_counts(provider, counts)
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }
}

impl<P: DocumentProvider> TopicModel for CountModel<P> {
    type Provider = P;

    fn num_topics(&self) -> usize {
        self.counts.nrows()
    }

    fn topic_frequency(&self, topic: usize) -> u64 {
        self.topic_frequencies[topic]
    }

    fn assignment_count(&self, topic: usize, word: usize) -> u64 {
        self.counts[[topic, word]]
    }

    fn document_provider(&self) -> &P {
        &self.provider
    }
}
