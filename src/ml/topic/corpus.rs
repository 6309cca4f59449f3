//! In-memory vocabularies, documents and corpora.

use std::collections::HashMap;
use std::hash::Hash;

use super::{Document, DocumentProvider, WordSlot};

/// Bidirectional mapping between words and dense vocabulary indices.
#[derive(Debug, Clone)]
pub struct Vocabulary<W> {
    words: Vec<W>,
    indices: HashMap<W, usize>,
}

impl<W: Eq + Hash + Clone> Vocabulary<W> {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Returns the index of `word`, adding it to the vocabulary if needed.
    pub fn intern(&mut self, word: W) -> usize {
        if let Some(&index) = self.indices.get(&word) {
            return index;
        }
        let index = self.words.len();
        self.words.push(word.clone());
        self.indices.insert(word, index);
        index
    }

    pub fn index_of(&self, word: &W) -> Option<usize> {
        self.indices.get(word).copied()
    }

    pub fn word(&self, index: usize) -> Option<&W> {
        self.words.get(index)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<W: Eq + Hash + Clone> Default for Vocabulary<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// A document stored as distinct word slots in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagOfWords {
    slots: Vec<WordSlot>,
}

impl BagOfWords {
    /// Builds a document from a token stream of vocabulary indices.
    pub fn from_indices<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut slots: Vec<WordSlot> = Vec::new();
        let mut positions: HashMap<usize, usize> = HashMap::new();
        for index in indices {
            match positions.get(&index) {
                Some(&pos) => slots[pos].frequency += 1,
                None => {
                    positions.insert(index, slots.len());
                    slots.push(WordSlot {
                        index,
                        frequency: 1,
                    });
                }
            }
        }
        Self { slots }
    }

    /// Builds a document from explicit `(index, frequency)` pairs.
    ///
    /// Repeated indices are merged into the first slot that names them.
    pub fn from_frequencies<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, u32)>,
    {
        let mut slots: Vec<WordSlot> = Vec::new();
        for (index, frequency) in pairs {
            match slots.iter_mut().find(|slot| slot.index == index) {
                Some(slot) => slot.frequency += frequency,
                None => slots.push(WordSlot { index, frequency }),
            }
        }
        Self { slots }
    }
}

impl Document for BagOfWords {
    fn word_slots(&self) -> &[WordSlot] {
        &self.slots
    }
}

/// A vocabulary together with the documents expressed over it.
#[derive(Debug, Clone)]
pub struct Corpus<W> {
    vocabulary: Vocabulary<W>,
    documents: Vec<BagOfWords>,
}

impl<W: Eq + Hash + Clone> Corpus<W> {
    pub fn new() -> Self {
        Self {
            vocabulary: Vocabulary::new(),
            documents: Vec::new(),
        }
    }

    /// Builds a corpus from tokenized documents, interning words in order of
    /// first appearance.
    pub fn from_tokens<D, T>(documents: D) -> Self
    where
        D: IntoIterator<Item = T>,
        T: IntoIterator<Item = W>,
    {
        let mut corpus = Self::new();
        for tokens in documents {
            corpus.push_tokens(tokens);
        }
        corpus
    }

    /// Appends a tokenized document and returns its position.
    pub fn push_tokens<T>(&mut self, tokens: T) -> usize
    where
        T: IntoIterator<Item = W>,
    {
        let vocabulary = &mut self.vocabulary;
        let document = BagOfWords::from_indices(tokens.into_iter().map(|w| vocabulary.intern(w)));
        self.documents.push(document);
        self.documents.len() - 1
    }

    /// Appends a document given as `(word, frequency)` pairs and returns its
    /// position.
    pub fn push_frequencies<T>(&mut self, pairs: T) -> usize
    where
        T: IntoIterator<Item = (W, u32)>,
    {
        let vocabulary = &mut self.vocabulary;
        let document = BagOfWords::from_frequencies(
            pairs
                .into_iter()
                .map(|(word, frequency)| (vocabulary.intern(word), frequency)),
        );
        self.documents.push(document);
        self.documents.len() - 1
    }

    /// Adds a word to the vocabulary without attaching it to any document.
    pub fn intern(&mut self, word: W) -> usize {
        self.vocabulary.intern(word)
    }

    pub fn vocabulary(&self) -> &Vocabulary<W> {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl<W: Eq + Hash + Clone> Default for Corpus<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Eq + Hash + Clone> DocumentProvider for Corpus<W> {
    type Word = W;
    type Doc = BagOfWords;

    fn documents(&self) -> &[BagOfWords] {
        &self.documents
    }

    fn word(&self, index: usize) -> Option<&W> {
        self.vocabulary.word(index)
    }

    fn index_of(&self, word: &W) -> Option<usize> {
        self.vocabulary.index_of(word)
    }

    fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_interning() {
        let mut vocabulary = Vocabulary::new();
        assert!(vocabulary.is_empty());
        assert_eq!(vocabulary.intern("x"), 0);
        assert_eq!(vocabulary.intern("y"), 1);
        assert_eq!(vocabulary.intern("x"), 0);
        assert_eq!(vocabulary.len(), 2);
        assert_eq!(vocabulary.word(1), Some(&"y"));
        assert_eq!(vocabulary.index_of(&"z"), None);
    }

    #[test]
    fn test_bag_of_words_keeps_first_occurrence_order() {
        let doc = BagOfWords::from_indices(vec![3, 1, 3, 3, 0]);
        let indices: Vec<usize> = doc.word_slots().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![3, 1, 0]);
        assert_eq!(doc.frequency_of(3), 3);
        assert_eq!(doc.frequency_of(7), 0);
        assert_eq!(doc.size(), 5);
    }

    #[test]
    fn test_from_frequencies_merges_duplicates() {
        let doc = BagOfWords::from_frequencies(vec![(2, 1), (5, 0), (2, 4)]);
        assert_eq!(doc.word_slots().len(), 2);
        assert_eq!(doc.frequency_of(2), 5);
        assert_eq!(doc.size(), 5);
    }

    #[test]
    fn test_corpus_from_tokens() {
        let corpus = Corpus::from_tokens(vec![vec!["a", "b", "a"], vec![], vec!["c"]]);
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.vocabulary_size(), 3);
        assert_eq!(corpus.index_of(&"c"), Some(2));
        assert_eq!(corpus.documents()[0].size(), 3);
        assert_eq!(corpus.documents()[1].size(), 0);
    }

    #[test]
    fn test_push_frequencies() {
        let mut corpus = Corpus::new();
        corpus.intern("unused");
        let position = corpus.push_frequencies(vec![("a", 2), ("b", 1)]);
        assert_eq!(position, 0);
        assert_eq!(corpus.vocabulary_size(), 3);
        let a = corpus.index_of(&"a").unwrap();
        assert_eq!(corpus.documents()[0].frequency_of(a), 2);
    }
}
