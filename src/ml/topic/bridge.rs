//! Resolution of held-out words into the training vocabulary.

use super::{Document, DocumentProvider, WordSlot};

/// Maps word indices of a held-out provider onto a training provider.
///
/// The two vocabularies are independent, so resolution goes through the word
/// value: held-out index → word → training index.
pub struct VocabularyBridge<'a, T, P> {
    test: &'a T,
    training: &'a P,
}

impl<'a, T, P> Clone for VocabularyBridge<'a, T, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, P> Copy for VocabularyBridge<'a, T, P> {}

impl<'a, T, P> VocabularyBridge<'a, T, P>
where
    T: DocumentProvider,
    P: DocumentProvider<Word = T::Word>,
{
    pub fn new(test: &'a T, training: &'a P) -> Self {
        Self { test, training }
    }

    /// Training index of the held-out word at `test_index`, `None` when the
    /// word never occurred in training.
    pub fn training_index(&self, test_index: usize) -> Option<usize> {
        self.test
            .word(test_index)
            .and_then(|word| self.training.index_of(word))
    }

    /// Resolves every in-vocabulary slot of `document`.
    pub fn resolve<D: Document>(&self, document: &D, position: usize) -> DocumentView {
        let mut slots = Vec::with_capacity(document.word_slots().len());
        let mut effective_size = 0;
        for slot in document.word_slots() {
            if let Some(index) = self.training_index(slot.index) {
                effective_size += u64::from(slot.frequency);
                slots.push(WordSlot {
                    index,
                    frequency: slot.frequency,
                });
            }
        }
        DocumentView {
            position,
            slots,
            effective_size,
        }
    }
}

/// Number of word occurrences in `document` whose word is known to the
/// training vocabulary.
pub fn effective_size<T, P, D>(document: &D, bridge: &VocabularyBridge<'_, T, P>) -> u64
where
    T: DocumentProvider,
    P: DocumentProvider<Word = T::Word>,
    D: Document,
{
    document
        .word_slots()
        .iter()
        .filter(|slot| bridge.training_index(slot.index).is_some())
        .map(|slot| u64::from(slot.frequency))
        .sum()
}

/// A held-out document restricted to the training vocabulary.
///
/// Slots keep the document's order and frequencies but carry training indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentView {
    position: usize,
    slots: Vec<WordSlot>,
    effective_size: u64,
}

impl DocumentView {
    pub fn new(position: usize, slots: Vec<WordSlot>) -> Self {
        let effective_size = slots.iter().map(|s| u64::from(s.frequency)).sum();
        Self {
            position,
            slots,
            effective_size,
        }
    }

    /// Position of the document in corpus iteration order.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn slots(&self) -> &[WordSlot] {
        &self.slots
    }

    pub fn effective_size(&self) -> u64 {
        self.effective_size
    }

    /// One `(slot ordinal, training index)` pair per word occurrence, each slot
    /// repeated `frequency` times.
    pub fn tokens(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots.iter().enumerate().flat_map(|(ordinal, slot)| {
            std::iter::repeat((ordinal, slot.index)).take(slot.frequency as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::Corpus;

    fn providers() -> (Corpus<&'static str>, Corpus<&'static str>) {
        let training = Corpus::from_tokens(vec![vec!["a", "b", "c"]]);
        let test = Corpus::from_tokens(vec![
            vec!["x", "b", "b", "a"],
            vec!["y", "z"],
            vec!["c"],
        ]);
        (test, training)
    }

    #[test]
    fn test_training_index_resolves_by_value() {
        let (test, training) = providers();
        let bridge = VocabularyBridge::new(&test, &training);
        // test vocabulary: x=0, b=1, a=2, y=3, z=4, c=5
        assert_eq!(bridge.training_index(0), None);
        assert_eq!(bridge.training_index(1), Some(1));
        assert_eq!(bridge.training_index(2), Some(0));
        assert_eq!(bridge.training_index(5), Some(2));
        assert_eq!(bridge.training_index(99), None);
    }

    #[test]
    fn test_effective_size_ignores_unknown_words() {
        let (test, training) = providers();
        let bridge = VocabularyBridge::new(&test, &training);
        let sizes: Vec<u64> = test
            .documents()
            .iter()
            .map(|d| effective_size(d, &bridge))
            .collect();
        assert_eq!(sizes, vec![3, 0, 1]);
    }

    #[test]
    fn test_resolve_keeps_slot_order() {
        let (test, training) = providers();
        let bridge = VocabularyBridge::new(&test, &training);
        let view = bridge.resolve(&test.documents()[0], 0);
        assert_eq!(view.position(), 0);
        assert_eq!(view.effective_size(), 3);
        assert_eq!(
            view.slots(),
            &[
                WordSlot {
                    index: 1,
                    frequency: 2
                },
                WordSlot {
                    index: 0,
                    frequency: 1
                }
            ]
        );
        assert_eq!(
            view.tokens().collect::<Vec<_>>(),
            vec![(0, 1), (0, 1), (1, 0)]
        );
    }
}
