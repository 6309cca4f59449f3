//! Word and document log-likelihoods under a topic posterior.

use statrs::function::factorial;

use super::{TopicModel, WordSlot};

/// Log-probability of the training word `word` given per-topic weights.
///
/// Computes `ln Σ_t (n_tw / n_t) * posterior[t]` over the topics with a
/// non-zero frequency `n_t`. A topic without assigned words cannot emit one,
/// so it contributes nothing and its word counts are never read. When no
/// topic explains the word the result is negative infinity.
///
/// The weights are used as given; they are not renormalized here.
pub fn score_word<M: TopicModel>(model: &M, posterior: &[f64], word: usize) -> f64 {
    let mut sum = 0.0;
    for (topic, &weight) in posterior.iter().enumerate() {
        let frequency = model.topic_frequency(topic);
        if frequency > 0 {
            sum += model.assignment_count(topic, word) as f64 / frequency as f64 * weight;
        }
    }
    sum.ln()
}

/// `ln(n!)`, computed without overflowing for large `n`.
pub fn ln_factorial(n: u64) -> f64 {
    factorial::ln_factorial(n)
}

/// Log-probability of all in-vocabulary occurrences of a document.
///
/// With `bow_factor` the multinomial coefficient `n! / Π f_i!` of the word
/// multiset is included, `n` being the effective document size.
pub(crate) fn document_log_probability<M: TopicModel>(
    model: &M,
    posterior: &[f64],
    slots: &[WordSlot],
    effective_size: u64,
    bow_factor: bool,
) -> f64 {
    let mut log_probability = if bow_factor {
        ln_factorial(effective_size)
    } else {
        0.0
    };
    for slot in slots.iter().filter(|slot| slot.frequency > 0) {
        if bow_factor {
            log_probability -= ln_factorial(u64::from(slot.frequency));
        }
        log_probability += f64::from(slot.frequency) * score_word(model, posterior, slot.index);
    }
    log_probability
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::{CountModel, Corpus};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn two_topic_model() -> CountModel<Corpus<&'static str>> {
        let training = Corpus::from_tokens(vec![vec!["a", "a"], vec!["b", "b"]]);
        CountModel::from_counts(training, array![[2, 0], [0, 2]]).unwrap()
    }

    #[test]
    fn test_perfect_prediction_scores_zero() {
        let model = two_topic_model();
        assert_abs_diff_eq!(score_word(&model, &[1.0, 0.0], 0), 0.0);
        assert_abs_diff_eq!(score_word(&model, &[0.0, 1.0], 1), 0.0);
    }

    #[test]
    fn test_matches_closed_form() {
        let training = Corpus::from_tokens(vec![vec!["a", "b", "c"]]);
        let counts = array![[3, 1, 0], [1, 1, 2], [0, 5, 5]];
        let model = CountModel::from_counts(training, counts).unwrap();
        let posterior = [0.2, 0.3, 0.5];

        let expected = (3.0_f64 / 4.0 * 0.2 + 1.0 / 4.0 * 0.3).ln();
        assert_eq!(score_word(&model, &posterior, 0), expected);

        let expected = (1.0_f64 / 4.0 * 0.2 + 1.0 / 4.0 * 0.3 + 5.0 / 10.0 * 0.5).ln();
        assert_eq!(score_word(&model, &posterior, 1), expected);
    }

    #[test]
    fn test_zero_frequency_topic_is_ignored() {
        let training = Corpus::from_tokens(vec![vec!["a", "b"]]);
        let posterior = [0.5, 0.25, 0.25];
        let base = CountModel::from_parts(
            training.clone(),
            array![[1, 1], [0, 0], [2, 0]],
            vec![2, 0, 2],
        )
        .unwrap();
        let altered =
            CountModel::from_parts(training, array![[1, 1], [7, 9], [2, 0]], vec![2, 0, 2]).unwrap();
        for word in 0..2 {
            assert_eq!(
                score_word(&base, &posterior, word),
                score_word(&altered, &posterior, word)
            );
        }
    }

    #[test]
    fn test_unexplained_word_is_negative_infinity() {
        let model = two_topic_model();
        let score = score_word(&model, &[1.0, 0.0], 1);
        assert!(score.is_infinite() && score < 0.0);
    }

    #[test]
    fn test_ln_factorial() {
        assert_eq!(ln_factorial(0), 0.0);
        assert_eq!(ln_factorial(1), 0.0);
        assert_abs_diff_eq!(ln_factorial(5), 120f64.ln(), epsilon = 1e-12);
        assert!(ln_factorial(10_000).is_finite());
    }

    #[test]
    fn test_document_log_probability_with_bow_factor() {
        let model = two_topic_model();
        let slots = [WordSlot {
            index: 0,
            frequency: 3,
        }];
        let without = document_log_probability(&model, &[0.5, 0.5], &slots, 3, false);
        assert_abs_diff_eq!(without, 3.0 * 0.5f64.ln(), epsilon = 1e-12);

        // a single distinct word: 3! / 3! == 1, the factor cancels
        let with = document_log_probability(&model, &[0.5, 0.5], &slots, 3, true);
        assert_abs_diff_eq!(with, without, epsilon = 1e-12);

        let slots = [
            WordSlot {
                index: 0,
                frequency: 1,
            },
            WordSlot {
                index: 1,
                frequency: 1,
            },
        ];
        let with = document_log_probability(&model, &[0.5, 0.5], &slots, 2, true);
        assert_abs_diff_eq!(with, 2f64.ln() + 2.0 * 0.5f64.ln(), epsilon = 1e-12);
    }
}
