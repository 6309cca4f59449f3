use thiserror::Error;

/// Errors produced while building models or evaluating perplexity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Every held-out document was excluded, so the aggregate has no denominator.
    #[error("no scoreable documents: every held-out document was excluded")]
    NoScoreableDocuments,

    /// A posterior estimator wrote a negative or non-finite weight.
    #[error("invalid posterior weight {value} for topic {topic}")]
    InvalidPosterior { topic: usize, value: f64 },

    /// A model must have at least one topic.
    #[error("topic model has no topics")]
    EmptyModel,

    /// A count matrix, cache or assignment list has the wrong shape.
    #[error("{what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Cached per-document state does not cover the requested corpus position.
    #[error("no cached state for document position {position} ({available} cached)")]
    PositionOutOfRange { position: usize, available: usize },

    /// A sampler assignment names a topic outside the model.
    #[error("invalid topic assignment {topic} in document {document} (model has {num_topics} topics)")]
    InvalidAssignment {
        document: usize,
        topic: usize,
        num_topics: usize,
    },

    /// A configuration value is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::NoScoreableDocuments.to_string(),
            "no scoreable documents: every held-out document was excluded"
        );
        let err = Error::DimensionMismatch {
            what: "topic frequencies",
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "topic frequencies: expected 3, found 2");
    }
}
