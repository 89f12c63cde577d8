// Remote classifier trait: the swap-ready boundary to hosted moderation.
//
// Classifier responses are validated once, here, into a closed result type.
// The orchestrator only ever branches on Ok(ClassifierResponse) or one of
// the ClassifierError variants.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A validated classifier answer for one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierResponse {
    pub flagged: bool,
    /// Per-category booleans as reported by the provider
    pub categories: HashMap<String, bool>,
    /// Per-category scores, each within 0.0 to 1.0
    pub category_scores: HashMap<String, f64>,
}

impl ClassifierResponse {
    /// Check scores are finite and within 0.0 to 1.0.
    pub fn validate(self) -> Result<Self, ClassifierError> {
        if let Some((name, score)) = self
            .category_scores
            .iter()
            .find(|(_, s)| !s.is_finite() || !(0.0..=1.0).contains(*s))
        {
            return Err(ClassifierError::Malformed(format!(
                "category {name} has out-of-range score {score}"
            )));
        }
        Ok(self)
    }

    /// Highest category score (0.0 if the provider sent none).
    pub fn max_score(&self) -> f64 {
        self.category_scores.values().copied().fold(0.0, f64::max)
    }

    /// Categories the provider marked true, sorted by name.
    pub fn flagged_categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .categories
            .iter()
            .filter(|(_, flagged)| **flagged)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Why the remote classifier couldn't give an answer. Internal only: the
/// orchestrator maps every variant to the local fallback verdict.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("classifier returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed classifier response: {0}")]
    Malformed(String),

    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),
}

/// Trait for remote content classifiers. Async because every provider is an
/// HTTP call.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a single message.
    async fn classify(&self, text: &str) -> Result<ClassifierResponse, ClassifierError>;

    /// Short provider name for logs.
    fn name(&self) -> &str {
        "classifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(scores: &[(&str, f64)]) -> ClassifierResponse {
        ClassifierResponse {
            flagged: false,
            categories: scores.iter().map(|(n, s)| (n.to_string(), *s > 0.5)).collect(),
            category_scores: scores.iter().map(|(n, s)| (n.to_string(), *s)).collect(),
        }
    }

    #[test]
    fn validate_accepts_scores_in_range() {
        let r = response(&[("harassment", 0.0), ("hate", 1.0)]);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_and_nan() {
        assert!(matches!(
            response(&[("hate", 1.5)]).validate(),
            Err(ClassifierError::Malformed(_))
        ));
        assert!(matches!(
            response(&[("hate", f64::NAN)]).validate(),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn max_score_and_flagged_categories() {
        let r = response(&[("violence", 0.2), ("harassment", 0.9), ("hate", 0.7)]);
        assert!((r.max_score() - 0.9).abs() < f64::EPSILON);
        assert_eq!(r.flagged_categories(), vec!["harassment", "hate"]);
        assert_eq!(ClassifierResponse::default().max_score(), 0.0);
    }
}
