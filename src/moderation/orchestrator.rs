// Moderation orchestrator: sequences the local filter and the optional
// remote classifier for a single message.
//
//   local scan ── unclean ──────────────────────────────▶ rejected (local-lexicon)
//        │
//      clean ── remote disabled / nothing to classify ──▶ accepted (local-*)
//        │
//      remote ── flagged ──▶ rejected (remote-classifier, locally masked)
//             ── cleared ──▶ accepted (remote-classifier)
//             ── error / timeout ──▶ local verdict (fallback)
//
// The orchestrator never sends or edits a message, and never fails: any
// classifier problem degrades to the local verdict.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::openai::{OpenAiModerationClassifier, DEFAULT_MODERATION_MODEL, DEFAULT_MODERATION_URL};
use super::report::{build_report, ModerationReport};
use super::traits::{Classifier, ClassifierError, ClassifierResponse};
use crate::filter::ContentFilter;
use crate::verdict::{ModerationVerdict, VerdictSource};

/// A remote-flagged verdict never reports more confidence than this.
const MAX_FLAGGED_CONFIDENCE: f64 = 0.5;

/// Remote classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationConfig {
    /// Consult the remote classifier for locally clean messages
    pub remote_enabled: bool,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub classifier_url: String,
    pub classifier_model: String,
    /// Upper bound on one classifier call, throttle wait included
    pub classifier_timeout: Duration,
    pub classifier_qps: f64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            remote_enabled: false,
            api_key: String::new(),
            classifier_url: DEFAULT_MODERATION_URL.to_string(),
            classifier_model: DEFAULT_MODERATION_MODEL.to_string(),
            classifier_timeout: Duration::from_millis(5_000),
            classifier_qps: 5.0,
        }
    }
}

/// Runs the moderation pipeline for one message at a time.
pub struct Moderator {
    filter: ContentFilter,
    classifier: Option<Arc<dyn Classifier>>,
    timeout: Duration,
}

impl Moderator {
    /// Local filter only; remote classification is skipped entirely.
    pub fn local_only(filter: ContentFilter) -> Self {
        Self {
            filter,
            classifier: None,
            timeout: ModerationConfig::default().classifier_timeout,
        }
    }

    /// Local filter backed by `classifier`, each call bounded by `timeout`.
    pub fn with_classifier(
        filter: ContentFilter,
        classifier: Arc<dyn Classifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            filter,
            classifier: Some(classifier),
            timeout,
        }
    }

    /// Build from configuration, wiring up the OpenAI-style classifier when
    /// remote moderation is enabled.
    pub fn from_config(filter: ContentFilter, config: &ModerationConfig) -> Result<Self> {
        if !config.remote_enabled {
            return Ok(Self::local_only(filter));
        }
        if config.api_key.is_empty() {
            anyhow::bail!("Remote moderation is enabled but no classifier API key is set");
        }

        let classifier = OpenAiModerationClassifier::new(
            &config.classifier_url,
            config.api_key.clone(),
            &config.classifier_model,
            config.classifier_timeout,
            config.classifier_qps,
        )?;

        Ok(Self::with_classifier(
            filter,
            Arc::new(classifier),
            config.classifier_timeout,
        ))
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    pub fn remote_enabled(&self) -> bool {
        self.classifier.is_some()
    }

    /// Decide whether `text` is clean.
    pub async fn moderate(&self, text: &str) -> ModerationVerdict {
        let local = self.filter.scan(text);

        if !local.is_clean {
            info!(
                terms = ?local.matched_terms,
                confidence = local.confidence,
                "Message rejected by local filter"
            );
            return local;
        }

        // Too short to scan means too short to be worth a network call
        if local.source == VerdictSource::LocalFast {
            return local;
        }

        let Some(classifier) = &self.classifier else {
            return local;
        };

        match self.classify(classifier.as_ref(), text).await {
            Ok(response) => self.remote_verdict(text, local, response),
            Err(e) => {
                warn!(
                    classifier = classifier.name(),
                    error = %e,
                    "Remote classifier unavailable, using local verdict"
                );
                local.with_source(VerdictSource::Fallback)
            }
        }
    }

    /// `moderate`, projected into a display report.
    pub async fn review(&self, text: &str) -> ModerationReport {
        build_report(&self.moderate(text).await)
    }

    async fn classify(
        &self,
        classifier: &dyn Classifier,
        text: &str,
    ) -> Result<ClassifierResponse, ClassifierError> {
        match tokio::time::timeout(self.timeout, classifier.classify(text)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.timeout)),
        }
    }

    fn remote_verdict(
        &self,
        text: &str,
        local: ModerationVerdict,
        response: ClassifierResponse,
    ) -> ModerationVerdict {
        let confidence = (1.0 - response.max_score()).clamp(0.0, 1.0);

        if !response.flagged {
            debug!(confidence, "Remote classifier cleared message");
            return ModerationVerdict {
                confidence,
                source: VerdictSource::RemoteClassifier,
                ..local
            };
        }

        let categories = response.flagged_categories();
        info!(
            categories = ?categories,
            "Message rejected by remote classifier"
        );

        ModerationVerdict {
            is_clean: false,
            // The provider's output is never trusted for masking
            masked_text: self.filter.mask(text),
            confidence: confidence.min(MAX_FLAGGED_CONFIDENCE),
            source: VerdictSource::RemoteClassifier,
            flagged_categories: categories,
            ..local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(ClassifierResponse);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _text: &str) -> Result<ClassifierResponse, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = ModerationConfig {
            remote_enabled: true,
            ..ModerationConfig::default()
        };
        assert!(Moderator::from_config(ContentFilter::default(), &config).is_err());
    }

    #[test]
    fn from_config_disabled_is_local_only() {
        let m = Moderator::from_config(ContentFilter::default(), &ModerationConfig::default())
            .unwrap();
        assert!(!m.remote_enabled());
    }

    #[tokio::test]
    async fn flagged_confidence_is_capped() {
        let response = ClassifierResponse {
            flagged: true,
            categories: [("harassment".to_string(), true)].into_iter().collect(),
            category_scores: [("harassment".to_string(), 0.05)].into_iter().collect(),
        };
        let m = Moderator::with_classifier(
            ContentFilter::default(),
            Arc::new(Fixed(response)),
            Duration::from_secs(1),
        );
        let v = m.moderate("you are not welcome here").await;
        assert!(!v.is_clean);
        assert!((v.confidence - MAX_FLAGGED_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(v.masked_text, "you are not welcome here");
        assert_eq!(v.flagged_categories, vec!["harassment".to_string()]);
    }

    #[tokio::test]
    async fn short_messages_skip_remote() {
        let m = Moderator::with_classifier(
            ContentFilter::default(),
            Arc::new(Fixed(ClassifierResponse {
                flagged: true,
                ..ClassifierResponse::default()
            })),
            Duration::from_secs(1),
        );
        let v = m.moderate("ok").await;
        assert!(v.is_clean);
        assert_eq!(v.source, VerdictSource::LocalFast);
    }
}
