// OpenAI-style moderation endpoint.
//
// Request:  {"input": "<text>", "model": "<model id>"}
// Response: {"id": .., "model": .., "results": [{"flagged": bool,
//            "categories": {name: bool}, "category_scores": {name: float}}]}
//
// Any transport failure, non-2xx status or unexpected body shape becomes a
// ClassifierError; the orchestrator decides what to do with it.
//
// API docs: https://platform.openai.com/docs/api-reference/moderations

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::throttle::Throttle;
use super::traits::{Classifier, ClassifierError, ClassifierResponse};
use crate::output::truncate_chars;

pub const DEFAULT_MODERATION_URL: &str = "https://api.openai.com/v1/moderations";
pub const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";

/// Remote classifier speaking the OpenAI moderation contract.
pub struct OpenAiModerationClassifier {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    throttle: Throttle,
}

impl OpenAiModerationClassifier {
    /// Build a classifier whose HTTP requests give up after `timeout`.
    pub fn new(
        url: &str,
        api_key: String,
        model: &str,
        timeout: Duration,
        requests_per_second: f64,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chatguard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            api_key,
            model: model.to_string(),
            throttle: Throttle::new(requests_per_second),
        })
    }
}

#[async_trait]
impl Classifier for OpenAiModerationClassifier {
    async fn classify(&self, text: &str) -> Result<ClassifierResponse, ClassifierError> {
        self.throttle.acquire().await;

        let request = ModerationRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, 200),
            });
        }

        let body = response.text().await?;
        let result = parse_response(&body)?;

        debug!(
            flagged = result.flagged,
            max_score = result.max_score(),
            text_preview = %truncate_chars(text, 40),
            "Classified message"
        );

        Ok(result)
    }

    fn name(&self) -> &str {
        "openai-moderation"
    }
}

/// Decode and validate a moderation response body.
pub fn parse_response(body: &str) -> Result<ClassifierResponse, ClassifierError> {
    let parsed: ModerationResponse =
        serde_json::from_str(body).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

    let first = parsed
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ClassifierError::Malformed("response has no results".to_string()))?;

    ClassifierResponse {
        flagged: first.flagged,
        categories: first.categories,
        category_scores: first.category_scores,
    }
    .validate()
}

// --- Moderation API request/response types ---

#[derive(Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ModerationResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationResult {
    pub flagged: bool,
    #[serde(default)]
    pub categories: HashMap<String, bool>,
    #[serde(default)]
    pub category_scores: HashMap<String, f64>,
}
