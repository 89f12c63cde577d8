// UI-facing moderation report.
//
// Severity and recommendations are derived purely for display; nothing in
// the send path branches on them.

use serde::{Deserialize, Serialize};

use crate::verdict::{FilterFlag, Language, ModerationVerdict, VerdictSource};

/// Coarse display tier derived from verdict confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// High below 0.3 confidence, Medium below 0.7, otherwise Low.
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence {
            c if c < 0.3 => Severity::High,
            c if c < 0.7 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the caller gets back from moderation. The caller alone decides
/// whether to transmit, ask for edits, or offer the masked text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationReport {
    pub is_clean: bool,
    pub masked_text: String,
    pub severity: Severity,
    pub language: Language,
    pub confidence: f64,
    pub source: VerdictSource,
    pub matched_terms: Vec<String>,
    pub flagged_categories: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Project a verdict into a report with severity and display hints.
pub fn build_report(verdict: &ModerationVerdict) -> ModerationReport {
    let severity = Severity::from_confidence(verdict.confidence);

    ModerationReport {
        is_clean: verdict.is_clean,
        masked_text: verdict.masked_text.clone(),
        severity,
        language: verdict.detected_language,
        confidence: verdict.confidence,
        source: verdict.source,
        matched_terms: verdict.matched_terms.iter().cloned().collect(),
        flagged_categories: verdict.flagged_categories.clone(),
        recommendations: recommendations(verdict, severity),
    }
}

fn recommendations(verdict: &ModerationVerdict, severity: Severity) -> Vec<String> {
    let mut out = Vec::new();

    match (verdict.is_clean, severity) {
        (true, Severity::Low) => out.push("No action needed.".to_string()),
        (true, _) => out.push(
            "Accepted, but close to the moderation threshold. Consider rephrasing.".to_string(),
        ),
        (false, Severity::Low) => out.push(
            "Minor issue detected. Review the highlighted words before sending.".to_string(),
        ),
        (false, Severity::Medium) => out.push(
            "Offensive language detected. Edit the message or send the masked version."
                .to_string(),
        ),
        (false, Severity::High) => {
            out.push(
                "Severe or repeated abuse detected. \
                 Sending the masked version is strongly recommended."
                    .to_string(),
            );
            out.push("Repeated violations can lead to a temporary send block.".to_string());
        }
    }

    if verdict.is_clean {
        return out;
    }

    if verdict
        .flags
        .iter()
        .any(|f| matches!(f, FilterFlag::RepeatedToken | FilterFlag::CharacterRun))
    {
        out.push("Avoid repeating words or characters; it reads as spam.".to_string());
    }

    match verdict.detected_language {
        Language::Hi => out.push("संदेश में आपत्तिजनक शब्द हैं। कृपया संदेश बदलें।".to_string()),
        Language::Gu => out.push("સંદેશમાં વાંધાજનક શબ્દો છે. કૃપા કરીને સંદેશ બદલો.".to_string()),
        Language::En => {}
    }

    if !verdict.flagged_categories.is_empty() {
        out.push(format!(
            "Flagged for: {}.",
            verdict.flagged_categories.join(", ")
        ));
    }

    out
}
