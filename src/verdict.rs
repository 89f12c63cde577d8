// Shared moderation types: the verdict every check produces.
//
// These types flow between the lexicon filter, the moderation orchestrator
// and the send pipeline. They're kept separate so the UI-facing report and
// the pipeline can use them without depending on regex or HTTP code.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Locale tag inferred from the dominant script of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Latin script (English and romanized Indian languages)
    En,
    /// Devanagari script
    Hi,
    /// Gujarati script
    Gu,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Gu => "gu",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which check produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictSource {
    /// Short-circuited before any lexicon work (empty or too short)
    LocalFast,
    /// Full local lexicon + pattern scan
    LocalLexicon,
    /// Remote classifier decided
    RemoteClassifier,
    /// Remote classifier failed; the local verdict stands
    Fallback,
}

impl VerdictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictSource::LocalFast => "local-fast",
            VerdictSource::LocalLexicon => "local-lexicon",
            VerdictSource::RemoteClassifier => "remote-classifier",
            VerdictSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Individual local checks that can mark a message unclean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterFlag {
    /// A lexicon term matched at a word boundary
    Lexicon,
    /// Letters of a banned root separated by whitespace ("f u c k")
    SpacedLetters,
    /// Letters of a banned root separated by punctuation ("F.u.C.k")
    PunctuatedLetters,
    /// A banned root with stretched letters ("fuuuuck")
    Stretched,
    /// A banned root spelled with digit/symbol substitutions ("$h1t")
    Leetspeak,
    /// A single character repeated beyond the run-length limit
    CharacterRun,
    /// The same token repeated beyond the repeat limit
    RepeatedToken,
}

/// The outcome of moderating a single message.
///
/// Invariants: `masked_text` always has the same number of characters as the
/// original message, and equals it when `is_clean` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub is_clean: bool,
    /// Distinct lexicon hits, case-folded
    pub matched_terms: BTreeSet<String>,
    pub masked_text: String,
    /// 0.0 to 1.0, where 1.0 means certainly clean
    pub confidence: f64,
    pub detected_language: Language,
    pub source: VerdictSource,
    /// Local checks that fired (empty for clean or remote-only verdicts)
    pub flags: BTreeSet<FilterFlag>,
    /// Categories the remote classifier flagged, if it was consulted
    pub flagged_categories: Vec<String>,
}

impl ModerationVerdict {
    /// A clean verdict that passes the text through untouched.
    pub fn clean(text: &str, language: Language, source: VerdictSource) -> Self {
        Self {
            is_clean: true,
            matched_terms: BTreeSet::new(),
            masked_text: text.to_string(),
            confidence: 1.0,
            detected_language: language,
            source,
            flags: BTreeSet::new(),
            flagged_categories: Vec::new(),
        }
    }

    /// Same verdict, attributed to a different check.
    pub fn with_source(mut self, source: VerdictSource) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_verdict_passes_text_through() {
        let v = ModerationVerdict::clean("hi there", Language::En, VerdictSource::LocalLexicon);
        assert!(v.is_clean);
        assert_eq!(v.masked_text, "hi there");
        assert_eq!(v.confidence, 1.0);
        assert!(v.matched_terms.is_empty());
    }

    #[test]
    fn source_serializes_kebab_case() {
        let json = serde_json::to_string(&VerdictSource::RemoteClassifier).unwrap();
        assert_eq!(json, "\"remote-classifier\"");
        assert_eq!(VerdictSource::LocalFast.to_string(), "local-fast");
    }

    #[test]
    fn language_tags() {
        assert_eq!(Language::En.as_str(), "en");
        assert_eq!(Language::Hi.to_string(), "hi");
        assert_eq!(serde_json::to_string(&Language::Gu).unwrap(), "\"gu\"");
    }
}
