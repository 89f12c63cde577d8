// Unit tests for report building and language detection.
//
// Tests Severity::from_confidence boundary conditions, the recommendations
// attached to real filter verdicts, and script detection on mixed input.

use chatguard::filter::{detect_language, ContentFilter};
use chatguard::moderation::{build_report, Severity};
use chatguard::verdict::Language;

// ============================================================
// Severity::from_confidence: boundary conditions
// ============================================================

#[test]
fn severity_exact_boundary_medium() {
    assert_eq!(Severity::from_confidence(0.3), Severity::Medium);
}

#[test]
fn severity_just_below_medium() {
    assert_eq!(Severity::from_confidence(0.299), Severity::High);
}

#[test]
fn severity_exact_boundary_low() {
    assert_eq!(Severity::from_confidence(0.7), Severity::Low);
}

#[test]
fn severity_just_below_low() {
    assert_eq!(Severity::from_confidence(0.699), Severity::Medium);
}

#[test]
fn severity_extremes() {
    assert_eq!(Severity::from_confidence(0.0), Severity::High);
    assert_eq!(Severity::from_confidence(1.0), Severity::Low);
}

// ============================================================
// Reports from real verdicts
// ============================================================

#[test]
fn clean_message_needs_no_action() {
    let report = build_report(&ContentFilter::default().scan("see you at five"));
    assert!(report.is_clean);
    assert_eq!(report.severity, Severity::Low);
    assert_eq!(report.recommendations, vec!["No action needed.".to_string()]);
    assert_eq!(report.masked_text, "see you at five");
}

#[test]
fn single_strong_term_is_medium() {
    let report = build_report(&ContentFilter::default().scan("You are a chutiya"));
    assert!(!report.is_clean);
    assert_eq!(report.severity, Severity::Medium);
    assert_eq!(report.matched_terms, vec!["chutiya".to_string()]);
    assert_eq!(report.language, Language::En);
}

#[test]
fn stacked_abuse_is_high() {
    let report = build_report(&ContentFilter::default().scan("fuck you, chutiya, f u c k"));
    assert_eq!(report.severity, Severity::High);
    assert!(report.recommendations.len() >= 2);
}

#[test]
fn spam_gets_a_spam_hint() {
    let report = build_report(&ContentFilter::default().scan("spam spam spam spam spam"));
    assert!(!report.is_clean);
    assert!(report.matched_terms.is_empty());
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("repeating")));
}

#[test]
fn hindi_report_carries_localized_hint() {
    let report = build_report(&ContentFilter::default().scan("तू चूतिया है"));
    assert_eq!(report.language, Language::Hi);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("आपत्तिजनक")));
}

#[test]
fn gujarati_report_carries_localized_hint() {
    let report = build_report(&ContentFilter::default().scan("તું ચુતિયા છે"));
    assert_eq!(report.language, Language::Gu);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("વાંધાજનક")));
}

#[test]
fn report_serializes_with_lowercase_tags() {
    let report = build_report(&ContentFilter::default().scan("You are a chutiya"));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["severity"], "medium");
    assert_eq!(json["language"], "en");
    assert_eq!(json["source"], "local-lexicon");
}

// ============================================================
// Language detection
// ============================================================

#[test]
fn romanized_hindi_reads_as_english() {
    assert_eq!(detect_language("kya haal hai bhai"), Language::En);
}

#[test]
fn devanagari_is_hindi() {
    assert_eq!(detect_language("आप कैसे हैं?"), Language::Hi);
}

#[test]
fn gujarati_script_is_gujarati() {
    assert_eq!(detect_language("તમે કેમ છો?"), Language::Gu);
}

#[test]
fn emoji_and_digits_do_not_count() {
    assert_eq!(detect_language("😀😀😀 123 नमस्ते"), Language::Hi);
}
