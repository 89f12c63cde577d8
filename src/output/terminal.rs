// Colored terminal output for moderation reports and send status.
//
// main.rs display code delegates here so the CLI subcommands share one look.

use colored::Colorize;

use crate::moderation::{ModerationReport, Severity};
use crate::pipeline::OutgoingMessage;
use crate::ratelimit::SendStatus;
use crate::verdict::{Language, ModerationVerdict};

/// Display a moderation report.
pub fn display_report(text: &str, report: &ModerationReport) {
    println!(
        "\n{}",
        format!("=== Moderation: \"{}\" ===", super::truncate_chars(text, 60)).bold()
    );

    let status = if report.is_clean {
        "clean".green().bold()
    } else {
        "flagged".red().bold()
    };
    println!(
        "  Status: {}  |  Severity: {}  |  Confidence: {:.2}",
        status,
        colorize_severity(report.severity),
        report.confidence
    );
    println!(
        "  Language: {}  |  Source: {}",
        language_name(report.language),
        report.source
    );

    if !report.is_clean {
        println!("  Masked: {}", report.masked_text.yellow());
    }
    if !report.matched_terms.is_empty() {
        println!("  Matched: {}", report.matched_terms.join(", ").dimmed());
    }
    if !report.flagged_categories.is_empty() {
        println!(
            "  Categories: {}",
            report.flagged_categories.join(", ").dimmed()
        );
    }

    if !report.recommendations.is_empty() {
        println!("\n  Recommendations:");
        for line in &report.recommendations {
            println!("    - {line}");
        }
    }
    println!();
}

/// Display the raw local-filter verdict, including which checks fired.
pub fn display_verdict(text: &str, verdict: &ModerationVerdict) {
    let marker = if verdict.is_clean {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "  {} {:<40} {}",
        marker,
        super::truncate_chars(text, 40),
        verdict.masked_text.dimmed()
    );

    if verdict.is_clean {
        return;
    }
    let flags: Vec<String> = verdict
        .flags
        .iter()
        .map(|f| format!("{f:?}"))
        .collect();
    println!(
        "      confidence {:.2}  flags [{}]  terms [{}]",
        verdict.confidence,
        flags.join(", "),
        verdict
            .matched_terms
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
}

/// One line summary of an identity's send gate.
pub fn display_status(identity: &str, status: &SendStatus) {
    let gate = if status.can_send {
        "open".green()
    } else {
        format!("blocked {}s", status.cooldown_seconds).red().bold()
    };
    let pace = if status.rapid {
        "rapid".yellow().to_string()
    } else {
        "normal".normal().to_string()
    };
    println!(
        "  {:<16} gate: {}  |  remaining burst: {}  |  pace: {}",
        identity, gate, status.remaining, pace
    );
}

/// Confirmation line for a dispatched message.
pub fn display_sent(message: &OutgoingMessage) {
    println!(
        "  {} [{}] {}: {}",
        "sent".green(),
        message.sent_at.format("%H:%M:%S"),
        message.identity.bold(),
        message.text
    );
}

/// Human-readable language name.
pub fn language_name(language: Language) -> &'static str {
    match language {
        Language::En => "English",
        Language::Hi => "Hindi",
        Language::Gu => "Gujarati",
    }
}

/// Colorize a severity tier.
pub fn colorize_severity(severity: Severity) -> colored::ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::High => label.red().bold(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.green(),
    }
}
