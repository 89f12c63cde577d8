// Locale-partitioned lexicon of disallowed terms plus a unified whitelist.
//
// The lexicon plays the role of a bundled profanity word list: it knows its
// terms, their spelling variants and a whitelist, and can `detect` plain
// word-boundary hits on its own. The content filter layers obfuscation
// patterns and spam heuristics on top of it.
//
// One whitelist is shared by every layer: a whitelisted word is never a hit,
// whether it collides with a lexicon term, a variant, or an obfuscation
// pattern.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::patterns::tokens;

/// Lexicon partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Locale {
    English,
    HindiRomanized,
    GujaratiRomanized,
    HindiDevanagari,
    GujaratiScript,
}

impl Locale {
    /// Native-script locales can't rely on ASCII word boundaries and are
    /// matched token by token instead.
    pub fn is_native_script(&self) -> bool {
        matches!(self, Locale::HindiDevanagari | Locale::GujaratiScript)
    }
}

/// How offensive a term is. Feeds the verdict's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TermSeverity {
    Mild,
    Strong,
}

impl TermSeverity {
    /// Confidence deducted for each distinct hit of this severity.
    pub fn penalty(&self) -> f64 {
        match self {
            TermSeverity::Mild => 0.3,
            TermSeverity::Strong => 0.5,
        }
    }
}

/// A normalized root term plus the surface spellings that mean the same thing.
#[derive(Debug, Clone, Serialize)]
pub struct LexiconEntry {
    pub term: String,
    pub variants: Vec<String>,
    pub locale: Locale,
    pub severity: TermSeverity,
}

impl LexiconEntry {
    pub fn new(term: &str, variants: &[&str], locale: Locale, severity: TermSeverity) -> Self {
        Self {
            term: term.to_lowercase(),
            variants: variants.iter().map(|v| v.to_lowercase()).collect(),
            locale,
            severity,
        }
    }

    /// The root followed by every variant.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.term.as_str()).chain(self.variants.iter().map(String::as_str))
    }
}

/// Plain lexicon hits in a text, as a word-list library would report them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexiconDetection {
    pub is_profane: bool,
    /// Root terms hit, case-folded and deduplicated
    pub words: Vec<String>,
    /// Highest severity among the hits
    pub severity: Option<TermSeverity>,
    /// Every matching token, in text order
    pub hits: Vec<LexiconHit>,
}

/// One whitespace token that is a known spelling of `term`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexiconHit {
    pub term: String,
    /// Byte span of the token with edge punctuation trimmed
    pub start: usize,
    pub end: usize,
}

/// Words that must never be flagged even though they contain, or equal,
/// something on a banned list.
const DEFAULT_WHITELIST: &[&str] = &[
    "assassin", "assassins", "assassinate", "assassination", "assess", "assessment",
    "asset", "assets", "assist", "assistant", "associate", "association", "assume",
    "bass", "brass", "class", "classes", "classic", "classical", "classy", "compass",
    "embassy", "glass", "grass", "lass", "lasso", "mass", "massive", "pass", "passage",
    "passenger", "passion", "passionate", "passive", "password", "cocktail", "cockpit",
    "peacock", "hancock", "dickens", "dickson", "scunthorpe", "shitake", "shiitake",
    "scrap", "scrappy", "cockroach", "hassle", "harass", "sussex",
    // names and places spelled like romanized terms
    "randi", "lund",
];

/// Built-in lexicon packs.
#[rustfmt::skip]
fn default_entries() -> Vec<LexiconEntry> {
    use Locale::*;
    use TermSeverity::*;

    vec![
        // English
        LexiconEntry::new(
            "fuck",
            &["fuk", "fck", "phuck", "fuq", "fuxk", "fucking", "fucker", "fuckin"],
            English,
            Strong,
        ),
        LexiconEntry::new("motherfucker", &["motherfucking", "mofo"], English, Strong),
        LexiconEntry::new("shit", &["sht", "shyt", "bullshit", "shite", "shitty"], English, Strong),
        LexiconEntry::new("bitch", &["biatch", "bich", "beyotch", "bitchy"], English, Strong),
        LexiconEntry::new("cunt", &["kunt"], English, Strong),
        LexiconEntry::new("asshole", &["arsehole", "ashole"], English, Strong),
        LexiconEntry::new("ass", &["arse"], English, Mild),
        LexiconEntry::new("bastard", &["basterd"], English, Strong),
        LexiconEntry::new("dick", &["dik"], English, Mild),
        LexiconEntry::new("slut", &["slutty"], English, Strong),
        LexiconEntry::new("whore", &["hore"], English, Strong),
        LexiconEntry::new("wanker", &["wank"], English, Strong),
        LexiconEntry::new("twat", &[], English, Strong),
        LexiconEntry::new("prick", &[], English, Mild),
        LexiconEntry::new("douche", &["douchebag"], English, Mild),
        LexiconEntry::new("crap", &[], English, Mild),
        LexiconEntry::new("piss", &["pissed"], English, Mild),
        LexiconEntry::new("retard", &["retarded"], English, Strong),
        LexiconEntry::new("jackass", &[], English, Mild),
        LexiconEntry::new("son of a bitch", &["sonofabitch"], English, Strong),
        // Hindi, romanized
        LexiconEntry::new(
            "chutiya",
            &["chutia", "chootiya", "chutiye", "chutiyapa"],
            HindiRomanized,
            Strong,
        ),
        LexiconEntry::new(
            "madarchod",
            &["maderchod", "madarchood", "maadarchod"],
            HindiRomanized,
            Strong,
        ),
        LexiconEntry::new(
            "behenchod",
            &["bhenchod", "benchod", "behnchod", "bhanchod"],
            HindiRomanized,
            Strong,
        ),
        LexiconEntry::new("bhosdike", &["bhosadike", "bhosdiwale", "bsdk"], HindiRomanized, Strong),
        LexiconEntry::new("gandu", &["gaandu"], HindiRomanized, Strong),
        LexiconEntry::new("gaand", &["gand"], HindiRomanized, Strong),
        LexiconEntry::new("randi", &["raandi", "randwa"], HindiRomanized, Strong),
        LexiconEntry::new("lauda", &["lavda", "lawda", "lund"], HindiRomanized, Strong),
        LexiconEntry::new("harami", &["haraami", "haramkhor"], HindiRomanized, Mild),
        LexiconEntry::new("kamina", &["kamine", "kaminey"], HindiRomanized, Mild),
        LexiconEntry::new("kutta", &["kutte", "kutti", "kuttiya"], HindiRomanized, Mild),
        LexiconEntry::new("teri maa ki", &[], HindiRomanized, Strong),
        // Gujarati, romanized
        LexiconEntry::new("bhosdo", &["bhosda"], GujaratiRomanized, Strong),
        LexiconEntry::new("chodu", &["chodya"], GujaratiRomanized, Strong),
        LexiconEntry::new("lodo", &["lodu"], GujaratiRomanized, Strong),
        LexiconEntry::new("gando", &[], GujaratiRomanized, Mild),
        LexiconEntry::new("gadhedo", &["gadheda"], GujaratiRomanized, Mild),
        LexiconEntry::new("tari maa ni", &[], GujaratiRomanized, Strong),
        // Hindi, Devanagari
        LexiconEntry::new("चूतिया", &["चुतिया", "चूतिये"], HindiDevanagari, Strong),
        LexiconEntry::new("मादरचोद", &[], HindiDevanagari, Strong),
        LexiconEntry::new("भेनचोद", &["बहनचोद"], HindiDevanagari, Strong),
        LexiconEntry::new("भोसड़ीके", &["भोसडीके"], HindiDevanagari, Strong),
        LexiconEntry::new("गांडू", &["गांड"], HindiDevanagari, Strong),
        LexiconEntry::new("रंडी", &[], HindiDevanagari, Strong),
        LexiconEntry::new("हरामी", &[], HindiDevanagari, Mild),
        LexiconEntry::new("कमीना", &["कमीने"], HindiDevanagari, Mild),
        // Gujarati script
        LexiconEntry::new("ચુતિયા", &["ચૂતિયા"], GujaratiScript, Strong),
        LexiconEntry::new("ભોસડો", &["ભોસડા"], GujaratiScript, Strong),
        LexiconEntry::new("લોડો", &["લોડા"], GujaratiScript, Strong),
        LexiconEntry::new("ગાંડુ", &[], GujaratiScript, Strong),
        LexiconEntry::new("રંડી", &[], GujaratiScript, Strong),
        LexiconEntry::new("હરામી", &[], GujaratiScript, Mild),
    ]
}

/// Characters trimmed from the edges of a whitespace token before comparing
/// it against native-script terms or the whitelist.
pub(crate) fn is_edge_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '?' | '!' | '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}'
            | '<' | '>' | '~' | '-' | '।' | '॥'
    )
}

/// The lexicon: terms by locale plus the shared whitelist.
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
    whitelist: HashSet<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(default_entries(), DEFAULT_WHITELIST.iter().copied())
    }
}

impl Lexicon {
    pub fn new<'a>(
        entries: Vec<LexiconEntry>,
        whitelist: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut lexicon = Self {
            entries,
            whitelist: HashSet::new(),
        };
        lexicon.add_whitelist(whitelist);
        lexicon
    }

    /// An empty lexicon (no terms, no whitelist).
    pub fn empty() -> Self {
        Self::new(Vec::new(), std::iter::empty())
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Register extra whitelist words. Case-insensitive.
    pub fn add_whitelist<'a>(&mut self, words: impl IntoIterator<Item = &'a str>) {
        for word in words {
            let word = word.trim().to_lowercase();
            if !word.is_empty() {
                self.whitelist.insert(word);
            }
        }
    }

    /// Register extra root terms (no variants) under a locale.
    pub fn add_terms<'a>(
        &mut self,
        locale: Locale,
        severity: TermSeverity,
        terms: impl IntoIterator<Item = &'a str>,
    ) {
        for term in terms {
            let term = term.trim();
            if !term.is_empty() {
                self.entries.push(LexiconEntry::new(term, &[], locale, severity));
            }
        }
    }

    pub fn is_whitelisted(&self, word: &str) -> bool {
        self.whitelist.contains(&word.to_lowercase())
    }

    /// Entries whose terms contain spaces or are single words, Latin only.
    pub fn latin_entries(&self) -> impl Iterator<Item = &LexiconEntry> {
        self.entries.iter().filter(|e| !e.locale.is_native_script())
    }

    /// Find the entry a spelling (root or variant) belongs to.
    pub fn entry_for(&self, spelling: &str) -> Option<&LexiconEntry> {
        let spelling = spelling.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.spellings().any(|s| s == spelling))
    }

    /// Single-word Latin roots at least `min_len` letters long and not
    /// whitelisted. These seed the obfuscation patterns; variants are left to
    /// the exact pass.
    pub fn obfuscation_roots(&self, min_len: usize) -> BTreeSet<String> {
        self.latin_entries()
            .map(|e| e.term.as_str())
            .filter(|t| !t.contains(' ') && t.chars().all(|c| c.is_ascii_alphabetic()))
            .filter(|t| t.len() >= min_len && !self.whitelist.contains(*t))
            .map(str::to_string)
            .collect()
    }

    /// Plain word-list detection: whitespace tokens, trimmed of edge
    /// punctuation and compared case-insensitively against every spelling.
    /// Multi-word terms and obfuscations are the content filter's job.
    pub fn detect(&self, text: &str) -> LexiconDetection {
        let mut words = BTreeSet::new();
        let mut severity = None;
        let mut hits = Vec::new();

        for token in tokens(text, is_edge_punctuation) {
            let word = token.core.to_lowercase();
            if self.whitelist.contains(&word) {
                continue;
            }
            if let Some(entry) = self.entry_for(&word) {
                words.insert(entry.term.clone());
                severity = severity.max(Some(entry.severity));
                hits.push(LexiconHit {
                    term: entry.term.clone(),
                    start: token.start,
                    end: token.end(),
                });
            }
        }

        LexiconDetection {
            is_profane: !words.is_empty(),
            words: words.into_iter().collect(),
            severity,
            hits,
        }
    }
}
