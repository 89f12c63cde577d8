// Local content filter: the synchronous, zero-network moderation layer.
//
// A scan runs up to three passes over a message:
//   1. exact lexicon terms (the lexicon's own token detection, plus
//      word-boundary regexes for phrases and plurals),
//   2. obfuscation patterns (spaced, punctuated, stretched, leetspeak,
//      character runs),
//   3. a repeated-token spam heuristic,
// then masks every flagged span with a placeholder character. Masking is
// length-preserving (in chars) and leaves whitespace and unflagged text
// untouched. The masked text is rescanned until it comes back unchanged,
// so a masked message never trips the filter again.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::debug;

use super::language::detect_language;
use super::lexicon::{is_edge_punctuation, Lexicon};
use super::patterns::{has_inner_letter, is_token_edge, tokens, CompiledPatterns, Hit};
use crate::output::truncate_chars;
use crate::verdict::{FilterFlag, ModerationVerdict, VerdictSource};

/// Confidence deducted per distinct obfuscated root.
const OBFUSCATION_PENALTY: f64 = 0.4;
/// Confidence deducted per spam heuristic that fired.
const SPAM_PENALTY: f64 = 0.25;

/// Tunables for the local filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterConfig {
    /// Messages with fewer characters are passed without scanning (default 3)
    pub min_scan_len: usize,
    /// Run the obfuscation patterns even when the exact pass already hit
    pub always_pattern_pass: bool,
    /// A token may appear this many times before it counts as spam (default 4)
    pub max_token_repeats: usize,
    /// Only tokens longer than this count toward the repeat heuristic (default 3)
    pub repeat_min_token_len: usize,
    /// Longest allowed run of one letter or digit (default 7, 0 disables)
    pub max_char_run: usize,
    /// Character written over flagged spans
    pub placeholder: char,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_scan_len: 3,
            always_pattern_pass: true,
            max_token_repeats: 4,
            repeat_min_token_len: 3,
            max_char_run: 7,
            placeholder: '*',
        }
    }
}

/// Lexicon-based content filter. Owns its lexicon and a lazily compiled
/// pattern set; independent instances share nothing.
pub struct ContentFilter {
    config: FilterConfig,
    lexicon: Lexicon,
    patterns: OnceCell<CompiledPatterns>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default(), Lexicon::default())
    }
}

impl ContentFilter {
    pub fn new(config: FilterConfig, lexicon: Lexicon) -> Self {
        Self {
            config,
            lexicon,
            patterns: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Compile the pattern set now instead of on the first scan.
    pub fn warm_up(&self) {
        self.patterns();
    }

    fn patterns(&self) -> &CompiledPatterns {
        self.patterns.get_or_init(|| {
            CompiledPatterns::compile(&self.lexicon, self.config.max_char_run)
        })
    }

    /// Scan a message and produce a verdict with a masked rendition.
    pub fn scan(&self, text: &str) -> ModerationVerdict {
        let language = detect_language(text);

        if text.chars().count() < self.config.min_scan_len {
            return ModerationVerdict::clean(text, language, VerdictSource::LocalFast);
        }

        let mut hits = self.collect_hits(text);
        if hits.is_empty() {
            return ModerationVerdict::clean(text, language, VerdictSource::LocalLexicon);
        }

        // Masking a span can leave a banned word standing on its own
        // ("aaaaaaaaaafuck"), so rescan the masked text until it settles.
        // Each round adds placeholders, which bounds the loop.
        let mut masked_text = apply_mask(text, &hits, self.config.placeholder);
        loop {
            let more = self.collect_hits(&masked_text);
            let next = apply_mask(&masked_text, &more, self.config.placeholder);
            if next == masked_text {
                break;
            }
            hits.extend(more);
            masked_text = next;
        }

        let matched_terms: BTreeSet<String> =
            hits.iter().filter_map(|h| h.term.clone()).collect();
        let flags: BTreeSet<FilterFlag> = hits.iter().map(|h| h.flag).collect();
        let confidence = self.confidence(&hits);

        debug!(
            terms = ?matched_terms,
            flags = ?flags,
            confidence,
            text_preview = %truncate_chars(text, 40),
            "Local filter flagged message"
        );

        ModerationVerdict {
            is_clean: false,
            matched_terms,
            masked_text,
            confidence,
            detected_language: language,
            source: VerdictSource::LocalLexicon,
            flags,
            flagged_categories: Vec::new(),
        }
    }

    /// The display-safe rendition of `text` (identical to it when clean).
    pub fn mask(&self, text: &str) -> String {
        self.scan(text).masked_text
    }

    /// Every pass over one rendition of the text. Spans are byte offsets
    /// into `text`.
    fn collect_hits(&self, text: &str) -> Vec<Hit> {
        let mut hits = Vec::new();
        self.exact_pass(text, &mut hits);
        if hits.is_empty() || self.config.always_pattern_pass {
            self.pattern_pass(text, &mut hits);
        }
        self.repetition_pass(text, &mut hits);
        hits
    }

    /// Plain lexicon hits. Whole tokens come from the lexicon's own
    /// detection in every script; the compiled word-boundary patterns add
    /// multi-word terms and plurals. Whitelisted spellings never make it
    /// into the compiled patterns, and whitelisted words are skipped
    /// outright.
    fn exact_pass(&self, text: &str, hits: &mut Vec<Hit>) {
        hits.extend(self.lexicon.detect(text).hits.into_iter().map(|h| Hit {
            flag: FilterFlag::Lexicon,
            term: Some(h.term),
            start: h.start,
            end: h.end,
        }));

        let entries = self.lexicon.entries();

        for pattern in &self.patterns().terms {
            let term = &entries[pattern.entry].term;
            for m in pattern.regex.find_iter(text) {
                let seen = hits.iter().any(|h| h.start == m.start() && h.end == m.end());
                if seen || self.lexicon.is_whitelisted(m.as_str()) {
                    continue;
                }
                hits.push(Hit {
                    flag: FilterFlag::Lexicon,
                    term: Some(term.clone()),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
    }

    /// Obfuscated spellings of lexicon roots, and runaway character runs.
    fn pattern_pass(&self, text: &str, hits: &mut Vec<Hit>) {
        let patterns = self.patterns();

        for root in &patterns.roots {
            for (flag, regex) in [
                (FilterFlag::SpacedLetters, &root.spaced),
                (FilterFlag::PunctuatedLetters, &root.punctuated),
            ] {
                for m in regex.find_iter(text) {
                    hits.push(Hit {
                        flag,
                        term: Some(root.root.clone()),
                        start: m.start(),
                        end: m.end(),
                    });
                }
            }
        }

        for token in tokens(text, is_token_edge) {
            let word = token.core.trim_matches(|c: char| !c.is_alphanumeric());
            if self.lexicon.is_whitelisted(word) {
                continue;
            }
            if let Some(hit) = token_obfuscation(patterns, token.core, token.start) {
                hits.push(hit);
            }
        }

        // A run hit covers its whole token, so no word is left half masked.
        if let Some(run) = &patterns.char_run {
            let words = tokens(text, is_edge_punctuation);
            for m in run.find_iter(text) {
                let (start, end) = words
                    .iter()
                    .find(|w| w.start <= m.start() && m.start() < w.end())
                    .map_or((m.start(), m.end()), |w| {
                        (w.start.min(m.start()), w.end().max(m.end()))
                    });
                hits.push(Hit {
                    flag: FilterFlag::CharacterRun,
                    term: None,
                    start,
                    end,
                });
            }
        }
    }

    /// Flag every occurrence of a token repeated more than the limit.
    fn repetition_pass(&self, text: &str, hits: &mut Vec<Hit>) {
        if self.config.max_token_repeats == 0 {
            return;
        }

        let mut seen: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
        for token in tokens(text, is_edge_punctuation) {
            if token.core.chars().count() <= self.config.repeat_min_token_len
                || token.core.contains(self.config.placeholder)
                || !token.core.chars().any(char::is_alphanumeric)
            {
                continue;
            }
            seen.entry(token.core.to_lowercase())
                .or_default()
                .push((token.start, token.end()));
        }

        for spans in seen.values() {
            if spans.len() > self.config.max_token_repeats {
                hits.extend(spans.iter().map(|&(start, end)| Hit {
                    flag: FilterFlag::RepeatedToken,
                    term: None,
                    start,
                    end,
                }));
            }
        }
    }

    fn confidence(&self, hits: &[Hit]) -> f64 {
        let mut penalty = 0.0;

        let lexicon_terms: BTreeSet<&str> = hits
            .iter()
            .filter(|h| h.flag == FilterFlag::Lexicon)
            .filter_map(|h| h.term.as_deref())
            .collect();
        for term in lexicon_terms {
            penalty += self
                .lexicon
                .entry_for(term)
                .map_or(OBFUSCATION_PENALTY, |e| e.severity.penalty());
        }

        let obfuscated: BTreeSet<(FilterFlag, &str)> = hits
            .iter()
            .filter(|h| h.flag != FilterFlag::Lexicon)
            .filter_map(|h| h.term.as_deref().map(|t| (h.flag, t)))
            .collect();
        penalty += OBFUSCATION_PENALTY * obfuscated.len() as f64;

        let spam: BTreeSet<FilterFlag> = hits
            .iter()
            .filter(|h| h.term.is_none())
            .map(|h| h.flag)
            .collect();
        penalty += SPAM_PENALTY * spam.len() as f64;

        (1.0 - penalty).clamp(0.0, 1.0)
    }
}

/// Stretched-letter or leetspeak spelling of a root, as a whole token.
/// Trailing exclamation marks are left unmasked and never stand in for a
/// letter. Plain spellings are left to the exact pass.
fn token_obfuscation(patterns: &CompiledPatterns, core: &str, offset: usize) -> Option<Hit> {
    let candidate = core.trim_end_matches('!');
    for root in &patterns.roots {
        if let Some(m) = root.stretched.captures(candidate).and_then(|c| c.get(1)) {
            if m.as_str().len() > root.root.len() {
                return Some(Hit {
                    flag: FilterFlag::Stretched,
                    term: Some(root.root.clone()),
                    start: offset + m.start(),
                    end: offset + m.end(),
                });
            }
        }
        if let Some(m) = root.leet.captures(candidate).and_then(|c| c.get(1)) {
            if !m.as_str().eq_ignore_ascii_case(&root.root) && has_inner_letter(m.as_str()) {
                return Some(Hit {
                    flag: FilterFlag::Leetspeak,
                    term: Some(root.root.clone()),
                    start: offset + m.start(),
                    end: offset + m.end(),
                });
            }
        }
    }
    None
}

/// Overwrite every non-whitespace char inside a hit with `placeholder`.
fn apply_mask(text: &str, hits: &[Hit], placeholder: char) -> String {
    text.char_indices()
        .map(|(i, c)| {
            let flagged = hits.iter().any(|h| h.start <= i && i < h.end);
            if flagged && !c.is_whitespace() {
                placeholder
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{LexiconEntry, Locale, TermSeverity};

    #[test]
    fn mask_preserves_whitespace_and_neighbours() {
        let hits = vec![Hit {
            flag: FilterFlag::SpacedLetters,
            term: None,
            start: 0,
            end: 7,
        }];
        assert_eq!(apply_mask("f u c k this", &hits, '#'), "# # # # this");
    }

    #[test]
    fn patterns_compile_once() {
        let filter = ContentFilter::default();
        assert!(filter.patterns.get().is_none());
        filter.warm_up();
        let first = filter.patterns.get().map(|p| p as *const CompiledPatterns);
        filter.scan("hello there");
        let second = filter.patterns.get().map(|p| p as *const CompiledPatterns);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn instances_are_independent() {
        let mut custom = Lexicon::empty();
        custom.add_terms(Locale::English, TermSeverity::Strong, ["zorp"]);
        let a = ContentFilter::new(FilterConfig::default(), custom);
        let b = ContentFilter::default();
        assert!(!a.scan("you zorp").is_clean);
        assert!(b.scan("you zorp").is_clean);
    }

    #[test]
    fn whitelisted_spelling_never_matches() {
        let lexicon = Lexicon::new(
            vec![LexiconEntry::new("lass", &[], Locale::English, TermSeverity::Mild)],
            ["lass"],
        );
        let filter = ContentFilter::new(FilterConfig::default(), lexicon);
        assert!(filter.scan("hello lass").is_clean);
    }

    #[test]
    fn exact_pass_alone_when_pattern_pass_is_conditional() {
        let config = FilterConfig {
            always_pattern_pass: false,
            ..FilterConfig::default()
        };
        let filter = ContentFilter::new(config, Lexicon::default());
        assert_eq!(
            filter.collect_hits("shit and $h1t"),
            vec![Hit {
                flag: FilterFlag::Lexicon,
                term: Some("shit".to_string()),
                start: 0,
                end: 4,
            }]
        );

        // The settling rescan still catches what the first round skipped.
        let v = filter.scan("shit and $h1t");
        assert_eq!(v.masked_text, "**** and ****");
        assert_eq!(
            v.flags,
            BTreeSet::from([FilterFlag::Lexicon, FilterFlag::Leetspeak])
        );
    }

    #[test]
    fn exact_pass_uses_lexicon_detection() {
        let filter = ContentFilter::default();
        let text = "तुम चूतिया, you bastard";
        let mut hits = Vec::new();
        filter.exact_pass(text, &mut hits);

        let detection = filter.lexicon().detect(text);
        for h in &detection.hits {
            assert!(hits
                .iter()
                .any(|hit| hit.start == h.start && hit.end == h.end));
        }
        let terms: BTreeSet<String> = hits.iter().filter_map(|h| h.term.clone()).collect();
        let words: BTreeSet<String> = detection.words.into_iter().collect();
        assert_eq!(terms, words);
    }

    #[test]
    fn char_run_hit_covers_its_token() {
        let filter = ContentFilter::default();
        let v = filter.scan("aaaaaaaaaafuck ");
        assert_eq!(v.masked_text, "************** ");
        assert!(v.flags.contains(&FilterFlag::CharacterRun));
        assert!(filter.scan(&v.masked_text).is_clean);
    }

    #[test]
    fn masked_text_settles() {
        let filter = ContentFilter::default();
        let v = filter.scan("iiiiiiiiishit 0 shit");
        assert_eq!(v.masked_text, "************* 0 ****");
        assert!(filter.scan(&v.masked_text).is_clean);
        assert_eq!(filter.mask(&v.masked_text), v.masked_text);
    }

    #[test]
    fn confidence_drops_with_more_hits() {
        let filter = ContentFilter::default();
        let one = filter.scan("you are a bastard").confidence;
        let two = filter.scan("bastard and bitch").confidence;
        assert!((one - 0.5).abs() < 1e-9);
        assert!(two < one);
    }
}
