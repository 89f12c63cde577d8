// Compiled regex battery for lexicon matching and obfuscation detection.
//
// Everything here is built once per ContentFilter from its lexicon and
// config, then reused for every scan. Text-level patterns run against the
// whole message (word-boundary lexicon terms, spaced and punctuated
// spellings, character runs). Token-level patterns are anchored and run
// against one whitespace token at a time, after the whitelist check
// (stretched letters, leetspeak).

use regex_lite::Regex;
use tracing::{debug, warn};

use super::lexicon::{Lexicon, LexiconEntry};
use crate::verdict::FilterFlag;

/// Obfuscation roots shorter than this produce too many accidental hits.
const MIN_ROOT_LEN: usize = 3;

/// Separators accepted between letters of a punctuated spelling ("f.u.c.k").
const SEPARATORS: &str = r"[._*+~-]+";

/// A span of the original text that a check flagged. Offsets are bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub flag: FilterFlag,
    /// The lexicon root behind the hit, if any
    pub term: Option<String>,
    pub start: usize,
    pub end: usize,
}

/// Word-boundary regex for one Latin lexicon entry (root + variants).
pub(crate) struct TermPattern {
    pub entry: usize,
    pub regex: Regex,
}

/// The obfuscation family of regexes for one root.
pub(crate) struct RootPatterns {
    pub root: String,
    pub spaced: Regex,
    pub punctuated: Regex,
    pub stretched: Regex,
    pub leet: Regex,
}

/// All regexes a ContentFilter needs, compiled together.
pub(crate) struct CompiledPatterns {
    pub terms: Vec<TermPattern>,
    pub roots: Vec<RootPatterns>,
    pub char_run: Option<Regex>,
}

impl CompiledPatterns {
    /// Compile everything for `lexicon`. A pattern that fails to compile is
    /// skipped with a warning rather than taking moderation down.
    pub fn compile(lexicon: &Lexicon, max_char_run: usize) -> Self {
        let terms: Vec<TermPattern> = lexicon
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.locale.is_native_script())
            .filter_map(|(entry, e)| {
                let pattern = term_pattern(e, lexicon)?;
                build(&pattern, &e.term).map(|regex| TermPattern { entry, regex })
            })
            .collect();

        let roots: Vec<RootPatterns> = lexicon
            .obfuscation_roots(MIN_ROOT_LEN)
            .into_iter()
            .filter_map(|root| {
                Some(RootPatterns {
                    spaced: build(&joined(&root, r"\s+"), &root)?,
                    punctuated: build(&joined(&root, SEPARATORS), &root)?,
                    stretched: build(&stretched(&root), &root)?,
                    leet: build(&leet(&root), &root)?,
                    root,
                })
            })
            .collect();

        let char_run = if max_char_run > 0 {
            build(&char_run_pattern(max_char_run), "character run")
        } else {
            None
        };

        debug!(
            terms = terms.len(),
            roots = roots.len(),
            "Compiled moderation patterns"
        );

        Self {
            terms,
            roots,
            char_run,
        }
    }
}

fn build(pattern: &str, label: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(label, error = %e, "Skipping moderation pattern that failed to compile");
            None
        }
    }
}

/// `\b(?:root|variant|..)(?:s|es)?\b`, with multi-word terms allowing any
/// whitespace between words. Whitelisted spellings are left out; an entry
/// with nothing left gets no pattern.
fn term_pattern(entry: &LexiconEntry, lexicon: &Lexicon) -> Option<String> {
    let alternatives: Vec<String> = entry
        .spellings()
        .filter(|s| !lexicon.is_whitelisted(s))
        .map(|s| {
            s.split_whitespace()
                .map(regex_lite::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    Some(format!(r"(?i)\b(?:{})(?:s|es)?\b", alternatives.join("|")))
}

/// Root letters with `sep` between each pair: "f\s+u\s+c\s+k".
fn joined(root: &str, sep: &str) -> String {
    let letters: Vec<String> = root.chars().map(|c| regex_lite::escape(&c.to_string())).collect();
    format!(r"(?i)\b{}\b", letters.join(sep))
}

/// Anchored root where every letter may repeat: "^f+u+c+k+$".
fn stretched(root: &str) -> String {
    let body: String = root
        .chars()
        .map(|c| format!("{}+", regex_lite::escape(&c.to_string())))
        .collect();
    format!("(?i)^({body})$")
}

/// Anchored root where letters may be swapped for look-alike digits and
/// symbols. Callers strip trailing exclamation marks first, so a final `i`
/// never matches punctuation ("haram!").
fn leet(root: &str) -> String {
    let body: String = root.chars().map(leet_class).collect();
    format!("(?i)^({body})$")
}

/// A leet candidate must keep at least one real letter after its first
/// character. "$h1t" qualifies, while "A55" and "4$$" read as model numbers
/// or prices.
pub(crate) fn has_inner_letter(candidate: &str) -> bool {
    candidate.chars().skip(1).any(|c| c.is_ascii_alphabetic())
}

fn leet_class(c: char) -> String {
    let class = match c.to_ascii_lowercase() {
        'a' => "[a4@*]",
        'b' => "[b8]",
        'e' => "[e3*]",
        'g' => "[g9]",
        'i' => "[i1!|*]",
        'l' => "[l1|]",
        'o' => "[o0*]",
        's' => "[s5$]",
        't' => "[t7+]",
        'u' => "[uv*]",
        'z' => "[z2]",
        other => return regex_lite::escape(&other.to_string()),
    };
    class.to_string()
}

/// Any ASCII letter or digit repeated more than `max_run` times in a row.
/// regex-lite has no backreferences, so each character gets its own branch.
fn char_run_pattern(max_run: usize) -> String {
    let min = max_run + 1;
    let branches: Vec<String> = ('a'..='z')
        .chain('0'..='9')
        .map(|c| format!("{c}{{{min},}}"))
        .collect();
    format!("(?i)(?:{})", branches.join("|"))
}

/// A whitespace-separated token with its core (edge punctuation trimmed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub core: &'a str,
    /// Byte offset of `core` in the original text
    pub start: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.core.len()
    }
}

/// Split on whitespace, keeping byte offsets, and trim each token with
/// `trim`. Tokens that trim to nothing are dropped.
pub fn tokens(text: &str, trim: impl Fn(char) -> bool) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut token_start = None;

    let mut push = |from: usize, to: usize| {
        let raw = &text[from..to];
        let lead = raw.len() - raw.trim_start_matches(&trim).len();
        let core = raw.trim_matches(&trim);
        if !core.is_empty() {
            out.push(Token {
                core,
                start: from + lead,
            });
        }
    };

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(from) = token_start.take() {
                push(from, i);
            }
        } else if token_start.is_none() {
            token_start = Some(i);
        }
    }
    if let Some(from) = token_start {
        push(from, text.len());
    }

    out
}

/// Edge characters stripped before token-level obfuscation checks. Leet
/// symbols ($ @ ! * + |) are kept because they can stand in for letters.
pub fn is_token_edge(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '?' | '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>'
            | '~'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Locale, TermSeverity};

    #[test]
    fn term_pattern_handles_variants_and_phrases() {
        let lexicon = Lexicon::default();
        let entry = lexicon.entry_for("son of a bitch").unwrap();
        let re = Regex::new(&term_pattern(entry, &lexicon).unwrap()).unwrap();
        assert!(re.is_match("you son  of a   bitch"));
        assert!(re.is_match("SONOFABITCH"));
        assert!(!re.is_match("sons of anarchy"));
    }

    #[test]
    fn term_pattern_respects_word_boundaries() {
        let lexicon = Lexicon::empty();
        let entry = LexiconEntry::new("ass", &[], Locale::English, TermSeverity::Mild);
        let re = Regex::new(&term_pattern(&entry, &lexicon).unwrap()).unwrap();
        assert!(re.is_match("kiss my ass"));
        assert!(re.is_match("asses"));
        assert!(!re.is_match("classic"));
        assert!(!re.is_match("assassin"));
        assert!(!re.is_match("grass"));
    }

    #[test]
    fn obfuscation_families() {
        let spaced = Regex::new(&joined("fuck", r"\s+")).unwrap();
        assert!(spaced.is_match("f u c k this"));
        assert!(spaced.is_match("F  U C K"));

        let punctuated = Regex::new(&joined("fuck", SEPARATORS)).unwrap();
        assert!(punctuated.is_match("F.u.C.k off"));
        assert!(punctuated.is_match("f-u-c-k"));
        assert!(!punctuated.is_match("fuck"));

        let stretch = Regex::new(&stretched("shit")).unwrap();
        assert!(stretch.is_match("shiiiiit"));
        assert!(!stretch.is_match("shirt"));

        let l = Regex::new(&leet("shit")).unwrap();
        assert!(l.is_match("$h1t"));
        assert!(l.is_match("5H!T"));
        assert!(!l.is_match("5H!T!!"));
        assert!(!l.is_match("shot"));

        let harami = Regex::new(&leet("harami")).unwrap();
        assert!(!harami.is_match("haram!".trim_end_matches('!')));
    }

    #[test]
    fn leet_candidates_need_an_inner_letter() {
        assert!(has_inner_letter("$h1t"));
        assert!(has_inner_letter("@ss"));
        assert!(!has_inner_letter("A55"));
        assert!(!has_inner_letter("4$$"));
    }

    #[test]
    fn char_run_threshold() {
        let re = Regex::new(&char_run_pattern(7)).unwrap();
        assert!(!re.is_match("aaaaaaa"));
        assert!(re.is_match("aaaaaaaa"));
        assert!(re.is_match("nooooOOOOooo"));
        assert!(!re.is_match("********"));
    }

    #[test]
    fn tokens_keep_offsets() {
        let text = "  hi, (there)  $h1t!";
        let toks = tokens(text, is_token_edge);
        let cores: Vec<&str> = toks.iter().map(|t| t.core).collect();
        assert_eq!(cores, vec!["hi", "there", "$h1t!"]);
        for t in &toks {
            assert_eq!(&text[t.start..t.end()], t.core);
        }
    }
}

