// Script-based language detection.
//
// No dictionaries or models: count characters per script block and take the
// plurality. Romanized Hindi/Gujarati is Latin script and reports "en".

use crate::verdict::Language;

const DEVANAGARI: std::ops::RangeInclusive<char> = '\u{0900}'..='\u{097F}';
const GUJARATI: std::ops::RangeInclusive<char> = '\u{0A80}'..='\u{0AFF}';

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || (('\u{00C0}'..='\u{024F}').contains(&c) && c.is_alphabetic())
}

/// Per-script character counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptCounts {
    pub latin: usize,
    pub devanagari: usize,
    pub gujarati: usize,
}

impl ScriptCounts {
    pub fn of(text: &str) -> Self {
        text.chars().fold(Self::default(), |mut counts, c| {
            if DEVANAGARI.contains(&c) {
                counts.devanagari += 1;
            } else if GUJARATI.contains(&c) {
                counts.gujarati += 1;
            } else if is_latin_letter(c) {
                counts.latin += 1;
            }
            counts
        })
    }
}

/// The script with a strict plurality wins; ties and empty input are English.
pub fn detect_language(text: &str) -> Language {
    let counts = ScriptCounts::of(text);

    if counts.devanagari > counts.latin && counts.devanagari > counts.gujarati {
        Language::Hi
    } else if counts.gujarati > counts.latin && counts.gujarati > counts.devanagari {
        Language::Gu
    } else {
        Language::En
    }
}
