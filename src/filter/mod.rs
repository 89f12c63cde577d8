// Local content filtering: lexicon, obfuscation patterns, masking and
// script-based language detection. Runs synchronously with no network.

pub mod content;
pub mod language;
pub mod lexicon;
pub mod patterns;

pub use content::{ContentFilter, FilterConfig};
pub use language::detect_language;
pub use lexicon::{Lexicon, LexiconDetection, LexiconEntry, LexiconHit, Locale, TermSeverity};
