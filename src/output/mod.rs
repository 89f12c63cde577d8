// Output formatting for the terminal.

pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing (`&text[..40]`), this respects UTF-8 character boundaries
/// and will never panic on Devanagari, Gujarati or emoji.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_chars("namaste", 10), "namaste");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("नमस्ते दोस्त", 3), "नमस...");
    }
}
