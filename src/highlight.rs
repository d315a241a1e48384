//! Marking fishy phrases inside the scanned text.

use regex::{Regex, RegexBuilder};
use std::ops::Range;

/// Case-insensitive, word-bounded alternation over a set of phrases.
#[derive(Debug, Clone)]
pub struct HighlightPattern {
    regex: Regex,
}

impl HighlightPattern {
    /// Returns `None` when there is nothing to highlight.
    pub fn new(phrases: &[String]) -> Option<Self> {
        let mut trimmed: Vec<&str> = phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if trimmed.is_empty() {
            return None;
        }
        // Longest first so overlapping phrases prefer the fuller match
        trimmed.sort_by_key(|p| std::cmp::Reverse(p.len()));
        trimmed.dedup();

        let alternatives: Vec<String> = trimmed.into_iter().map(bounded).collect();
        let pattern = alternatives.join("|");
        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(regex) => Some(Self { regex }),
            Err(e) => {
                log::warn!("Unable to build highlight pattern: {}", e);
                None
            }
        }
    }

    /// Byte ranges of every match in `text`, in order.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        self.regex.find_iter(text).map(|m| m.range()).collect()
    }

    /// Wrap every match in `open`/`close`.
    pub fn mark(&self, text: &str, open: &str, close: &str) -> String {
        self.regex
            .replace_all(text, |caps: &regex::Captures| {
                format!("{}{}{}", open, &caps[0], close)
            })
            .into_owned()
    }
}

/// Word boundaries only make sense next to word characters.
fn bounded(phrase: &str) -> String {
    let is_word = |c: Option<char>| c.map_or(false, |c| c.is_alphanumeric() || c == '_');
    format!(
        "{}{}{}",
        if is_word(phrase.chars().next()) { r"\b" } else { "" },
        regex::escape(phrase),
        if is_word(phrase.chars().last()) { r"\b" } else { "" }
    )
}
