use super::KeywordHit;

/// Case-insensitive substring scan against a fixed keyword list.
///
/// Matching is containment, not word-bounded: "password" also hits inside
/// "passwords" or "mypassword123".
#[derive(Debug, Clone)]
pub struct KeywordScanner {
    keywords: Vec<String>,
}

impl KeywordScanner {
    pub fn new(keywords: &[String]) -> Self {
        let mut normalized: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    /// Each keyword is reported at most once, in keyword-list order,
    /// regardless of how often it occurs in the text.
    pub fn scan(&self, text: &str) -> KeywordHit {
        let text_lower = text.to_lowercase();
        let phrases = self
            .keywords
            .iter()
            .filter(|keyword| text_lower.contains(keyword.as_str()))
            .cloned()
            .collect();
        KeywordHit::from_phrases(phrases)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}
