use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

const HOSTLESS_SCHEMES: [&str; 4] = ["mailto:", "javascript:", "tel:", "data:"];

lazy_static! {
    static ref DOMAIN_TOKEN: Regex =
        Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$").unwrap();
}

/// Minimal domain hierarchy utilities
pub struct DomainUtils;

impl DomainUtils {
    /// Extract domain from email address
    pub fn extract_domain(email: &str) -> Option<String> {
        let domain = email.rsplit_once('@')?.1.trim().trim_end_matches('>');
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_lowercase())
        }
    }

    /// Check if domain matches any in list (with hierarchy support)
    pub fn matches_domain_list(domain: &str, domain_list: &[String]) -> bool {
        let domain_lower = domain.to_lowercase();

        for pattern in domain_list {
            let pattern_lower = pattern.to_lowercase();

            // Exact match
            if domain_lower == pattern_lower {
                return true;
            }

            // Subdomain match (domain ends with .pattern)
            if domain_lower.ends_with(&format!(".{}", pattern_lower)) {
                return true;
            }
        }

        false
    }

    /// Canonicalize domain (remove www prefix)
    pub fn canonicalize_domain(domain: &str) -> String {
        let domain_lower = domain.to_lowercase();
        if let Some(stripped) = domain_lower.strip_prefix("www.") {
            stripped.to_string()
        } else {
            domain_lower
        }
    }

    /// Reduce a URL, bare host or host-with-path to its canonical domain.
    ///
    /// Never fails: input without a host of its own comes back lower-cased
    /// as-is.
    pub fn canonical_domain(input: &str) -> String {
        Self::destination_domain(input).unwrap_or_else(|| input.trim().to_lowercase())
    }

    /// Canonical domain a URL or bare host points at. `None` for relative
    /// references (`/login`, `#top`, `?q=1`), host-less schemes (`mailto:`)
    /// and anything that does not parse.
    pub fn destination_domain(input: &str) -> Option<String> {
        let trimmed = input.trim();
        let lower = trimmed.to_lowercase();
        let candidate = if trimmed.starts_with("//") {
            format!("http:{}", trimmed)
        } else if trimmed.contains("://") {
            trimmed.to_string()
        } else if trimmed.is_empty()
            || trimmed.starts_with(|c: char| matches!(c, '/' | '#' | '?' | '.'))
            || HOSTLESS_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
        {
            return None;
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&candidate).ok()?;
        match url.host_str() {
            Some(host) if !host.is_empty() => Some(Self::canonicalize_domain(host)),
            _ => None,
        }
    }

    /// Levenshtein distance over characters
    pub fn edit_distance(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() {
            return b.len();
        }
        if b.is_empty() {
            return a.len();
        }

        let mut prev: Vec<usize> = (0..=b.len()).collect();
        let mut curr = vec![0usize; b.len() + 1];
        for (i, ca) in a.iter().enumerate() {
            curr[0] = i + 1;
            for (j, cb) in b.iter().enumerate() {
                let cost = if ca == cb { 0 } else { 1 };
                curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
            }
            std::mem::swap(&mut prev, &mut curr);
        }
        prev[b.len()]
    }

    /// Whether a text fragment is shaped like a domain name ("bank.com"),
    /// as opposed to prose ("Click here").
    pub fn looks_like_domain_token(text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.len() < 100
            && !trimmed.chars().any(char::is_whitespace)
            && DOMAIN_TOKEN.is_match(trimmed)
    }
}
