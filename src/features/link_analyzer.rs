use crate::content::Link;
use crate::domain_utils::DomainUtils;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ANCHOR: Regex =
        Regex::new(r#"(?s)<[aA][^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</[aA]>"#).unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// A link whose domain-shaped text names a different domain than its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMismatch {
    pub display_text: String,
    pub display_domain: String,
    pub destination_domain: String,
}

#[derive(Debug, Clone, Default)]
pub struct LinkAnalyzer;

impl LinkAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Links whose display text is domain-shaped and disagrees with the
    /// destination. Descriptive text ("Click here") and relative
    /// destinations are never compared.
    pub fn mismatches(&self, links: &[Link]) -> Vec<LinkMismatch> {
        links
            .iter()
            .filter(|link| DomainUtils::looks_like_domain_token(&link.display_text))
            .filter_map(|link| {
                let display_domain = DomainUtils::canonical_domain(&link.display_text);
                let destination_domain = DomainUtils::destination_domain(&link.destination_url)?;
                if display_domain != destination_domain {
                    log::debug!(
                        "Link text '{}' points to {}",
                        link.display_text,
                        destination_domain
                    );
                    Some(LinkMismatch {
                        display_text: link.display_text.trim().to_string(),
                        display_domain,
                        destination_domain,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn count_mismatches(&self, links: &[Link]) -> u32 {
        self.mismatches(links).len() as u32
    }

    /// Pull `<a href>` anchors out of an HTML fragment, for content sources
    /// that hand over markup instead of a link list.
    pub fn extract_links(&self, html: &str) -> Vec<Link> {
        let decoded = Self::decode_html_entities(html);
        ANCHOR
            .captures_iter(&decoded)
            .filter_map(|cap| {
                let href = cap.get(1)?.as_str().trim();
                let text = TAG.replace_all(cap.get(2)?.as_str(), "");
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if href.is_empty() {
                    None
                } else {
                    Some(Link::new(text, href))
                }
            })
            .collect()
    }

    fn decode_html_entities(text: &str) -> String {
        let entities = [
            ("&#46;", "."),
            ("&#47;", "/"),
            ("&#58;", ":"),
            ("&quot;", "\""),
            ("&#39;", "'"),
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&nbsp;", " "),
            ("&amp;", "&"),
        ];

        let mut decoded = text.to_string();
        for (entity, replacement) in &entities {
            decoded = decoded.replace(entity, replacement);
        }
        decoded
    }
}
