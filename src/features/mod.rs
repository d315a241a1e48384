pub mod brand_impersonation;
pub mod keyword_scanner;
pub mod link_analyzer;

use crate::config::ScannerConfig;
use crate::content::ContentRecord;
use brand_impersonation::BrandImpersonationAnalyzer;
use keyword_scanner::KeywordScanner;
use link_analyzer::LinkAnalyzer;
use serde::{Deserialize, Serialize};

/// Distinct keywords found in a text, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordHit {
    pub count: u32,
    pub phrases: Vec<String>,
}

impl KeywordHit {
    pub fn from_phrases(phrases: Vec<String>) -> Self {
        Self {
            count: phrases.len() as u32,
            phrases,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrandMatch {
    pub flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<usize>,
}

/// Signals that only exist for one kind of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum SourceSignals {
    #[serde(rename_all = "camelCase")]
    Email { sender_domain: String },
    #[serde(rename_all = "camelCase")]
    Website {
        domain: String,
        has_password_form: bool,
    },
}

impl SourceSignals {
    /// Source-specific signals read straight off the record.
    pub fn of(content: &ContentRecord) -> Self {
        match content {
            ContentRecord::Email(email) => SourceSignals::Email {
                sender_domain: email.sender_domain.clone(),
            },
            ContentRecord::Page(page) => SourceSignals::Website {
                domain: page.domain.clone(),
                has_password_form: page.has_password_input,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSet {
    pub urgency_hits: KeywordHit,
    pub financial_hits: KeywordHit,
    pub link_mismatches: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_impersonation: Option<BrandMatch>,
    #[serde(flatten)]
    pub source: SourceSignals,
}

impl SignalSet {
    /// A signal set with nothing detected, for the given source.
    pub fn empty(source: SourceSignals) -> Self {
        Self {
            urgency_hits: KeywordHit::default(),
            financial_hits: KeywordHit::default(),
            link_mismatches: 0,
            brand_impersonation: None,
            source,
        }
    }

    pub fn has_password_form(&self) -> bool {
        matches!(
            self.source,
            SourceSignals::Website {
                has_password_form: true,
                ..
            }
        )
    }

    pub fn brand_flagged(&self) -> bool {
        self.brand_impersonation
            .as_ref()
            .map(|b| b.flagged)
            .unwrap_or(false)
    }

    /// Domain the brand and allow-list checks were run against.
    pub fn subject_domain(&self) -> &str {
        match &self.source {
            SourceSignals::Email { sender_domain } => sender_domain,
            SourceSignals::Website { domain, .. } => domain,
        }
    }
}

/// Runs every signal extractor over a content record.
pub struct SignalEngine {
    urgency: KeywordScanner,
    financial: KeywordScanner,
    links: LinkAnalyzer,
    brands: BrandImpersonationAnalyzer,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl SignalEngine {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            urgency: KeywordScanner::new(&config.urgency_keywords),
            financial: KeywordScanner::new(&config.financial_keywords),
            links: LinkAnalyzer::new(),
            brands: BrandImpersonationAnalyzer::new(
                &config.known_brands,
                config.max_brand_distance,
            ),
        }
    }

    pub fn extract(&self, content: &ContentRecord) -> SignalSet {
        let blob = content.full_text();
        let urgency_hits = self.urgency.scan(&blob);
        let financial_hits = self.financial.scan(&blob);
        let link_mismatches = self.links.count_mismatches(content.links());
        let brand_impersonation = self.brands.check(content.origin_domain());

        let source = SourceSignals::of(content);

        log::debug!(
            "Signals for {} ({}): urgency={} financial={} mismatches={} brand={:?}",
            content.kind(),
            content.origin_domain(),
            urgency_hits.count,
            financial_hits.count,
            link_mismatches,
            brand_impersonation
        );

        SignalSet {
            urgency_hits,
            financial_hits,
            link_mismatches,
            brand_impersonation,
            source,
        }
    }
}
