//! Decision Engine Component
//!
//! Turns a signal set into the baseline risk score, verdict and reasons.
//! Every category contributes a capped amount, the sum is capped at 100,
//! and the verdict is read off two thresholds.

use crate::config::{ScannerConfig, ScoringWeights, VerdictThresholds};
use crate::domain_utils::DomainUtils;
use crate::features::{KeywordHit, SignalSet};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SCORE: u32 = 100;
const PHRASES_IN_REASON: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Suspicious,
    Phishing,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Safe => "safe",
            Verdict::Suspicious => "suspicious",
            Verdict::Phishing => "phishing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicResult {
    pub score: u32,
    pub verdict: Verdict,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    weights: ScoringWeights,
    thresholds: VerdictThresholds,
    major_domains: Vec<String>,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl DecisionEngine {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            weights: config.scoring.clone(),
            thresholds: config.thresholds.clone(),
            major_domains: config.major_domains.clone(),
        }
    }

    pub fn score(&self, signals: &SignalSet) -> HeuristicResult {
        let w = &self.weights;
        let mut total: u32 = 0;
        let mut reasons = Vec::new();

        let urgency = capped(signals.urgency_hits.count, w.urgency_per_hit, w.urgency_cap);
        if urgency > 0 {
            total = total.saturating_add(urgency);
            reasons.push(format!(
                "Urgency language detected: {}",
                leading_phrases(&signals.urgency_hits)
            ));
        }

        let financial = capped(
            signals.financial_hits.count,
            w.financial_per_hit,
            w.financial_cap,
        );
        if financial > 0 {
            total = total.saturating_add(financial);
            reasons.push(format!(
                "Requests financial or login details: {}",
                leading_phrases(&signals.financial_hits)
            ));
        }

        let mismatches = capped(
            signals.link_mismatches,
            w.link_mismatch_per_hit,
            w.link_mismatch_cap,
        );
        if mismatches > 0 {
            total = total.saturating_add(mismatches);
            reasons.push(format!(
                "{} link(s) display one domain but lead to another",
                signals.link_mismatches
            ));
        }

        if signals.has_password_form()
            && w.password_form > 0
            && !DomainUtils::matches_domain_list(signals.subject_domain(), &self.major_domains)
        {
            total = total.saturating_add(w.password_form);
            reasons.push(format!(
                "Password form on an unrecognized site ({})",
                signals.subject_domain()
            ));
        }

        if let Some(brand) = signals.brand_impersonation.as_ref().filter(|b| b.flagged) {
            if w.brand_impersonation > 0 {
                total = total.saturating_add(w.brand_impersonation);
                reasons.push(format!(
                    "Domain {} imitates {}",
                    signals.subject_domain(),
                    brand.matched_brand.as_deref().unwrap_or("a known brand")
                ));
            }
        }

        let score = total.min(MAX_SCORE);
        HeuristicResult {
            score,
            verdict: self.verdict_for(score),
            reasons,
        }
    }

    pub fn verdict_for(&self, score: u32) -> Verdict {
        if score >= self.thresholds.phishing {
            Verdict::Phishing
        } else if score >= self.thresholds.suspicious {
            Verdict::Suspicious
        } else {
            Verdict::Safe
        }
    }
}

fn capped(count: u32, per_hit: u32, cap: u32) -> u32 {
    count.saturating_mul(per_hit).min(cap)
}

fn leading_phrases(hit: &KeywordHit) -> String {
    hit.phrases
        .iter()
        .take(PHRASES_IN_REASON)
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{BrandMatch, SourceSignals};

    fn email_signals() -> SignalSet {
        SignalSet::empty(SourceSignals::Email {
            sender_domain: "example.org".to_string(),
        })
    }

    fn page_signals(domain: &str) -> SignalSet {
        SignalSet::empty(SourceSignals::Website {
            domain: domain.to_string(),
            has_password_form: true,
        })
    }

    fn hits(n: u32) -> KeywordHit {
        KeywordHit::from_phrases((0..n).map(|i| format!("kw{}", i)).collect())
    }

    #[test]
    fn test_all_zero_is_safe() {
        let result = DecisionEngine::default().score(&email_signals());
        assert_eq!(result.score, 0);
        assert_eq!(result.verdict, Verdict::Safe);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_category_caps() {
        let engine = DecisionEngine::default();
        let mut signals = email_signals();
        signals.urgency_hits = hits(2);
        assert_eq!(engine.score(&signals).score, 20);

        signals.urgency_hits = hits(9);
        assert_eq!(engine.score(&signals).score, 30);

        signals.link_mismatches = 5;
        assert_eq!(engine.score(&signals).score, 70);
        assert_eq!(engine.score(&signals).verdict, Verdict::Phishing);
    }

    #[test]
    fn test_reason_lists_first_three_phrases() {
        let mut signals = email_signals();
        signals.financial_hits = hits(5);
        let result = DecisionEngine::default().score(&signals);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].contains("\"kw2\""));
        assert!(!result.reasons[0].contains("\"kw3\""));
        assert_eq!(result.score, 30);
        assert_eq!(result.verdict, Verdict::Suspicious);
    }

    #[test]
    fn test_password_form_skips_major_domains() {
        let engine = DecisionEngine::default();
        assert_eq!(engine.score(&page_signals("accounts.google.com")).score, 0);
        assert_eq!(engine.score(&page_signals("example.net")).score, 25);
        assert_eq!(engine.score(&page_signals("google.com.evil.net")).score, 25);
    }

    #[test]
    fn test_brand_impersonation_weight() {
        let mut signals = email_signals();
        signals.brand_impersonation = Some(BrandMatch {
            flagged: true,
            matched_brand: Some("paypal.com".to_string()),
            distance: Some(1),
        });
        let result = DecisionEngine::default().score(&signals);
        assert_eq!(result.score, 30);
        assert!(result.reasons[0].contains("paypal.com"));

        signals.brand_impersonation = Some(BrandMatch::default());
        assert_eq!(DecisionEngine::default().score(&signals).score, 0);
    }

    #[test]
    fn test_score_bounded_for_adversarial_input() {
        let mut signals = page_signals("paypa1.com");
        signals.urgency_hits = KeywordHit {
            count: u32::MAX,
            phrases: vec![],
        };
        signals.financial_hits = KeywordHit {
            count: u32::MAX,
            phrases: vec![],
        };
        signals.link_mismatches = u32::MAX;
        signals.brand_impersonation = Some(BrandMatch {
            flagged: true,
            matched_brand: None,
            distance: Some(1),
        });
        let result = DecisionEngine::default().score(&signals);
        assert_eq!(result.score, 100);
        assert_eq!(result.verdict, Verdict::Phishing);
    }

    #[test]
    fn test_score_monotonic_in_each_signal() {
        let engine = DecisionEngine::default();
        let base = || {
            let mut signals = SignalSet::empty(SourceSignals::Website {
                domain: "example.net".to_string(),
                has_password_form: false,
            });
            signals.urgency_hits = hits(1);
            signals.financial_hits = hits(1);
            signals.link_mismatches = 1;
            signals
        };
        let base_score = engine.score(&base()).score;
        assert_eq!(base_score, 45);

        let counters: [(&str, fn(&mut SignalSet, u32)); 3] = [
            ("urgency", |s, n| s.urgency_hits = hits(n)),
            ("financial", |s, n| s.financial_hits = hits(n)),
            ("link mismatches", |s, n| s.link_mismatches = n),
        ];
        for (name, set) in counters {
            let mut previous = 0;
            for n in 0..12 {
                let mut signals = base();
                set(&mut signals, n);
                let score = engine.score(&signals).score;
                assert!(score >= previous, "{} dropped at {}", name, n);
                if n == 1 {
                    assert_eq!(score, base_score, "{}", name);
                }
                previous = score;
            }
            assert!(previous > base_score, "{} never raised the score", name);
        }

        let mut signals = base();
        signals.source = SourceSignals::Website {
            domain: "example.net".to_string(),
            has_password_form: true,
        };
        assert_eq!(engine.score(&signals).score, base_score + 25);

        let mut signals = base();
        signals.brand_impersonation = Some(BrandMatch {
            flagged: true,
            matched_brand: Some("paypal.com".to_string()),
            distance: Some(1),
        });
        assert_eq!(engine.score(&signals).score, base_score + 30);
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let mut config = ScannerConfig::default();
        config.thresholds.suspicious = 10;
        config.thresholds.phishing = 20;
        config.scoring.urgency_per_hit = 5;
        let engine = DecisionEngine::from_config(&config);

        let mut signals = email_signals();
        signals.urgency_hits = hits(2);
        let result = engine.score(&signals);
        assert_eq!(result.score, 10);
        assert_eq!(result.verdict, Verdict::Suspicious);
        assert_eq!(engine.verdict_for(20), Verdict::Phishing);
        assert_eq!(engine.verdict_for(9), Verdict::Safe);
    }
}
