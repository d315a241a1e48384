use crate::components::decision_engine::{DecisionEngine, HeuristicResult};
use crate::config::ScannerConfig;
use crate::content::ContentRecord;
use crate::features::{SignalEngine, SignalSet};
use serde::{Deserialize, Serialize};

/// Everything the content side hands back after a local scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalScan {
    pub record: ContentRecord,
    pub signals: SignalSet,
    pub result: HeuristicResult,
}

pub struct ContentScanner {
    signals: SignalEngine,
    decision: DecisionEngine,
}

impl Default for ContentScanner {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl ContentScanner {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            signals: SignalEngine::from_config(config),
            decision: DecisionEngine::from_config(config),
        }
    }

    pub fn scan(&self, record: &ContentRecord) -> LocalScan {
        let signals = self.signals.extract(record);
        let result = self.decision.score(&signals);
        log::info!(
            "Baseline for {} {}: {} ({})",
            record.kind(),
            record.origin_domain(),
            result.score,
            result.verdict
        );
        LocalScan {
            record: record.clone(),
            signals,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Verdict;
    use crate::content::Link;

    #[test]
    fn test_obvious_phish_scores_phishing() {
        let record = ContentRecord::email(
            "service@paypa1.com",
            "Account suspended - act now",
            "Unauthorized access detected. Verify your account and password immediately.",
            vec![
                Link::new("paypal.com", "http://paypa1-verify.example/login"),
                Link::new("Click here", "http://paypa1-verify.example/login"),
            ],
        )
        .unwrap();

        let scan = ContentScanner::default().scan(&record);
        assert_eq!(scan.signals.link_mismatches, 1);
        assert_eq!(scan.result.verdict, Verdict::Phishing);
        assert!(scan.result.score <= 100);
        assert_eq!(scan.record, record);
    }

    #[test]
    fn test_plain_newsletter_is_safe() {
        let record = ContentRecord::email(
            "news@example.org",
            "Monthly update",
            "Here is what happened at the garden club this month.",
            vec![Link::new("example.org", "https://www.example.org/news")],
        )
        .unwrap();

        let scan = ContentScanner::default().scan(&record);
        assert_eq!(scan.result.score, 0);
        assert_eq!(scan.result.verdict, Verdict::Safe);
    }
}
