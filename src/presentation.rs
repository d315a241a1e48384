//! Turning a scan response into something a person reads.

use crate::orchestrator::{FusedResult, ScanOutcome, ScanResponse};
use crate::preferences::Language;
use std::fmt::{self, Write as _};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DangerTier {
    Safe,
    LowRisk,
    Fishy,
    Danger,
    Hooked,
}

impl DangerTier {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 80 => DangerTier::Hooked,
            s if s >= 60 => DangerTier::Danger,
            s if s >= 40 => DangerTier::Fishy,
            s if s >= 20 => DangerTier::LowRisk,
            _ => DangerTier::Safe,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DangerTier::Hooked => "HOOKED!",
            DangerTier::Danger => "Danger",
            DangerTier::Fishy => "Fishy",
            DangerTier::LowRisk => "Low Risk",
            DangerTier::Safe => "Safe",
        }
    }

    /// Display colour as a hex triplet.
    pub fn color(self) -> &'static str {
        match self {
            DangerTier::Hooked => "#ff1744",
            DangerTier::Danger => "#ff5722",
            DangerTier::Fishy => "#ff9800",
            DangerTier::LowRisk => "#ffee58",
            DangerTier::Safe => "#00e676",
        }
    }
}

impl fmt::Display for DangerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn scan_label(language: Language) -> &'static str {
    match language {
        Language::En => "Check for Scam",
        Language::Es => "Verificar estafa",
        Language::Fr => "Vérifier l'arnaque",
    }
}

/// The score shown to the user: the model's when present, else the baseline.
pub fn headline_score(result: &FusedResult) -> u32 {
    result
        .gemini
        .as_ref()
        .map(|g| u32::from(g.danger_score))
        .unwrap_or(result.baseline.score)
        .min(100)
}

pub fn render(response: &ScanResponse) -> String {
    let mut out = String::new();
    match &response.outcome {
        ScanOutcome::Completed(result) => {
            let score = headline_score(result);
            let _ = writeln!(out, "{}: {}%", DangerTier::from_score(score), score);
            let _ = writeln!(
                out,
                "Baseline: {} ({})",
                result.baseline.score, result.baseline.verdict
            );
            for reason in &result.baseline.reasons {
                let _ = writeln!(out, "  - {}", reason);
            }

            match &result.gemini {
                Some(gemini) => {
                    let _ = writeln!(out, "\n{}", gemini.summary);
                    if !gemini.reasons.is_empty() {
                        let _ = writeln!(out, "\nWhy:");
                        for reason in &gemini.reasons {
                            let _ = writeln!(out, "  - {}", reason);
                        }
                    }
                    if !gemini.next_steps.is_empty() {
                        let _ = writeln!(out, "\nNext steps: {}", gemini.next_steps);
                    }
                    if result.audio_base64.is_some() {
                        let _ = writeln!(out, "\n(spoken summary available)");
                    }
                }
                None => {
                    let _ = writeln!(out, "\nAI analysis unavailable, showing local result only.");
                }
            }
        }
        ScanOutcome::Failed(e) => {
            let _ = writeln!(out, "Error: {}", e);
        }
        ScanOutcome::Superseded { by } => {
            let _ = writeln!(out, "Scan replaced by a newer request ({})", by);
        }
    }
    out
}
