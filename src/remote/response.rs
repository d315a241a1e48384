use super::{RemoteAssessment, Unavailable};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    static ref OPENING_FENCE: Regex = Regex::new(r"(?i)^```(?:json)?\s*").unwrap();
    static ref CLOSING_FENCE: Regex = Regex::new(r"\s*```\s*$").unwrap();
}

const SCORE_STEP: i64 = 10;

#[derive(Debug, Deserialize)]
struct RawAssessment {
    danger_score: i64,
    summary: String,
    #[serde(default)]
    reasons_bulleted: Vec<String>,
    #[serde(default)]
    next_steps: String,
    #[serde(default)]
    fishy_phrases: Vec<String>,
}

/// Remove an optional surrounding code fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let start = OPENING_FENCE.find(trimmed).map(|m| m.end()).unwrap_or(0);
    let body = &trimmed[start..];
    let end = CLOSING_FENCE
        .find(body)
        .map(|m| m.start())
        .unwrap_or(body.len());
    body[..end].trim()
}

/// Parse and validate a model reply. Scores off the 10-point grid are
/// snapped to the nearest step; anything else out of contract is rejected.
pub fn parse_assessment(text: &str) -> Result<RemoteAssessment, Unavailable> {
    let json = strip_code_fence(text);
    let raw: RawAssessment =
        serde_json::from_str(json).map_err(|e| Unavailable::Malformed(e.to_string()))?;

    if !(0..=100).contains(&raw.danger_score) {
        return Err(Unavailable::Malformed(format!(
            "danger_score {} outside 0..=100",
            raw.danger_score
        )));
    }
    if raw.summary.trim().is_empty() {
        return Err(Unavailable::Malformed("empty summary".to_string()));
    }

    let snapped = ((raw.danger_score + SCORE_STEP / 2) / SCORE_STEP * SCORE_STEP).min(100);

    Ok(RemoteAssessment {
        danger_score: snapped as u8,
        summary: raw.summary.trim().to_string(),
        reasons: raw
            .reasons_bulleted
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect(),
        next_steps: raw.next_steps.trim().to_string(),
        fishy_phrases: raw
            .fishy_phrases
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect(),
        audio: None,
    })
}
