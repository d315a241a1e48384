use crate::content::ContentRecord;
use crate::features::{KeywordHit, SignalSet};

fn header(content: &ContentRecord) -> String {
    match content {
        ContentRecord::Email(e) => format!(
            "Type: Email\nFrom: {} (domain: {})\nSubject: {}",
            e.sender_address, e.sender_domain, e.subject
        ),
        ContentRecord::Page(p) => format!(
            "Type: Website\nURL: {}\nDomain: {}\nTitle: {}",
            p.url, p.domain, p.title
        ),
    }
}

fn phrases_or_none(hit: &KeywordHit) -> String {
    if hit.phrases.is_empty() {
        "none".to_string()
    } else {
        hit.phrases.join(", ")
    }
}

pub fn signal_summary(content: &ContentRecord, signals: &SignalSet, baseline_score: u32) -> String {
    let mut lines = vec![
        format!(
            "Urgency keywords ({}): {}",
            signals.urgency_hits.count,
            phrases_or_none(&signals.urgency_hits)
        ),
        format!(
            "Financial/credential keywords ({}): {}",
            signals.financial_hits.count,
            phrases_or_none(&signals.financial_hits)
        ),
        format!("Link mismatches: {}", signals.link_mismatches),
    ];

    if let ContentRecord::Page(_) = content {
        lines.push(format!(
            "Password form detected: {}",
            signals.has_password_form()
        ));
    }

    let brand = signals
        .brand_impersonation
        .as_ref()
        .filter(|b| b.flagged)
        .and_then(|b| b.matched_brand.clone())
        .unwrap_or_else(|| "none".to_string());
    lines.push(format!("Brand impersonation: {}", brand));
    lines.push(format!("Baseline risk score: {}/100", baseline_score));

    lines.join("\n")
}

/// First `max_chars` characters of the body or page text.
pub fn excerpt(content: &ContentRecord, max_chars: usize) -> String {
    content.main_text().chars().take(max_chars).collect()
}

pub fn build_prompt(
    content: &ContentRecord,
    signals: &SignalSet,
    baseline_score: u32,
    max_excerpt_chars: usize,
) -> String {
    let kind = match content {
        ContentRecord::Email(_) => "email",
        ContentRecord::Page(_) => "website",
    };

    format!(
        r#"You are a phishing detection expert for the browser extension "Hooked?".

Analyze the content below and answer with JSON only, using exactly these fields:
{{
  "danger_score": <integer from 0 to 100 in steps of 10; how dangerous this {kind} is>,
  "summary": <1-2 short paragraphs on how safe or dangerous this {kind} appears, in plain language>,
  "reasons_bulleted": [<short reasons, at most 12 words each>],
  "next_steps": <what the reader should do next, direct and in plain language>,
  "fishy_phrases": [<phrases copied verbatim from the content that look suspicious>]
}}

Scoring guidance:
- Raise the score for requests for passwords, payment or identity details.
- Raise the score when links or the sender domain do not match the brand they claim.
- Raise the score for threats, deadlines and pressure to act quickly.
- Do not penalize legitimate verification emails whose links point to the sender's own domain.

{header}

Detected signals:
{summary}

Content excerpt:
{excerpt}"#,
        kind = kind,
        header = header(content),
        summary = signal_summary(content, signals, baseline_score),
        excerpt = excerpt(content, max_excerpt_chars),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SignalEngine;

    #[test]
    fn test_email_prompt_contents() {
        let record = ContentRecord::email(
            "billing@paypa1.com",
            "Payment required",
            "Enter your credit card now.",
            vec![],
        )
        .unwrap();
        let signals = SignalEngine::default().extract(&record);
        let prompt = build_prompt(&record, &signals, 75, 2000);

        assert!(prompt.contains("Type: Email"));
        assert!(prompt.contains("From: billing@paypa1.com (domain: paypa1.com)"));
        assert!(prompt.contains("Financial/credential keywords (2): credit card, payment required"));
        assert!(prompt.contains("Brand impersonation: paypal.com"));
        assert!(prompt.contains("Baseline risk score: 75/100"));
        assert!(!prompt.contains("Password form detected"));
        assert!(prompt.contains("\"fishy_phrases\""));
    }

    #[test]
    fn test_page_prompt_mentions_password_form() {
        let record =
            ContentRecord::page("https://example.net/login", "Login", "", vec![], true).unwrap();
        let signals = SignalEngine::default().extract(&record);
        let prompt = build_prompt(&record, &signals, 25, 2000);

        assert!(prompt.contains("Type: Website"));
        assert!(prompt.contains("Password form detected: true"));
        assert!(prompt.contains("Urgency keywords (0): none"));
        assert!(prompt.contains("Brand impersonation: none"));
    }

    #[test]
    fn test_excerpt_is_bounded_by_characters() {
        let body = "é".repeat(5000);
        let record = ContentRecord::email("a@example.com", "", body, vec![]).unwrap();
        assert_eq!(excerpt(&record, 2000).chars().count(), 2000);

        let signals = SignalEngine::default().extract(&record);
        let prompt = build_prompt(&record, &signals, 0, 2000);
        assert_eq!(prompt.matches('é').count(), 2000);
    }
}
