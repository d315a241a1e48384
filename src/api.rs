//! Wire types of the `/analyze` backend, shared by the server and the relay
//! client.

use crate::components::{LocalScan, Verdict};
use crate::content::ContentRecord;
use crate::features::{BrandMatch, KeywordHit, SignalSet, SourceSignals};
use crate::remote::RemoteAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /analyze`.
///
/// On input the signals need no source discriminator: the record in `data`
/// decides whether they describe an email or a website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAnalyzeRequest")]
pub struct AnalyzeRequest {
    pub data: ContentRecord,
    pub signals: SignalSet,
    pub score: u32,
    pub verdict: Verdict,
}

#[derive(Deserialize)]
struct RawAnalyzeRequest {
    data: ContentRecord,
    #[serde(default)]
    signals: RawSignals,
    score: u32,
    verdict: Verdict,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSignals {
    urgency_hits: KeywordHit,
    financial_hits: KeywordHit,
    link_mismatches: u32,
    brand_impersonation: Option<BrandMatch>,
    has_password_form: Option<bool>,
}

impl From<RawAnalyzeRequest> for AnalyzeRequest {
    fn from(raw: RawAnalyzeRequest) -> Self {
        let mut source = SourceSignals::of(&raw.data);
        if let (
            SourceSignals::Website {
                has_password_form, ..
            },
            Some(flag),
        ) = (&mut source, raw.signals.has_password_form)
        {
            *has_password_form = flag;
        }

        Self {
            signals: SignalSet {
                urgency_hits: raw.signals.urgency_hits,
                financial_hits: raw.signals.financial_hits,
                link_mismatches: raw.signals.link_mismatches,
                brand_impersonation: raw.signals.brand_impersonation,
                source,
            },
            data: raw.data,
            score: raw.score,
            verdict: raw.verdict,
        }
    }
}

impl From<&LocalScan> for AnalyzeRequest {
    fn from(scan: &LocalScan) -> Self {
        Self {
            data: scan.record.clone(),
            signals: scan.signals.clone(),
            score: scan.result.score,
            verdict: scan.result.verdict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub score: u32,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    pub baseline: Baseline,
    pub gemini: Option<RemoteAssessment>,
    pub audio_base64: Option<String>,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub remote_mode: String,
}
