use super::{RemoteAssessment, RemoteScorer, Unavailable};
use crate::api::{AnalyzeRequest, AnalyzeResponse};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use std::time::Duration;

/// Relays a locally scored scan to a remote `/analyze` backend.
pub struct AnalyzeClient {
    client: Client,
    url: String,
}

impl AnalyzeClient {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/analyze", endpoint.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Fold a backend response into a single assessment, attaching the audio.
pub fn assessment_from_response(response: AnalyzeResponse) -> Result<RemoteAssessment, Unavailable> {
    if !response.ok {
        return Err(Unavailable::NoOpinion);
    }
    let mut assessment = response.gemini.ok_or(Unavailable::NoOpinion)?;

    if let Some(encoded) = response.audio_base64 {
        match STANDARD.decode(encoded.as_bytes()) {
            Ok(audio) => assessment.audio = Some(audio),
            Err(e) => log::warn!("Discarding undecodable audio: {}", e),
        }
    }
    Ok(assessment)
}

#[async_trait]
impl RemoteScorer for AnalyzeClient {
    async fn assess(&self, request: &AnalyzeRequest) -> Result<RemoteAssessment, Unavailable> {
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Unavailable::Status(status.as_u16()));
        }

        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| Unavailable::Malformed(e.to_string()))?;
        assessment_from_response(body)
    }
}
