use super::Unavailable;
use crate::config::SpeechConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Synthesize `text` into encoded audio (MPEG).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Unavailable>;
}

/// ElevenLabs text-to-speech.
pub struct ElevenLabsClient {
    client: Client,
    endpoint: String,
    model_id: String,
    api_key: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

impl ElevenLabsClient {
    pub fn new(config: &SpeechConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/text-to-speech/{}",
                config.api_base.trim_end_matches('/'),
                config.voice_id
            ),
            model_id: config.model_id.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SpeechClient for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Unavailable> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("xi-api-key", &self.api_key)
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::error!("[speech] API error: {} {}", status, detail);
            return Err(Unavailable::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Unavailable::NoOpinion);
        }
        Ok(bytes.to_vec())
    }
}
