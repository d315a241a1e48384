//! Second opinion from a generative model, plus optional spoken summary.
//!
//! Every call here is best effort: failures come back as [`Unavailable`]
//! and never abort a scan.

pub mod analyze_client;
pub mod gemini;
pub mod prompt;
pub mod response;
pub mod sample;
pub mod speech;

use crate::api::AnalyzeRequest;
use crate::config::{api_key_from_env, HookedConfig, RemoteMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use analyze_client::AnalyzeClient;
pub use gemini::GeminiClient;
pub use sample::SampleModel;
pub use speech::{ElevenLabsClient, SpeechClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAssessment {
    pub danger_score: u8,
    pub summary: String,
    #[serde(rename = "reasons_bulleted", default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default)]
    pub fishy_phrases: Vec<String>,
    /// Spoken summary; travels separately as `audio_base64` on the wire.
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    #[error("remote assessment is disabled")]
    Disabled,
    #[error("no API key found in ${0}")]
    MissingApiKey(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote service returned HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("remote service gave no assessment")]
    NoOpinion,
}

impl From<reqwest::Error> for Unavailable {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Unavailable::Status(status.as_u16()),
            None => Unavailable::Transport(e.to_string()),
        }
    }
}

/// Anything that can give a second opinion on a locally scored scan.
#[async_trait]
pub trait RemoteScorer: Send + Sync {
    async fn assess(&self, request: &AnalyzeRequest) -> Result<RemoteAssessment, Unavailable>;
}

/// A text-in, text-out generative model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, Unavailable>;
}

/// Model leg plus optional speech leg, as run by the backend.
pub struct AssessmentService {
    model: Option<Arc<dyn ModelClient>>,
    speech: Option<Arc<dyn SpeechClient>>,
    excerpt_chars: usize,
    mode: RemoteMode,
    /// Env var that should have held the model key, when it did not.
    missing_key: Option<String>,
}

impl AssessmentService {
    pub fn new(
        model: Option<Arc<dyn ModelClient>>,
        speech: Option<Arc<dyn SpeechClient>>,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            model,
            speech,
            excerpt_chars,
            mode: RemoteMode::Gemini,
            missing_key: None,
        }
    }

    /// Wire up the model and speech clients the configuration asks for.
    /// Missing API keys leave the corresponding leg unconfigured.
    pub fn from_config(config: &HookedConfig) -> anyhow::Result<Self> {
        let remote = &config.remote;
        let mut missing_key = None;
        let model: Option<Arc<dyn ModelClient>> = match remote.mode {
            RemoteMode::Disabled => None,
            RemoteMode::Sample => Some(Arc::new(SampleModel::default())),
            RemoteMode::Gemini => match api_key_from_env(&remote.api_key_env) {
                Some(key) => Some(Arc::new(GeminiClient::new(remote, key)?)),
                None => {
                    log::warn!(
                        "[gemini] No API key in ${}, AI analysis will be skipped",
                        remote.api_key_env
                    );
                    missing_key = Some(remote.api_key_env.clone());
                    None
                }
            },
        };

        let speech: Option<Arc<dyn SpeechClient>> = if config.speech.enabled {
            match api_key_from_env(&config.speech.api_key_env) {
                Some(key) => Some(Arc::new(ElevenLabsClient::new(&config.speech, key)?)),
                None => {
                    log::info!(
                        "[speech] No API key in ${}, spoken summaries disabled",
                        config.speech.api_key_env
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            model,
            speech,
            excerpt_chars: remote.excerpt_chars,
            mode: remote.mode,
            missing_key,
        })
    }

    pub fn mode(&self) -> RemoteMode {
        self.mode
    }

    async fn model_opinion(&self, request: &AnalyzeRequest) -> Result<RemoteAssessment, Unavailable> {
        let model = match &self.model {
            Some(model) => model,
            None if self.mode == RemoteMode::Disabled => return Err(Unavailable::Disabled),
            None => {
                return Err(match &self.missing_key {
                    Some(var) => Unavailable::MissingApiKey(var.clone()),
                    None => Unavailable::NoOpinion,
                })
            }
        };

        let prompt = prompt::build_prompt(
            &request.data,
            &request.signals,
            request.score,
            self.excerpt_chars,
        );
        log::debug!("[gemini] prompt:\n{}", prompt);

        let text = model.generate(&prompt).await?;
        let assessment = response::parse_assessment(&text)?;
        log::info!("[gemini] danger_score={}", assessment.danger_score);
        log::debug!("[gemini] summary={}", assessment.summary);
        Ok(assessment)
    }
}

#[async_trait]
impl RemoteScorer for AssessmentService {
    async fn assess(&self, request: &AnalyzeRequest) -> Result<RemoteAssessment, Unavailable> {
        let mut assessment = match self.model_opinion(request).await {
            Ok(assessment) => assessment,
            Err(e) => {
                log::warn!("[gemini] {}", e);
                return Err(e);
            }
        };

        if let Some(speech) = &self.speech {
            if !assessment.summary.trim().is_empty() {
                match speech.synthesize(&assessment.summary).await {
                    Ok(audio) => {
                        log::info!("[speech] audio ready ({} bytes)", audio.len());
                        assessment.audio = Some(audio);
                    }
                    Err(e) => log::error!("[speech] {}", e),
                }
            }
        }

        Ok(assessment)
    }
}
