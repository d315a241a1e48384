use super::content_host::{CallerId, ContentHost, ContentNotification, ContentTarget, TargetError};
use crate::api::AnalyzeRequest;
use crate::components::{HeuristicResult, LocalScan};
use crate::preferences::{load_in_background, PreferenceStore};
use crate::remote::{RemoteAssessment, RemoteScorer, Unavailable};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    ScanRequested,
    AwaitingLocalExtraction,
    AwaitingRemoteAssessment,
    Resolved,
}

/// How the remote leg went. Only informational: the scan succeeds either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RemoteStatus {
    Assessed,
    Unavailable(String),
}

/// Baseline plus optional second opinion, as handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FusedResult {
    pub baseline: HeuristicResult,
    pub gemini: Option<RemoteAssessment>,
    pub audio_base64: Option<String>,
    pub remote_status: RemoteStatus,
}

impl FusedResult {
    pub fn fuse(baseline: HeuristicResult, remote: Result<RemoteAssessment, Unavailable>) -> Self {
        match remote {
            Ok(assessment) => Self {
                audio_base64: assessment.audio.as_ref().map(|audio| STANDARD.encode(audio)),
                baseline,
                gemini: Some(assessment),
                remote_status: RemoteStatus::Assessed,
            },
            Err(e) => Self {
                baseline,
                gemini: None,
                audio_base64: None,
                remote_status: RemoteStatus::Unavailable(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("cannot scan: no content target for {0}")]
    NoTarget(CallerId),
    #[error("cannot scan: content target did not initialize")]
    NotInitialized,
    #[error("cannot scan: {0}")]
    Unreachable(String),
}

impl From<TargetError> for ScanError {
    fn from(e: TargetError) -> Self {
        match e {
            TargetError::NotInitialized => ScanError::NotInitialized,
            TargetError::Unreachable(detail) => ScanError::Unreachable(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(FusedResult),
    Failed(ScanError),
    /// A newer request from the same caller took over.
    Superseded { by: TransactionId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResponse {
    pub transaction: TransactionId,
    pub caller: CallerId,
    pub outcome: ScanOutcome,
}

/// One scan, from request to resolution.
pub struct ScanTransaction {
    id: TransactionId,
    caller: CallerId,
    state: ScanState,
}

impl ScanTransaction {
    pub fn new(id: TransactionId, caller: CallerId) -> Self {
        Self {
            id,
            caller,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn advance(&mut self, next: ScanState) {
        log::debug!("[scan {}] {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    pub async fn run(
        &mut self,
        host: &dyn ContentHost,
        remote: &dyn RemoteScorer,
        preferences: &Arc<dyn PreferenceStore>,
    ) -> ScanOutcome {
        self.advance(ScanState::ScanRequested);
        let target = match host.locate(&self.caller) {
            Some(target) => target,
            None => {
                log::warn!("[scan {}] no content target for {}", self.id, self.caller);
                self.advance(ScanState::Resolved);
                return ScanOutcome::Failed(ScanError::NoTarget(self.caller.clone()));
            }
        };

        self.advance(ScanState::AwaitingLocalExtraction);
        let local = match extract(target.as_ref()).await {
            Ok(local) => local,
            Err(e) => {
                log::warn!("[scan {}] {}", self.id, e);
                self.advance(ScanState::Resolved);
                return ScanOutcome::Failed(e);
            }
        };

        self.advance(ScanState::AwaitingRemoteAssessment);
        let request = AnalyzeRequest::from(&local);
        let remote = remote.assess(&request).await;
        match &remote {
            Ok(assessment) => {
                push_to_target(target, assessment.clone(), Arc::clone(preferences));
            }
            Err(e) => log::info!("[scan {}] no remote assessment: {}", self.id, e),
        }

        self.advance(ScanState::Resolved);
        ScanOutcome::Completed(FusedResult::fuse(local.result, remote))
    }
}

/// Run the local scan, injecting the content agent and retrying exactly once
/// if it was not initialized.
async fn extract(target: &dyn ContentTarget) -> Result<LocalScan, ScanError> {
    match target.scan().await {
        Ok(local) => Ok(local),
        Err(TargetError::NotInitialized) => {
            log::info!("Content target not initialized, injecting and retrying");
            target.inject().await?;
            Ok(target.scan().await?)
        }
        Err(e) => Err(e.into()),
    }
}

fn push_to_target(
    target: Arc<dyn ContentTarget>,
    assessment: RemoteAssessment,
    preferences: Arc<dyn PreferenceStore>,
) {
    tokio::spawn(async move {
        let phrases = assessment.fishy_phrases.clone();
        if let Err(e) = target
            .notify(ContentNotification::Assessment(assessment))
            .await
        {
            log::debug!("Assessment push ignored: {}", e);
        }
        if phrases.is_empty() || !load_in_background(preferences).await.highlight_enabled {
            return;
        }
        if let Err(e) = target
            .notify(ContentNotification::Highlight { phrases })
            .await
        {
            log::debug!("Highlight push ignored: {}", e);
        }
    });
}
