//! Scan orchestration.
//!
//! A single actor task owns every pending scan. Callers talk to it over a
//! command channel; each scan runs in its own task and reports back on a
//! completion channel, so delivery to callers only ever happens on the actor.
//! Presentation collaborators can subscribe to a broadcast of [`ScanEvent`]s.

pub mod content_host;
pub mod transaction;

pub use content_host::{
    CallerId, ContentHost, ContentNotification, ContentTarget, LocalContentTarget,
    StaticContentHost, TargetError,
};
pub use transaction::{
    FusedResult, RemoteStatus, ScanError, ScanOutcome, ScanResponse, ScanState, ScanTransaction,
    TransactionId,
};

use crate::preferences::{load_in_background, PreferenceStore};
use crate::remote::RemoteScorer;
use crate::watcher::EmailOpened;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A message was opened and the user wants the scanner shown.
    AutoPopup { caller: CallerId, url: String },
    Resolved(ScanResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("scan orchestrator has stopped")]
    Stopped,
}

enum Command {
    Scan {
        caller: CallerId,
        reply: oneshot::Sender<ScanResponse>,
    },
    EmailOpened {
        caller: CallerId,
        opened: EmailOpened,
    },
}

struct Completion {
    transaction: TransactionId,
    outcome: ScanOutcome,
}

#[derive(Clone)]
struct Collaborators {
    host: Arc<dyn ContentHost>,
    remote: Arc<dyn RemoteScorer>,
    preferences: Arc<dyn PreferenceStore>,
}

/// Handle to the orchestrator actor. Dropping every handle stops the actor.
pub struct ScanOrchestrator {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ScanEvent>,
}

impl ScanOrchestrator {
    pub fn spawn(
        host: Arc<dyn ContentHost>,
        remote: Arc<dyn RemoteScorer>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let collaborators = Collaborators {
            host,
            remote,
            preferences,
        };
        tokio::spawn(Self::actor(collaborators, receiver, events.clone()));

        Self { commands, events }
    }

    /// Queue a scan for `caller` and return the handle its response arrives on.
    pub fn request_scan(
        &self,
        caller: CallerId,
    ) -> Result<oneshot::Receiver<ScanResponse>, OrchestratorError> {
        let (reply, receiver) = oneshot::channel();
        self.commands
            .send(Command::Scan { caller, reply })
            .map_err(|_| OrchestratorError::Stopped)?;
        Ok(receiver)
    }

    pub async fn scan(&self, caller: CallerId) -> Result<ScanResponse, OrchestratorError> {
        self.request_scan(caller)?
            .await
            .map_err(|_| OrchestratorError::Stopped)
    }

    pub fn email_opened(&self, caller: CallerId, opened: EmailOpened) -> Result<(), OrchestratorError> {
        self.commands
            .send(Command::EmailOpened { caller, opened })
            .map_err(|_| OrchestratorError::Stopped)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    async fn actor(
        collaborators: Collaborators,
        mut commands: mpsc::UnboundedReceiver<Command>,
        events: broadcast::Sender<ScanEvent>,
    ) {
        let (completed, mut completions) = mpsc::unbounded_channel::<Completion>();
        let mut pending = PendingScans::default();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Scan { caller, reply }) => {
                            let transaction = TransactionId::new();
                            log::info!("[scan {}] requested by {}", transaction, caller);
                            if let Some(superseded) = pending.begin(transaction, caller.clone(), reply) {
                                publish(&events, ScanEvent::Resolved(superseded));
                            }

                            let collaborators = collaborators.clone();
                            let completed = completed.clone();
                            tokio::spawn(async move {
                                let mut scan = ScanTransaction::new(transaction, caller);
                                let outcome = scan
                                    .run(
                                        collaborators.host.as_ref(),
                                        collaborators.remote.as_ref(),
                                        &collaborators.preferences,
                                    )
                                    .await;
                                // The actor is gone only once every handle has been dropped
                                let _ = completed.send(Completion { transaction, outcome });
                            });
                        }
                        Some(Command::EmailOpened { caller, opened }) => {
                            let preferences = Arc::clone(&collaborators.preferences);
                            let events = events.clone();
                            tokio::spawn(async move {
                                if load_in_background(preferences).await.auto_popup_enabled {
                                    log::info!("Email opened in {}, requesting popup", caller);
                                    publish(&events, ScanEvent::AutoPopup { caller, url: opened.url });
                                } else {
                                    log::info!("Email opened in {}, auto-popup disabled", caller);
                                }
                            });
                        }
                        None => {
                            log::debug!("Scan orchestrator stopping with {} pending", pending.len());
                            break;
                        }
                    }
                }
                Some(completion) = completions.recv() => {
                    if let Some(response) = pending.resolve(completion.transaction, completion.outcome) {
                        publish(&events, ScanEvent::Resolved(response));
                    }
                }
            }
        }
    }
}

fn publish(events: &broadcast::Sender<ScanEvent>, event: ScanEvent) {
    if events.send(event).is_err() {
        log::debug!("No event subscribers");
    }
}

struct Pending {
    caller: CallerId,
    reply: oneshot::Sender<ScanResponse>,
}

/// Pending reply handles, by transaction and by caller.
#[derive(Default)]
struct PendingScans {
    by_transaction: HashMap<TransactionId, Pending>,
    by_caller: HashMap<CallerId, TransactionId>,
}

impl PendingScans {
    fn len(&self) -> usize {
        self.by_transaction.len()
    }

    /// Register a new transaction. If the caller already had one pending, it
    /// is answered with `Superseded` and its response returned.
    fn begin(
        &mut self,
        transaction: TransactionId,
        caller: CallerId,
        reply: oneshot::Sender<ScanResponse>,
    ) -> Option<ScanResponse> {
        let superseded = self
            .by_caller
            .insert(caller.clone(), transaction)
            .and_then(|previous| self.by_transaction.remove(&previous).map(|p| (previous, p)))
            .map(|(previous, p)| {
                log::info!("[scan {}] superseded by {}", previous, transaction);
                deliver(
                    p,
                    ScanResponse {
                        transaction: previous,
                        caller: caller.clone(),
                        outcome: ScanOutcome::Superseded { by: transaction },
                    },
                )
            });

        self.by_transaction
            .insert(transaction, Pending { caller, reply });
        superseded
    }

    /// Deliver a completion. Returns `None` for late or duplicate completions,
    /// which are dropped.
    fn resolve(&mut self, transaction: TransactionId, outcome: ScanOutcome) -> Option<ScanResponse> {
        let pending = match self.by_transaction.remove(&transaction) {
            Some(pending) => pending,
            None => {
                log::info!("[scan {}] discarding completion, already resolved", transaction);
                return None;
            }
        };
        if self.by_caller.get(&pending.caller) == Some(&transaction) {
            self.by_caller.remove(&pending.caller);
        }

        log::debug!("[scan {}] resolved for {}", transaction, pending.caller);
        let caller = pending.caller.clone();
        Some(deliver(
            pending,
            ScanResponse {
                transaction,
                caller,
                outcome,
            },
        ))
    }
}

fn deliver(pending: Pending, response: ScanResponse) -> ScanResponse {
    if pending.reply.send(response.clone()).is_err() {
        log::debug!(
            "[scan {}] caller {} stopped listening",
            response.transaction,
            pending.caller
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ContentScanner, HeuristicResult, LocalScan, Verdict};
    use crate::content::ContentRecord;
    use crate::features::SignalEngine;
    use crate::preferences::{MemoryPreferenceStore, Preferences};
    use crate::remote::{RemoteAssessment, Unavailable};
    use crate::api::AnalyzeRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn assessment() -> RemoteAssessment {
        RemoteAssessment {
            danger_score: 90,
            summary: "Classic credential phish.".to_string(),
            reasons: vec!["Lookalike sender".to_string()],
            next_steps: "Delete the message.".to_string(),
            fishy_phrases: vec!["act now".to_string()],
            audio: None,
        }
    }

    fn phish() -> ContentRecord {
        ContentRecord::email(
            "alerts@paypa1.com",
            "Act now",
            "Confirm your password immediately",
            vec![],
        )
        .unwrap()
    }

    struct FixedRemote(Result<RemoteAssessment, Unavailable>);

    #[async_trait]
    impl RemoteScorer for FixedRemote {
        async fn assess(&self, _request: &AnalyzeRequest) -> Result<RemoteAssessment, Unavailable> {
            self.0.clone()
        }
    }

    /// Never answers the first request; answers every later one.
    #[derive(Default)]
    struct StallsFirst {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteScorer for StallsFirst {
        async fn assess(&self, _request: &AnalyzeRequest) -> Result<RemoteAssessment, Unavailable> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(assessment())
        }
    }

    /// Returns a preset local scan.
    struct FixedTarget(LocalScan);

    #[async_trait]
    impl ContentTarget for FixedTarget {
        async fn scan(&self) -> Result<LocalScan, TargetError> {
            Ok(self.0.clone())
        }
        async fn inject(&self) -> Result<(), TargetError> {
            Ok(())
        }
        async fn notify(&self, _notification: ContentNotification) -> Result<(), TargetError> {
            Err(TargetError::Unreachable("view closed".to_string()))
        }
    }

    /// Never becomes initialized, however often it is injected.
    #[derive(Default)]
    struct DeadTarget {
        injections: AtomicUsize,
    }

    #[async_trait]
    impl ContentTarget for DeadTarget {
        async fn scan(&self) -> Result<LocalScan, TargetError> {
            Err(TargetError::NotInitialized)
        }
        async fn inject(&self) -> Result<(), TargetError> {
            self.injections.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn notify(&self, _notification: ContentNotification) -> Result<(), TargetError> {
            Ok(())
        }
    }

    fn orchestrator(
        host: Arc<StaticContentHost>,
        remote: Arc<dyn RemoteScorer>,
        preferences: Preferences,
    ) -> ScanOrchestrator {
        ScanOrchestrator::spawn(host, remote, Arc::new(MemoryPreferenceStore::new(preferences)))
    }

    fn local_target(
        host: &StaticContentHost,
        caller: &CallerId,
    ) -> mpsc::UnboundedReceiver<ContentNotification> {
        let (target, rx) = LocalContentTarget::new(phish(), Arc::new(ContentScanner::default()));
        host.register(caller.clone(), Arc::new(target));
        rx
    }

    fn completed(response: &ScanResponse) -> &FusedResult {
        match &response.outcome {
            ScanOutcome::Completed(fused) => fused,
            other => panic!("expected completed scan, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_baseline() {
        let record = phish();
        let local = LocalScan {
            signals: SignalEngine::default().extract(&record),
            record,
            result: HeuristicResult {
                score: 80,
                verdict: Verdict::Phishing,
                reasons: vec![],
            },
        };
        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        host.register(caller.clone(), Arc::new(FixedTarget(local)));

        let orchestrator = orchestrator(
            host,
            Arc::new(FixedRemote(Err(Unavailable::Transport("refused".into())))),
            Preferences::default(),
        );
        let response = timeout(WAIT, orchestrator.scan(caller)).await.unwrap().unwrap();
        let fused = completed(&response);

        assert_eq!(fused.baseline.score, 80);
        assert_eq!(fused.baseline.verdict, Verdict::Phishing);
        assert_eq!(fused.gemini, None);
        assert!(matches!(fused.remote_status, RemoteStatus::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_superseded_scan_does_not_block_newer_one() {
        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        let _rx = local_target(&host, &caller);
        let remote = Arc::new(StallsFirst::default());
        let orchestrator = orchestrator(host, remote.clone(), Preferences::default());

        let first = orchestrator.request_scan(caller.clone()).unwrap();
        // Wait until the first scan is parked on its remote leg
        for _ in 0..200 {
            if remote.calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);

        let second = timeout(WAIT, orchestrator.scan(caller.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed(&second).gemini, Some(assessment()));

        let first = timeout(WAIT, first).await.unwrap().unwrap();
        assert_eq!(
            first.outcome,
            ScanOutcome::Superseded {
                by: second.transaction
            }
        );
        assert_ne!(first.transaction, second.transaction);
    }

    #[tokio::test]
    async fn test_callers_are_independent() {
        let host = Arc::new(StaticContentHost::new());
        let (a, b) = (CallerId::new("tab-a"), CallerId::new("tab-b"));
        let _rx_a = local_target(&host, &a);
        let _rx_b = local_target(&host, &b);
        let orchestrator = orchestrator(
            host,
            Arc::new(FixedRemote(Ok(assessment()))),
            Preferences::default(),
        );

        let first = orchestrator.request_scan(a.clone()).unwrap();
        let second = orchestrator.request_scan(b.clone()).unwrap();
        let first = timeout(WAIT, first).await.unwrap().unwrap();
        let second = timeout(WAIT, second).await.unwrap().unwrap();

        assert_eq!(first.caller, a);
        assert_eq!(second.caller, b);
        assert!(matches!(first.outcome, ScanOutcome::Completed(_)));
        assert!(matches!(second.outcome, ScanOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_missing_target_is_local_error() {
        let orchestrator = orchestrator(
            Arc::new(StaticContentHost::new()),
            Arc::new(FixedRemote(Ok(assessment()))),
            Preferences::default(),
        );
        let caller = CallerId::new("nowhere");
        let response = timeout(WAIT, orchestrator.scan(caller.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            response.outcome,
            ScanOutcome::Failed(ScanError::NoTarget(caller))
        );
    }

    #[tokio::test]
    async fn test_uninitialized_target_is_injected_once() {
        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        let (target, _rx) =
            LocalContentTarget::uninitialized(phish(), Arc::new(ContentScanner::default()));
        let target = Arc::new(target);
        host.register(caller.clone(), target.clone());

        let orchestrator = orchestrator(
            host,
            Arc::new(FixedRemote(Err(Unavailable::Disabled))),
            Preferences::default(),
        );
        let response = timeout(WAIT, orchestrator.scan(caller)).await.unwrap().unwrap();
        assert!(completed(&response).baseline.score > 0);
        assert_eq!(target.injections(), 1);
    }

    #[tokio::test]
    async fn test_dead_target_fails_after_one_retry() {
        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        let target = Arc::new(DeadTarget::default());
        host.register(caller.clone(), target.clone());

        let orchestrator = orchestrator(
            host,
            Arc::new(FixedRemote(Ok(assessment()))),
            Preferences::default(),
        );
        let response = timeout(WAIT, orchestrator.scan(caller)).await.unwrap().unwrap();
        assert_eq!(response.outcome, ScanOutcome::Failed(ScanError::NotInitialized));
        assert_eq!(target.injections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_assessment_and_highlight_pushed_to_target() {
        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        let mut rx = local_target(&host, &caller);
        let orchestrator = orchestrator(
            host,
            Arc::new(FixedRemote(Ok(assessment()))),
            Preferences::default(),
        );

        timeout(WAIT, orchestrator.scan(caller)).await.unwrap().unwrap();
        assert_eq!(
            timeout(WAIT, rx.recv()).await.unwrap(),
            Some(ContentNotification::Assessment(assessment()))
        );
        assert_eq!(
            timeout(WAIT, rx.recv()).await.unwrap(),
            Some(ContentNotification::Highlight {
                phrases: vec!["act now".to_string()]
            })
        );
    }

    #[tokio::test]
    async fn test_highlight_respects_preference() {
        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        let mut rx = local_target(&host, &caller);
        let orchestrator = orchestrator(
            host,
            Arc::new(FixedRemote(Ok(assessment()))),
            Preferences {
                highlight_enabled: false,
                ..Preferences::default()
            },
        );

        timeout(WAIT, orchestrator.scan(caller)).await.unwrap().unwrap();
        assert!(matches!(
            timeout(WAIT, rx.recv()).await.unwrap(),
            Some(ContentNotification::Assessment(_))
        ));
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_push_does_not_affect_result() {
        let record = phish();
        let local = ContentScanner::default().scan(&record);
        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        host.register(caller.clone(), Arc::new(FixedTarget(local)));

        let orchestrator = orchestrator(
            host,
            Arc::new(FixedRemote(Ok(assessment()))),
            Preferences::default(),
        );
        let response = timeout(WAIT, orchestrator.scan(caller)).await.unwrap().unwrap();
        assert_eq!(completed(&response).gemini, Some(assessment()));
    }

    #[tokio::test]
    async fn test_auto_popup_follows_preference() {
        let caller = CallerId::new("mail");
        let opened = EmailOpened {
            url: "https://mail.google.com/mail/u/0/#inbox/FMfcgz".to_string(),
        };

        let enabled = orchestrator(
            Arc::new(StaticContentHost::new()),
            Arc::new(FixedRemote(Err(Unavailable::Disabled))),
            Preferences::default(),
        );
        let mut events = enabled.subscribe();
        enabled.email_opened(caller.clone(), opened.clone()).unwrap();
        assert_eq!(
            timeout(WAIT, events.recv()).await.unwrap().unwrap(),
            ScanEvent::AutoPopup {
                caller: caller.clone(),
                url: opened.url.clone()
            }
        );

        let disabled = orchestrator(
            Arc::new(StaticContentHost::new()),
            Arc::new(FixedRemote(Err(Unavailable::Disabled))),
            Preferences {
                auto_popup_enabled: false,
                ..Preferences::default()
            },
        );
        let mut events = disabled.subscribe();
        disabled.email_opened(caller.clone(), opened).unwrap();
        // The next event must be the scan resolution, not a popup
        disabled.scan(caller).await.unwrap();
        assert!(matches!(
            timeout(WAIT, events.recv()).await.unwrap().unwrap(),
            ScanEvent::Resolved(_)
        ));
    }

    #[tokio::test]
    async fn test_preferences_are_not_read_on_the_actor_thread() {
        use crate::preferences::test_support::ThreadRecordingStore;

        let host = Arc::new(StaticContentHost::new());
        let caller = CallerId::new("tab-1");
        let mut rx = local_target(&host, &caller);
        let store = Arc::new(ThreadRecordingStore::default());
        let orchestrator = ScanOrchestrator::spawn(
            host,
            Arc::new(FixedRemote(Ok(assessment()))),
            store.clone(),
        );
        let mut events = orchestrator.subscribe();

        orchestrator
            .email_opened(
                caller.clone(),
                EmailOpened {
                    url: "https://mail.google.com/mail/u/0/#inbox/FMfcgz".to_string(),
                },
            )
            .unwrap();
        assert!(matches!(
            timeout(WAIT, events.recv()).await.unwrap().unwrap(),
            ScanEvent::AutoPopup { .. }
        ));

        timeout(WAIT, orchestrator.scan(caller)).await.unwrap().unwrap();
        timeout(WAIT, rx.recv()).await.unwrap();
        assert!(matches!(
            timeout(WAIT, rx.recv()).await.unwrap(),
            Some(ContentNotification::Highlight { .. })
        ));

        // Current-thread runtime: the actor and every scan task run here
        let threads = store.load_threads.lock().unwrap();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != std::thread::current().id()));
    }

    #[test]
    fn test_duplicate_completion_is_discarded() {
        let mut pending = PendingScans::default();
        let transaction = TransactionId::new();
        let (reply, mut rx) = oneshot::channel();
        assert!(pending
            .begin(transaction, CallerId::new("tab"), reply)
            .is_none());

        let outcome = ScanOutcome::Failed(ScanError::NotInitialized);
        assert!(pending.resolve(transaction, outcome.clone()).is_some());
        assert!(pending.resolve(transaction, outcome.clone()).is_none());
        assert_eq!(rx.try_recv().unwrap().outcome, outcome);
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn test_begin_supersedes_same_caller_only() {
        let mut pending = PendingScans::default();
        let caller = CallerId::new("tab");
        let (first, second, other) = (
            TransactionId::new(),
            TransactionId::new(),
            TransactionId::new(),
        );
        let (reply, mut first_rx) = oneshot::channel();
        pending.begin(first, caller.clone(), reply);
        let (reply, _other_rx) = oneshot::channel();
        assert!(pending.begin(other, CallerId::new("elsewhere"), reply).is_none());

        let (reply, _second_rx) = oneshot::channel();
        let superseded = pending.begin(second, caller, reply).unwrap();
        assert_eq!(superseded.transaction, first);
        assert_eq!(
            first_rx.try_recv().unwrap().outcome,
            ScanOutcome::Superseded { by: second }
        );
        assert_eq!(pending.len(), 2);

        // The stalled first scan finishing later changes nothing
        assert!(pending
            .resolve(first, ScanOutcome::Failed(ScanError::NotInitialized))
            .is_none());
    }
}
