//! The content side of a scan: something that can run extraction and scoring
//! over whatever the user is looking at, and accept pushed notifications.

use crate::components::{ContentScanner, LocalScan};
use crate::content::ContentRecord;
use crate::highlight::HighlightPattern;
use crate::remote::RemoteAssessment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Who asked for a scan: a window, tab or CLI session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("content target is not initialized")]
    NotInitialized,
    #[error("content target unreachable: {0}")]
    Unreachable(String),
}

/// Fire-and-forget pushes from the orchestrator to a content target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNotification {
    Assessment(RemoteAssessment),
    Highlight { phrases: Vec<String> },
}

#[async_trait]
pub trait ContentTarget: Send + Sync {
    /// Run extraction and heuristic scoring over the current content.
    async fn scan(&self) -> Result<LocalScan, TargetError>;

    /// (Re)install the content-side agent.
    async fn inject(&self) -> Result<(), TargetError>;

    async fn notify(&self, notification: ContentNotification) -> Result<(), TargetError>;
}

/// Finds the live content target for a caller.
pub trait ContentHost: Send + Sync {
    fn locate(&self, caller: &CallerId) -> Option<Arc<dyn ContentTarget>>;
}

/// In-process content target over a fixed record.
///
/// Notifications are forwarded on the channel returned by the constructor.
pub struct LocalContentTarget {
    record: ContentRecord,
    scanner: Arc<ContentScanner>,
    initialized: AtomicBool,
    injections: AtomicUsize,
    notifications: mpsc::UnboundedSender<ContentNotification>,
}

impl LocalContentTarget {
    pub fn new(
        record: ContentRecord,
        scanner: Arc<ContentScanner>,
    ) -> (Self, mpsc::UnboundedReceiver<ContentNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                record,
                scanner,
                initialized: AtomicBool::new(true),
                injections: AtomicUsize::new(0),
                notifications: sender,
            },
            receiver,
        )
    }

    /// A target whose agent has not been installed yet.
    pub fn uninitialized(
        record: ContentRecord,
        scanner: Arc<ContentScanner>,
    ) -> (Self, mpsc::UnboundedReceiver<ContentNotification>) {
        let (target, receiver) = Self::new(record, scanner);
        target.initialized.store(false, Ordering::SeqCst);
        (target, receiver)
    }

    pub fn injections(&self) -> usize {
        self.injections.load(Ordering::SeqCst)
    }

    pub fn record(&self) -> &ContentRecord {
        &self.record
    }
}

#[async_trait]
impl ContentTarget for LocalContentTarget {
    async fn scan(&self) -> Result<LocalScan, TargetError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(TargetError::NotInitialized);
        }
        Ok(self.scanner.scan(&self.record))
    }

    async fn inject(&self) -> Result<(), TargetError> {
        self.injections.fetch_add(1, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn notify(&self, notification: ContentNotification) -> Result<(), TargetError> {
        if let ContentNotification::Highlight { phrases } = &notification {
            let marks = HighlightPattern::new(phrases)
                .map(|pattern| pattern.spans(&self.record.full_text()).len())
                .unwrap_or(0);
            log::debug!("Highlighting {} phrase(s), {} mark(s)", phrases.len(), marks);
        }
        self.notifications
            .send(notification)
            .map_err(|_| TargetError::Unreachable("notification channel closed".to_string()))
    }
}

/// Host with an explicit caller → target registry.
#[derive(Default)]
pub struct StaticContentHost {
    targets: RwLock<HashMap<CallerId, Arc<dyn ContentTarget>>>,
}

impl StaticContentHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, caller: CallerId, target: Arc<dyn ContentTarget>) {
        if let Ok(mut targets) = self.targets.write() {
            targets.insert(caller, target);
        }
    }

    pub fn remove(&self, caller: &CallerId) {
        if let Ok(mut targets) = self.targets.write() {
            targets.remove(caller);
        }
    }
}

impl ContentHost for StaticContentHost {
    fn locate(&self, caller: &CallerId) -> Option<Arc<dyn ContentTarget>> {
        self.targets.read().ok()?.get(caller).cloned()
    }
}
