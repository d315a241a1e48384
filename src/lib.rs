pub mod api;
pub mod components;
pub mod config;
pub mod content;
pub mod domain_utils;
pub mod features;
pub mod highlight;
pub mod orchestrator;
pub mod preferences;
pub mod presentation;
pub mod remote;
pub mod server;
pub mod watcher;

pub use components::{ContentScanner, DecisionEngine, HeuristicResult, LocalScan, Verdict};
pub use config::HookedConfig;
pub use content::{ContentRecord, Link};
pub use features::{SignalEngine, SignalSet};
pub use orchestrator::{CallerId, ScanOrchestrator, ScanOutcome, ScanResponse};
pub use remote::{RemoteAssessment, RemoteScorer, Unavailable};
