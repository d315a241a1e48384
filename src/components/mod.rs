//! Content-side pipeline: signal extraction followed by heuristic scoring.

pub mod content_scanner;
pub mod decision_engine;

pub use content_scanner::{ContentScanner, LocalScan};
pub use decision_engine::{DecisionEngine, HeuristicResult, Verdict};
