//! Core pipeline: book state engine, analyzer, watcher, and alerting

pub mod alerter;
pub mod analyzer;
pub mod state;
pub mod watcher;

pub use alerter::Alerter;
pub use analyzer::{analyze, AnalyzeParams, ArbitrageOpportunity};
pub use state::{BookEngine, EngineStatus, StateError};
pub use watcher::Watcher;
