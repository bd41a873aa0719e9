//! Cross-exchange spot arbitrage watcher for Malaysian crypto markets
//!
//! - Exchange adapters (Luno with streaming, Hata REST-only)
//! - Order book state engine with sequence-validated incremental updates
//! - Slippage-bounded fill planning and fee-adjusted profit analysis
//! - Scheduled watcher with parallel fetches and Discord alerting

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;

pub use error::AppError;
