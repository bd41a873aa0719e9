//! Application-wide error types using thiserror
//!
//! All errors surfaced to the binary are wrapped in AppError so callers
//! can match on one type. Only configuration errors are fatal; everything
//! else is handled locally by the watcher or the adapters.

use thiserror::Error;

use crate::adapters::errors::ExchangeError;
use crate::core::state::StateError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Order book state error: {0}")]
    State(#[from] StateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
