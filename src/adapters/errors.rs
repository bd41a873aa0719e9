//! Exchange adapter error types
//!
//! All venue-facing failures are wrapped in ExchangeError. Transport and
//! decode errors recover locally (the watcher skips the tick, streaming
//! resubscribes); auth errors are propagated for the caller to decide.

use thiserror::Error;

use crate::adapters::types::Venue;

/// Exchange-specific error types for adapter operations
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Network or transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials rejected by the venue
    #[error("Authentication rejected by {venue}: {reason}")]
    Auth { venue: Venue, reason: String },

    /// Malformed payload from the venue
    #[error("Decode error: {0}")]
    Decode(String),

    /// Snapshot arrived with one or both sides empty
    #[error("Empty order book for {pair} on {venue}")]
    EmptyBook { venue: Venue, pair: String },

    /// Operation exceeded its deadline
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ExchangeError::Decode(err.to_string())
        } else {
            ExchangeError::Transport(err.to_string())
        }
    }
}

/// Result type alias for exchange operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
