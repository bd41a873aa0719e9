//! Core data types shared by all exchange adapters
//!
//! Venue identifiers, decimal price levels, and the sorted order book
//! representation consumed by the analyzer. Prices are in the quote
//! currency (MYR), volumes in the base asset.

use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// HTTP Client Constants
// =============================================================================

/// HTTP request timeout (seconds)
const HTTP_TIMEOUT_SECS: u64 = 10;
/// Max idle connections per host in connection pool
const HTTP_POOL_MAX_IDLE: usize = 2;
/// How long idle connections stay in the pool (seconds)
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 60;
/// TCP keepalive interval (seconds)
const HTTP_TCP_KEEPALIVE_SECS: u64 = 30;

/// Create a pooled HTTP client for a venue's REST calls
pub fn create_http_client(venue: Venue) -> reqwest::Client {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE)
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .tcp_keepalive(Duration::from_secs(HTTP_TCP_KEEPALIVE_SECS))
        .connect_timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
    tracing::info!(
        phase = "init",
        exchange = %venue,
        pool_max_idle = HTTP_POOL_MAX_IDLE,
        pool_idle_timeout_s = HTTP_POOL_IDLE_TIMEOUT_SECS,
        tcp_keepalive_s = HTTP_TCP_KEEPALIVE_SECS,
        "HTTP client configured"
    );
    client
}

// =============================================================================
// Venue
// =============================================================================

/// Supported spot exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Luno,
    Hata,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Luno => write!(f, "luno"),
            Venue::Hata => write!(f, "hata"),
        }
    }
}

// =============================================================================
// Order Book Types
// =============================================================================

/// A single level in the order book (price + volume)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price in quote currency
    pub price: Decimal,
    /// Volume in base asset at this price
    pub volume: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, volume: Decimal) -> Self {
        Self { price, volume }
    }
}

/// Order book snapshot for one (venue, pair)
///
/// Asks are sorted ascending by price, bids descending. Both invariants
/// are established by the adapters at decode time and preserved by the
/// state engine during streaming updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub venue: Venue,
    pub pair: String,
    /// Ask levels, best (lowest) first
    pub asks: Vec<PriceLevel>,
    /// Bid levels, best (highest) first
    pub bids: Vec<PriceLevel>,
}

impl OrderBook {
    pub fn new(venue: Venue, pair: impl Into<String>) -> Self {
        Self {
            venue,
            pair: pair.into(),
            asks: Vec::new(),
            bids: Vec::new(),
        }
    }

    /// Best (lowest) ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Best (highest) bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Report a crossed book (best ask at or below best bid).
    ///
    /// A crossed top-of-book is a venue data problem; it is logged and left
    /// as-is rather than silently corrected. Returns false when crossed.
    pub fn check_integrity(&self) -> bool {
        if let (Some(ask), Some(bid)) = (self.best_ask(), self.best_bid()) {
            if ask <= bid {
                warn!(
                    exchange = %self.venue,
                    pair = %self.pair,
                    best_ask = %ask,
                    best_bid = %bid,
                    "Crossed order book received from venue"
                );
                return false;
            }
        }
        true
    }
}
