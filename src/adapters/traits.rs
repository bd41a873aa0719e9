//! Exchange adapter trait definition
//!
//! The ExchangeAdapter trait is the capability contract every venue
//! implements. REST snapshot fetching and the transfer/deposit/withdraw
//! queries are mandatory; live streaming is an optional capability that
//! REST-only venues leave at the defaults.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use crate::adapters::errors::ExchangeResult;
use crate::adapters::types::{OrderBook, Venue};

/// Common trait for all exchange adapters
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Venue identifier
    fn name(&self) -> Venue;

    /// Fetch a fresh order book snapshot over REST.
    ///
    /// The returned book has asks sorted ascending and bids descending.
    /// Fails with `EmptyBook` when either side has no levels.
    async fn get_order_book(&self, pair: &str) -> ExchangeResult<OrderBook>;

    /// Whether `subscribe_stream` maintains a live book for this venue
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Open the venue's order book stream for `pair` and drive the
    /// internal state engine until the shutdown signal fires.
    ///
    /// Returns immediately after subscription setup; the reader runs as a
    /// background task. REST-only venues keep the no-op default.
    async fn subscribe_stream(
        &self,
        shutdown: broadcast::Receiver<()>,
        pair: &str,
    ) -> ExchangeResult<()> {
        let _ = (shutdown, pair);
        Ok(())
    }

    /// Latest live projection for `pair`, if a stream is live
    async fn live_order_book(&self, pair: &str) -> Option<OrderBook> {
        let _ = pair;
        None
    }

    /// On-chain withdrawal fee in base units for sending `amount` of the
    /// pair's base asset to `address`. Venues either serve the configured
    /// static value or query their API; the -1 sentinel means the fee
    /// could not be determined.
    async fn get_transfer_fee(
        &self,
        pair: &str,
        address: &str,
        amount: Decimal,
    ) -> ExchangeResult<Decimal>;

    /// Minimum withdrawal amount in base units
    async fn get_withdraw_min(&self, pair: &str) -> ExchangeResult<Decimal>;

    /// Minimum deposit amount in base units
    async fn get_deposit_min(&self, pair: &str) -> ExchangeResult<Decimal>;

    /// Deposit address for the pair's base asset on this venue
    async fn get_deposit_address(&self, pair: &str) -> ExchangeResult<String>;
}
