//! Luno exchange adapter (REST + streaming)
//!
//! REST snapshots and the dynamic send-fee query use basic-auth HTTP.
//! Streaming dials `wss://…/stream/{PAIR}`, sends the credentials frame,
//! and drives one `BookEngine` per pair: the first frame with both sides
//! is the snapshot, every later frame is a sequenced update. A sequence
//! gap or transport failure closes the socket, clears the engine, and
//! resubscribes the same pair with exponential backoff.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex, Notify, RwLock};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::traits::ExchangeAdapter;
use crate::adapters::types::{create_http_client, OrderBook, PriceLevel, Venue};
use crate::adapters::ws::{connect_tls, TlsWebSocketStream};
use crate::adapters::{config_deposit_address, config_deposit_min, config_withdraw_min};
use crate::config::types::Config;
use crate::core::state::{BookEngine, EngineStatus, StateError};
use crate::error::AppError;

use super::types::{
    AuthRequest, FeedSnapshot, FeedUpdate, RestOrderBookResponse, SendFeeResponse,
};

const LUNO_API_BASE_URL: &str = "https://api.luno.com";
const LUNO_WS_BASE_URL: &str = "wss://ws.luno.com/api/1/stream/";

/// Reconnect backoff: min(500ms * 2^attempt, 5s)
const RECONNECT_BACKOFF_BASE_MS: u64 = 500;
const RECONNECT_BACKOFF_CAP_MS: u64 = 5_000;

/// Quote currency suffix used to derive the base asset from a pair
const QUOTE_SUFFIX: &str = "MYR";

type SharedEngines = Arc<RwLock<HashMap<String, Arc<Mutex<BookEngine>>>>>;

/// Base asset of a pair like "SOLMYR" → "SOL"
fn base_asset(pair: &str) -> &str {
    match pair.strip_suffix(QUOTE_SUFFIX) {
        Some(base) if !base.is_empty() => base,
        _ => pair,
    }
}

pub struct LunoAdapter {
    http: reqwest::Client,
    api_base_url: String,
    ws_base_url: String,
    api_key_id: String,
    api_key_secret: String,
    config: Arc<Config>,
    /// One engine per subscribed pair, each behind its own mutex
    engines: SharedEngines,
    /// Fired on every successful book mutation; readers poll the latest
    /// projection, missed notifications are intentionally dropped
    book_notify: Arc<Notify>,
}

impl LunoAdapter {
    pub fn new(config: Arc<Config>) -> Result<Self, AppError> {
        let exchange = config
            .exchange(Venue::Luno)
            .ok_or_else(|| AppError::Config("missing exchange.luno section".to_string()))?;

        Ok(Self {
            http: create_http_client(Venue::Luno),
            api_base_url: LUNO_API_BASE_URL.to_string(),
            ws_base_url: LUNO_WS_BASE_URL.to_string(),
            api_key_id: exchange.api_key.clone(),
            api_key_secret: exchange.api_secret.clone(),
            config,
            engines: Arc::new(RwLock::new(HashMap::new())),
            book_notify: Arc::new(Notify::new()),
        })
    }

    /// Notification handle fired on every applied stream mutation
    pub fn book_notify(&self) -> Arc<Notify> {
        Arc::clone(&self.book_notify)
    }

    async fn engine_for(&self, pair: &str) -> Arc<Mutex<BookEngine>> {
        let mut engines = self.engines.write().await;
        engines
            .entry(pair.to_string())
            .or_insert_with(|| {
                let max_price_diff = self
                    .config
                    .market
                    .get(pair)
                    .map(|m| m.max_price_diff)
                    .unwrap_or(Decimal::MAX);
                Arc::new(Mutex::new(BookEngine::new(Venue::Luno, pair, max_price_diff)))
            })
            .clone()
    }

    fn parse_order_book(pair: &str, body: &str) -> ExchangeResult<OrderBook> {
        let decoded: RestOrderBookResponse = serde_json::from_str(body)
            .map_err(|e| ExchangeError::Decode(format!("luno order book: {}", e)))?;

        let mut book = OrderBook::new(Venue::Luno, pair);
        book.asks = decoded
            .asks
            .into_iter()
            .map(|l| PriceLevel::new(l.price, l.volume))
            .collect();
        book.bids = decoded
            .bids
            .into_iter()
            .map(|l| PriceLevel::new(l.price, l.volume))
            .collect();

        book.asks.sort_by(|a, b| a.price.cmp(&b.price));
        book.bids.sort_by(|a, b| b.price.cmp(&a.price));

        if book.asks.is_empty() || book.bids.is_empty() {
            return Err(ExchangeError::EmptyBook {
                venue: Venue::Luno,
                pair: pair.to_string(),
            });
        }
        book.check_integrity();

        Ok(book)
    }

    fn check_status(status: reqwest::StatusCode) -> ExchangeResult<()> {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ExchangeError::Auth {
                venue: Venue::Luno,
                reason: format!("HTTP {}", status),
            });
        }
        if !status.is_success() {
            return Err(ExchangeError::Transport(format!("HTTP {} from luno", status)));
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeAdapter for LunoAdapter {
    fn name(&self) -> Venue {
        Venue::Luno
    }

    async fn get_order_book(&self, pair: &str) -> ExchangeResult<OrderBook> {
        let url = format!("{}/api/1/orderbook?pair={}", self.api_base_url, pair);

        info!(exchange = "luno", pair = %pair, "Fetching order book snapshot");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key_id, Some(&self.api_key_secret))
            .send()
            .await
            .map_err(ExchangeError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(ExchangeError::from)?;
        info!(target: "scraping", exchange = "luno", pair = %pair, body = %body, "Order book response");

        Self::check_status(status)?;
        Self::parse_order_book(pair, &body)
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn subscribe_stream(
        &self,
        shutdown: broadcast::Receiver<()>,
        pair: &str,
    ) -> ExchangeResult<()> {
        let engine = self.engine_for(pair).await;
        let auth_frame = serde_json::to_string(&AuthRequest {
            api_key_id: &self.api_key_id,
            api_key_secret: &self.api_key_secret,
        })
        .map_err(|e| ExchangeError::Decode(e.to_string()))?;

        info!(exchange = "luno", pair = %pair, "Subscribing to order book stream");

        tokio::spawn(stream_task(
            self.ws_base_url.clone(),
            auth_frame,
            pair.to_string(),
            engine,
            Arc::clone(&self.book_notify),
            shutdown,
        ));

        Ok(())
    }

    async fn live_order_book(&self, pair: &str) -> Option<OrderBook> {
        let engine = {
            let engines = self.engines.read().await;
            engines.get(pair)?.clone()
        };
        let engine = engine.lock().await;
        if engine.status() == EngineStatus::Live {
            Some(engine.order_book())
        } else {
            None
        }
    }

    async fn get_transfer_fee(
        &self,
        pair: &str,
        address: &str,
        amount: Decimal,
    ) -> ExchangeResult<Decimal> {
        let url = format!("{}/api/1/send_fee", self.api_base_url);
        let amount = amount.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("currency", base_asset(pair)),
                ("address", address),
                ("amount", amount.as_str()),
            ])
            .basic_auth(&self.api_key_id, Some(&self.api_key_secret))
            .send()
            .await
            .map_err(ExchangeError::from)?;

        Self::check_status(response.status())?;

        let decoded: SendFeeResponse = response.json().await.map_err(ExchangeError::from)?;
        Ok(decoded.fee)
    }

    async fn get_withdraw_min(&self, pair: &str) -> ExchangeResult<Decimal> {
        Ok(config_withdraw_min(&self.config, Venue::Luno, pair))
    }

    async fn get_deposit_min(&self, pair: &str) -> ExchangeResult<Decimal> {
        Ok(config_deposit_min(&self.config, Venue::Luno, pair))
    }

    async fn get_deposit_address(&self, pair: &str) -> ExchangeResult<String> {
        Ok(config_deposit_address(&self.config, Venue::Luno, pair))
    }
}

// =============================================================================
// Stream reader task
// =============================================================================

enum FrameOutcome {
    Continue,
    Resubscribe,
}

/// Background task owning the WebSocket for one pair.
///
/// Holds no engine lock while awaiting I/O; each frame takes the per-state
/// mutex only for the synchronous mutation.
async fn stream_task(
    ws_base_url: String,
    auth_frame: String,
    pair: String,
    engine: Arc<Mutex<BookEngine>>,
    notify: Arc<Notify>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let url = format!("{}{}", ws_base_url, pair);
    let mut attempt: u32 = 0;

    loop {
        engine.lock().await.mark_subscribing();

        let mut stream = match connect_tls(&url).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(exchange = "luno", pair = %pair, error = %e, "WebSocket connect failed");
                attempt += 1;
                if wait_backoff(attempt, &mut shutdown).await {
                    return;
                }
                continue;
            }
        };

        if let Err(e) = stream.send(Message::Text(auth_frame.clone())).await {
            error!(exchange = "luno", pair = %pair, error = %e, "Failed to send credentials frame");
            attempt += 1;
            if wait_backoff(attempt, &mut shutdown).await {
                return;
            }
            continue;
        }

        engine.lock().await.mark_awaiting_snapshot();
        attempt = 0;

        if read_until_resubscribe(&mut stream, &pair, &engine, &notify, &mut shutdown).await {
            // Cooperative shutdown
            let _ = stream.close(None).await;
            info!(exchange = "luno", pair = %pair, "Stream reader stopped");
            return;
        }

        // Gap or transport failure: close, clear, and go around again
        let _ = stream.close(None).await;
        {
            let mut engine = engine.lock().await;
            if engine.status() != EngineStatus::Resubscribing {
                engine.clear();
            }
        }
        attempt += 1;
        if wait_backoff(attempt, &mut shutdown).await {
            return;
        }
    }
}

/// Read frames until shutdown (returns true) or a condition requiring a
/// resubscribe (returns false).
async fn read_until_resubscribe(
    stream: &mut TlsWebSocketStream,
    pair: &str,
    engine: &Arc<Mutex<BookEngine>>,
    notify: &Arc<Notify>,
    shutdown: &mut broadcast::Receiver<()>,
) -> bool {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!(exchange = "luno", pair = %pair, "Shutdown received, closing stream");
                return true;
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        // Keep-alive frames are empty
                        if text.trim().is_empty() {
                            continue;
                        }
                        match process_frame(engine, notify, pair, &text).await {
                            FrameOutcome::Continue => {}
                            FrameOutcome::Resubscribe => return false,
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        warn!(exchange = "luno", pair = %pair, "Stream closed by venue");
                        return false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(exchange = "luno", pair = %pair, error = %e, "Stream read error");
                        return false;
                    }
                    None => {
                        warn!(exchange = "luno", pair = %pair, "Stream ended");
                        return false;
                    }
                }
            }
        }
    }
}

/// Apply one text frame to the engine
async fn process_frame(
    engine: &Arc<Mutex<BookEngine>>,
    notify: &Arc<Notify>,
    pair: &str,
    text: &str,
) -> FrameOutcome {
    let mut engine = engine.lock().await;
    match engine.status() {
        EngineStatus::AwaitingSnapshot => {
            match serde_json::from_str::<FeedSnapshot>(text) {
                Ok(snapshot) => {
                    engine.apply_snapshot(snapshot.into_snapshot());
                    notify.notify_waiters();
                }
                Err(e) => {
                    // Not a snapshot; discarded until the snapshot arrives
                    debug!(
                        exchange = "luno",
                        pair = %pair,
                        error = %e,
                        "Discarding frame while awaiting snapshot"
                    );
                }
            }
            FrameOutcome::Continue
        }
        EngineStatus::Live => {
            let update = match serde_json::from_str::<FeedUpdate>(text) {
                Ok(update) => update,
                Err(e) => {
                    error!(exchange = "luno", pair = %pair, error = %e, "Failed to decode update frame");
                    return FrameOutcome::Continue;
                }
            };
            match engine.apply_update(&update.into_update()) {
                Ok(()) => {
                    notify.notify_waiters();
                    FrameOutcome::Continue
                }
                Err(StateError::SequenceGap { expected, actual }) => {
                    error!(
                        exchange = "luno",
                        pair = %pair,
                        expected,
                        actual,
                        "Sequence gap, resubscribing"
                    );
                    FrameOutcome::Resubscribe
                }
                Err(StateError::NotLive) => FrameOutcome::Continue,
            }
        }
        _ => FrameOutcome::Continue,
    }
}

/// Sleep through the reconnect backoff; returns true when shutdown fired
async fn wait_backoff(attempt: u32, shutdown: &mut broadcast::Receiver<()>) -> bool {
    let exp = attempt.saturating_sub(1).min(4);
    let delay = (RECONNECT_BACKOFF_BASE_MS << exp).min(RECONNECT_BACKOFF_CAP_MS);
    tokio::select! {
        _ = shutdown.recv() => true,
        _ = tokio::time::sleep(Duration::from_millis(delay)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_base_asset_from_pair() {
        assert_eq!(base_asset("SOLMYR"), "SOL");
        assert_eq!(base_asset("XRPMYR"), "XRP");
        // Unrecognized shape passes through untouched
        assert_eq!(base_asset("SOLUSD"), "SOLUSD");
        assert_eq!(base_asset("MYR"), "MYR");
    }

    #[test]
    fn test_parse_order_book_sorted() {
        let body = r#"{
            "timestamp": 1,
            "asks": [
                {"price": "1050", "volume": "1"},
                {"price": "1042", "volume": "2"}
            ],
            "bids": [
                {"price": "1030", "volume": "1"},
                {"price": "1041", "volume": "2"}
            ]
        }"#;
        let book = LunoAdapter::parse_order_book("SOLMYR", body).unwrap();
        assert_eq!(book.best_ask(), Some(dec!(1042)));
        assert_eq!(book.best_bid(), Some(dec!(1041)));
    }

    #[test]
    fn test_parse_order_book_empty_side() {
        let body = r#"{"timestamp": 1, "asks": [{"price": "1", "volume": "1"}], "bids": []}"#;
        let err = LunoAdapter::parse_order_book("SOLMYR", body).unwrap_err();
        assert!(matches!(err, ExchangeError::EmptyBook { venue: Venue::Luno, .. }));
    }

    #[test]
    fn test_backoff_progression() {
        // min(500 * 2^(attempt-1), 5000): 500, 1000, 2000, 4000, 5000, 5000…
        let delays: Vec<u64> = (1u32..=6)
            .map(|attempt| {
                let exp = attempt.saturating_sub(1).min(4);
                (RECONNECT_BACKOFF_BASE_MS << exp).min(RECONNECT_BACKOFF_CAP_MS)
            })
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 5000, 5000]);
    }

    #[tokio::test]
    async fn test_process_frame_snapshot_then_update() {
        let engine = Arc::new(Mutex::new(BookEngine::new(
            Venue::Luno,
            "SOLMYR",
            dec!(0.02),
        )));
        let notify = Arc::new(Notify::new());
        {
            let mut e = engine.lock().await;
            e.mark_subscribing();
            e.mark_awaiting_snapshot();
        }

        let snapshot = r#"{
            "sequence": "100",
            "asks": [{"id": "a1", "price": "1000", "volume": "1"}],
            "bids": [{"id": "b1", "price": "999", "volume": "1"}],
            "status": "ACTIVE", "timestamp": 1
        }"#;
        process_frame(&engine, &notify, "SOLMYR", snapshot).await;
        assert_eq!(engine.lock().await.status(), EngineStatus::Live);

        let update = r#"{
            "sequence": "101",
            "create_update": {"order_id": "a2", "type": "ASK", "price": "1001", "volume": "2"},
            "timestamp": 2
        }"#;
        process_frame(&engine, &notify, "SOLMYR", update).await;

        let engine = engine.lock().await;
        assert_eq!(engine.current_sequence(), 101);
        assert_eq!(engine.order_book().asks.len(), 2);
    }

    #[tokio::test]
    async fn test_process_frame_gap_requests_resubscribe() {
        let engine = Arc::new(Mutex::new(BookEngine::new(
            Venue::Luno,
            "SOLMYR",
            dec!(0.02),
        )));
        let notify = Arc::new(Notify::new());
        {
            let mut e = engine.lock().await;
            e.mark_subscribing();
            e.mark_awaiting_snapshot();
        }

        let snapshot = r#"{
            "sequence": "100",
            "asks": [{"id": "a1", "price": "1000", "volume": "1"}],
            "bids": [{"id": "b1", "price": "999", "volume": "1"}]
        }"#;
        process_frame(&engine, &notify, "SOLMYR", snapshot).await;

        let gapped = r#"{"sequence": "103", "timestamp": 3}"#;
        let outcome = process_frame(&engine, &notify, "SOLMYR", gapped).await;
        assert!(matches!(outcome, FrameOutcome::Resubscribe));
        assert_eq!(engine.lock().await.status(), EngineStatus::Resubscribing);
        assert!(engine.lock().await.order_book().asks.is_empty());
    }

    #[tokio::test]
    async fn test_process_frame_discards_update_while_awaiting_snapshot() {
        let engine = Arc::new(Mutex::new(BookEngine::new(
            Venue::Luno,
            "SOLMYR",
            dec!(0.02),
        )));
        let notify = Arc::new(Notify::new());
        {
            let mut e = engine.lock().await;
            e.mark_subscribing();
            e.mark_awaiting_snapshot();
        }

        // An update frame lacks asks/bids → not a snapshot → discarded
        let update = r#"{"sequence": "50", "trade_updates": [], "timestamp": 1}"#;
        process_frame(&engine, &notify, "SOLMYR", update).await;
        assert_eq!(engine.lock().await.status(), EngineStatus::AwaitingSnapshot);
    }
}
