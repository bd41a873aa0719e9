//! Per-(venue, pair) order book state engine
//!
//! Applies an ordered stream of incremental updates (trade / create /
//! delete) against an initial snapshot under a strict sequence contract:
//! every update must carry `sequence == current_sequence + 1`, anything
//! else clears the state and demands a resubscribe.
//!
//! The keyed lists (arrival order, addressed by maker order id) are the
//! authoritative store; the projection is the window-filtered, sorted view
//! handed to the analyzer. Out-of-window levels stay keyed so later trades
//! and deletes referencing them still apply.
//!
//! Mutation is pure CPU; the owning adapter wraps the engine in an async
//! mutex so keyed lists, projection, and sequence are never observed in
//! inconsistent combinations.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::types::{OrderBook, PriceLevel, Venue};

// =============================================================================
// Engine Input Types
// =============================================================================

/// A resting maker order: a price level addressable by order id
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedLevel {
    pub order_id: String,
    pub price: Decimal,
    pub volume: Decimal,
}

impl KeyedLevel {
    pub fn new(order_id: impl Into<String>, price: Decimal, volume: Decimal) -> Self {
        Self {
            order_id: order_id.into(),
            price,
            volume,
        }
    }
}

/// Side of the book an order rests on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Ask,
    Bid,
}

/// Initial full book received when a stream opens
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub sequence: u64,
    pub asks: Vec<KeyedLevel>,
    pub bids: Vec<KeyedLevel>,
}

/// Maker order partially or fully consumed by a taker
#[derive(Debug, Clone)]
pub struct TradeFill {
    pub maker_order_id: String,
    /// Consumed volume in base units
    pub base: Decimal,
}

/// New resting order entering the book
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order_id: String,
    pub side: BookSide,
    pub price: Decimal,
    pub volume: Decimal,
}

/// Resting order cancelled and removed
#[derive(Debug, Clone)]
pub struct DeleteOrder {
    pub order_id: String,
}

/// One sequenced update frame
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub sequence: u64,
    pub trades: Vec<TradeFill>,
    pub create: Option<CreateOrder>,
    pub delete: Option<DeleteOrder>,
}

// =============================================================================
// Errors & Status
// =============================================================================

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    /// A frame arrived out of order; the stream has lost messages
    #[error("sequence gap: expected {expected}, got {actual}")]
    SequenceGap { expected: u64, actual: u64 },

    /// An update was applied before a snapshot established the state
    #[error("update received before snapshot")]
    NotLive,
}

/// Lifecycle of one stream subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Unsubscribed,
    Subscribing,
    AwaitingSnapshot,
    Live,
    Resubscribing,
}

// =============================================================================
// BookEngine
// =============================================================================

/// Live order book state for one (venue, pair)
pub struct BookEngine {
    venue: Venue,
    pair: String,
    max_price_diff: Decimal,
    status: EngineStatus,
    /// Bumped on every resubscribe cycle
    generation: u64,
    current_sequence: u64,
    keyed_asks: Vec<KeyedLevel>,
    keyed_bids: Vec<KeyedLevel>,
    /// Window-filtered asks, sorted ascending
    projected_asks: Vec<KeyedLevel>,
    /// Window-filtered bids, sorted descending
    projected_bids: Vec<KeyedLevel>,
}

impl BookEngine {
    pub fn new(venue: Venue, pair: impl Into<String>, max_price_diff: Decimal) -> Self {
        Self {
            venue,
            pair: pair.into(),
            max_price_diff,
            status: EngineStatus::Unsubscribed,
            generation: 0,
            current_sequence: 0,
            keyed_asks: Vec::new(),
            keyed_bids: Vec::new(),
            projected_asks: Vec::new(),
            projected_bids: Vec::new(),
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_sequence(&self) -> u64 {
        self.current_sequence
    }

    pub fn keyed_asks(&self) -> &[KeyedLevel] {
        &self.keyed_asks
    }

    pub fn keyed_bids(&self) -> &[KeyedLevel] {
        &self.keyed_bids
    }

    /// A new subscription attempt is starting
    pub fn mark_subscribing(&mut self) {
        self.generation += 1;
        self.status = EngineStatus::Subscribing;
        self.log_transition();
    }

    /// Subscription setup done; the next valid frame must be a snapshot
    pub fn mark_awaiting_snapshot(&mut self) {
        self.status = EngineStatus::AwaitingSnapshot;
        self.log_transition();
    }

    /// Initialise the state from a snapshot and go live
    pub fn apply_snapshot(&mut self, snapshot: BookSnapshot) {
        self.current_sequence = snapshot.sequence;
        self.keyed_asks = snapshot.asks;
        self.keyed_bids = snapshot.bids;
        self.rebuild_projection();
        self.status = EngineStatus::Live;
        info!(
            target: "state",
            exchange = %self.venue,
            pair = %self.pair,
            sequence = self.current_sequence,
            asks = self.keyed_asks.len(),
            bids = self.keyed_bids.len(),
            projected_asks = self.projected_asks.len(),
            projected_bids = self.projected_bids.len(),
            "Snapshot applied, engine live"
        );
    }

    /// Apply one sequenced update frame.
    ///
    /// On a sequence gap the state is cleared, the status moves to
    /// `Resubscribing`, and the gap is returned; the caller must close the
    /// stream and resubscribe before any further frame is applied.
    pub fn apply_update(&mut self, update: &BookUpdate) -> Result<(), StateError> {
        if self.status != EngineStatus::Live {
            return Err(StateError::NotLive);
        }

        let expected = self.current_sequence + 1;
        if update.sequence != expected {
            self.clear();
            return Err(StateError::SequenceGap {
                expected,
                actual: update.sequence,
            });
        }
        self.current_sequence = update.sequence;

        for trade in &update.trades {
            self.apply_trade(trade);
        }
        if let Some(create) = &update.create {
            self.apply_create(create);
        }
        if let Some(delete) = &update.delete {
            self.apply_delete(delete);
        }

        debug!(
            target: "state",
            exchange = %self.venue,
            pair = %self.pair,
            sequence = self.current_sequence,
            keyed_asks = self.keyed_asks.len(),
            keyed_bids = self.keyed_bids.len(),
            "Update applied"
        );
        Ok(())
    }

    /// Drop all book state and mark the subscription for renewal
    pub fn clear(&mut self) {
        self.keyed_asks.clear();
        self.keyed_bids.clear();
        self.projected_asks.clear();
        self.projected_bids.clear();
        self.current_sequence = 0;
        self.status = EngineStatus::Resubscribing;
        self.log_transition();
    }

    /// Immutable copy of the projected book
    pub fn order_book(&self) -> OrderBook {
        OrderBook {
            venue: self.venue,
            pair: self.pair.clone(),
            asks: self
                .projected_asks
                .iter()
                .map(|l| PriceLevel::new(l.price, l.volume))
                .collect(),
            bids: self
                .projected_bids
                .iter()
                .map(|l| PriceLevel::new(l.price, l.volume))
                .collect(),
        }
    }

    fn log_transition(&self) {
        info!(
            target: "state",
            exchange = %self.venue,
            pair = %self.pair,
            status = ?self.status,
            generation = self.generation,
            "Engine state transition"
        );
    }

    /// Rebuild the projection from the keyed lists: window-filter around
    /// the best level on each side, then sort. Only done at snapshot time;
    /// live updates maintain sort order incrementally.
    fn rebuild_projection(&mut self) {
        let max_price_diff = self.max_price_diff;
        let best_ask = self.keyed_asks.iter().map(|l| l.price).min();
        let best_bid = self.keyed_bids.iter().map(|l| l.price).max();

        self.projected_asks = match best_ask {
            Some(best) => self
                .keyed_asks
                .iter()
                .filter(|l| ask_within_window(l.price, best, max_price_diff))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        self.projected_asks.sort_by(|a, b| a.price.cmp(&b.price));

        self.projected_bids = match best_bid {
            Some(best) => self
                .keyed_bids
                .iter()
                .filter(|l| bid_within_window(l.price, best, max_price_diff))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        self.projected_bids.sort_by(|a, b| b.price.cmp(&a.price));
    }

    fn apply_trade(&mut self, trade: &TradeFill) {
        // Maker orders live on one side only; asks are searched first
        if apply_trade_to_side(&mut self.keyed_asks, &mut self.projected_asks, trade) {
            return;
        }
        if apply_trade_to_side(&mut self.keyed_bids, &mut self.projected_bids, trade) {
            return;
        }
        // Transient race with a delete for the same order
        warn!(
            exchange = %self.venue,
            pair = %self.pair,
            maker_order_id = %trade.maker_order_id,
            "Trade update for unknown maker order, ignoring"
        );
    }

    fn apply_create(&mut self, create: &CreateOrder) {
        let level = KeyedLevel::new(create.order_id.clone(), create.price, create.volume);
        match create.side {
            BookSide::Ask => {
                let within = match self.projected_asks.first() {
                    Some(best) => ask_within_window(level.price, best.price, self.max_price_diff),
                    None => true,
                };
                self.keyed_asks.push(level.clone());
                if within {
                    let pos = self
                        .projected_asks
                        .partition_point(|l| l.price <= level.price);
                    self.projected_asks.insert(pos, level);
                }
            }
            BookSide::Bid => {
                let within = match self.projected_bids.first() {
                    Some(best) => bid_within_window(level.price, best.price, self.max_price_diff),
                    None => true,
                };
                self.keyed_bids.push(level.clone());
                if within {
                    let pos = self
                        .projected_bids
                        .partition_point(|l| l.price >= level.price);
                    self.projected_bids.insert(pos, level);
                }
            }
        }
    }

    fn apply_delete(&mut self, delete: &DeleteOrder) {
        if let Some(idx) = self
            .keyed_asks
            .iter()
            .position(|l| l.order_id == delete.order_id)
        {
            self.keyed_asks.remove(idx);
            remove_by_id(&mut self.projected_asks, &delete.order_id);
            return;
        }
        if let Some(idx) = self
            .keyed_bids
            .iter()
            .position(|l| l.order_id == delete.order_id)
        {
            self.keyed_bids.remove(idx);
            remove_by_id(&mut self.projected_bids, &delete.order_id);
        }
    }
}

/// Ask inclusion test: within `max_price_diff` of the best ask
fn ask_within_window(price: Decimal, best: Decimal, max_price_diff: Decimal) -> bool {
    if best <= Decimal::ZERO {
        return true;
    }
    (price - best) / best <= max_price_diff
}

/// Bid inclusion test: within `max_price_diff` of the best bid
fn bid_within_window(price: Decimal, best: Decimal, max_price_diff: Decimal) -> bool {
    if best <= Decimal::ZERO {
        return true;
    }
    (best - price) / best <= max_price_diff
}

/// Decrement or remove the maker order on one side. Keyed list and
/// projection mutate together; returns false when the id is not keyed here.
fn apply_trade_to_side(
    keyed: &mut Vec<KeyedLevel>,
    projected: &mut Vec<KeyedLevel>,
    trade: &TradeFill,
) -> bool {
    let Some(idx) = keyed
        .iter()
        .position(|l| l.order_id == trade.maker_order_id)
    else {
        return false;
    };

    let remaining = keyed[idx].volume - trade.base;
    if remaining <= Decimal::ZERO {
        keyed.remove(idx);
        remove_by_id(projected, &trade.maker_order_id);
    } else {
        keyed[idx].volume = remaining;
        if let Some(pos) = projected
            .iter()
            .position(|l| l.order_id == trade.maker_order_id)
        {
            projected[pos].volume = remaining;
        }
    }
    true
}

fn remove_by_id(levels: &mut Vec<KeyedLevel>, order_id: &str) {
    if let Some(pos) = levels.iter().position(|l| l.order_id == order_id) {
        levels.remove(pos);
    }
}

// ============================================================================
// Tests
// ============================================================================
