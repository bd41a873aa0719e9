//! Scheduled watcher: periodic parallel fetches, analysis, and filtering
//!
//! In `Scheduled` mode every tick launches one fetch task per exchange for
//! each enabled pair, joined through a bounded channel under the tick
//! interval as deadline. `Stream` mode subscribes streaming venues once
//! and evaluates their live projections on the same cadence, falling back
//! to REST for venues without streams.
//!
//! Every analyzed opportunity is mirrored to the arbitrage log; only
//! candidates that survive the sanity check, transfer-fee resolution, and
//! the minimum-amount/profit thresholds reach the alerter.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::adapters::errors::ExchangeResult;
use crate::adapters::traits::ExchangeAdapter;
use crate::adapters::types::{OrderBook, Venue};
use crate::config::types::{Config, WatchMode, DYNAMIC_FEE_SENTINEL};
use crate::core::alerter::Alerter;
use crate::core::analyzer::{self, AnalyzeParams, ArbitrageOpportunity};

pub struct Watcher {
    config: Arc<Config>,
    exchanges: Vec<Arc<dyn ExchangeAdapter>>,
    pairs: Vec<String>,
    interval: Duration,
    mode: WatchMode,
    alerter: Alerter,
}

impl Watcher {
    pub fn new(
        config: Arc<Config>,
        exchanges: Vec<Arc<dyn ExchangeAdapter>>,
        alerter: Alerter,
    ) -> Self {
        let pairs = config.enabled_pairs();
        let interval = Duration::from_secs(config.watcher.interval_secs);
        let mode = config.watcher.mode;
        Self {
            config,
            exchanges,
            pairs,
            interval,
            mode,
            alerter,
        }
    }

    pub async fn run(&self, shutdown: &broadcast::Sender<()>) {
        match self.mode {
            WatchMode::Scheduled => self.run_scheduled(shutdown.subscribe()).await,
            WatchMode::Stream => self.run_stream(shutdown).await,
        }
    }

    async fn run_scheduled(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval_s = self.interval.as_secs(),
            pairs = ?self.pairs,
            "Watcher started in scheduled mode"
        );

        // First tick fires immediately
        let mut tick = interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Watcher stopping");
                    return;
                }
                _ = tick.tick() => {
                    for pair in &self.pairs {
                        self.watch_pair(pair, false).await;
                    }
                }
            }
        }
    }

    async fn run_stream(&self, shutdown: &broadcast::Sender<()>) {
        for exchange in &self.exchanges {
            if !exchange.supports_streaming() {
                continue;
            }
            for pair in &self.pairs {
                info!(exchange = %exchange.name(), pair = %pair, "Starting stream subscription");
                if let Err(e) = exchange.subscribe_stream(shutdown.subscribe(), pair).await {
                    error!(
                        exchange = %exchange.name(),
                        pair = %pair,
                        error = %e,
                        "Stream subscription failed"
                    );
                }
            }
        }

        info!(
            interval_s = self.interval.as_secs(),
            pairs = ?self.pairs,
            "Watcher started in stream mode"
        );

        let mut shutdown_rx = shutdown.subscribe();
        let mut tick = interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Watcher stopping");
                    return;
                }
                _ = tick.tick() => {
                    for pair in &self.pairs {
                        self.watch_pair(pair, true).await;
                    }
                }
            }
        }
    }

    /// One evaluation cycle for one pair
    async fn watch_pair(&self, pair: &str, use_live: bool) {
        let deadline = Instant::now() + self.interval;

        let books = match self.fetch_order_books(pair, deadline, use_live).await {
            Some(books) => books,
            None => return, // already logged; skip the pair this tick
        };

        let alerts = self.evaluate_books(pair, &books, deadline).await;
        for opportunity in alerts {
            self.alerter.send(&opportunity).await;
        }
    }

    /// Fetch one book per exchange in parallel, joined through a bounded
    /// channel under the tick deadline. Any failure or timeout skips the
    /// pair for this tick.
    pub async fn fetch_order_books(
        &self,
        pair: &str,
        deadline: Instant,
        use_live: bool,
    ) -> Option<Vec<OrderBook>> {
        let (tx, mut rx) = mpsc::channel::<(Venue, ExchangeResult<OrderBook>)>(self.exchanges.len());

        for exchange in &self.exchanges {
            let exchange = Arc::clone(exchange);
            let tx = tx.clone();
            let pair = pair.to_string();
            tokio::spawn(async move {
                let result = if use_live {
                    match exchange.live_order_book(&pair).await {
                        Some(book) => Ok(book),
                        None => exchange.get_order_book(&pair).await,
                    }
                } else {
                    exchange.get_order_book(&pair).await
                };
                let _ = tx.send((exchange.name(), result)).await;
            });
        }
        drop(tx);

        let mut books = Vec::with_capacity(self.exchanges.len());
        for _ in 0..self.exchanges.len() {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some((_, Ok(book)))) => books.push(book),
                Ok(Some((venue, Err(e)))) => {
                    error!(
                        exchange = %venue,
                        pair = %pair,
                        error = %e,
                        "Order book fetch failed, skipping pair this tick"
                    );
                    return None;
                }
                Ok(None) => return None,
                Err(_) => {
                    error!(pair = %pair, "Timed out fetching order books, skipping pair this tick");
                    return None;
                }
            }
        }

        // Completion order is arbitrary; restore the configured venue order
        books.sort_by_key(|b| self.exchanges.iter().position(|e| e.name() == b.venue));
        Some(books)
    }

    /// Analyze every venue pairing and run the filtering pipeline.
    /// Returns the opportunities worth alerting.
    pub async fn evaluate_books(
        &self,
        pair: &str,
        books: &[OrderBook],
        deadline: Instant,
    ) -> Vec<ArbitrageOpportunity> {
        for book in books {
            book.check_integrity();
        }

        let mut alerts = Vec::new();
        for i in 0..books.len() {
            for j in (i + 1)..books.len() {
                let first = &books[i];
                let second = &books[j];

                let Some(params) = self.analyze_params(pair, first.venue, second.venue) else {
                    continue;
                };

                let output = match analyzer::analyze(first, second, &params) {
                    Ok(output) => output,
                    Err(e) => {
                        error!(pair = %pair, error = %e, "Analysis failed");
                        continue;
                    }
                };

                for opportunity in output {
                    debug!(
                        pair = %pair,
                        buy_on = %opportunity.buy_on,
                        sell_on = %opportunity.sell_on,
                        buy_orders = ?opportunity.buy_orders,
                        sell_orders = ?opportunity.sell_orders,
                        "Candidate fill plan"
                    );
                    if let Some(opportunity) = self.filter_opportunity(opportunity, deadline).await
                    {
                        alerts.push(opportunity);
                    }
                }
            }
        }
        alerts
    }

    fn analyze_params(&self, pair: &str, first: Venue, second: Venue) -> Option<AnalyzeParams> {
        let Some(arb) = self.config.arbitrage.get(pair) else {
            warn!(pair = %pair, "No arbitrage settings for pair, skipping");
            return None;
        };
        let first_taker_fee = self.config.exchange(first)?.taker_fee;
        let second_taker_fee = self.config.exchange(second)?.taker_fee;
        // The first venue's configured withdrawal fee seeds the plan; the
        // dynamic sentinel defers to a runtime query on the buy venue
        let withdraw_fee = self
            .config
            .crypto(first, pair)
            .map(|c| c.withdraw_fee)
            .unwrap_or(DYNAMIC_FEE_SENTINEL);

        Some(AnalyzeParams {
            first_taker_fee,
            second_taker_fee,
            withdraw_fee,
            slippage_mode: arb.slippage_mode,
            slippage: arb.slippage,
        })
    }

    /// Sanity check, dynamic fee resolution, and threshold filtering for
    /// one candidate. Returns the candidate when it is worth alerting.
    async fn filter_opportunity(
        &self,
        mut op: ArbitrageOpportunity,
        deadline: Instant,
    ) -> Option<ArbitrageOpportunity> {
        if !passes_sanity(&op) {
            log_opportunity(&op);
            return None;
        }

        let buy_exchange = self.exchange_by_venue(op.buy_on)?;
        let sell_exchange = self.exchange_by_venue(op.sell_on)?;

        if op.is_dynamic_transfer_fee {
            let fee = self
                .resolve_transfer_fee(buy_exchange, sell_exchange, &op, deadline)
                .await?;

            op.native_transfer_fee = fee;
            op.transfer_fee = op.native_transfer_fee * op.buy_price;
            op.sell_volume = op.buy_volume - op.native_transfer_fee;

            // The fee shrinks what arrives on the sell venue; re-clamp the
            // sell plan and refresh its aggregates before the profit figure
            op.sell_orders = analyzer::clamp_to_volume(&op.sell_orders, op.sell_volume);
            let (sell_volume, sell_amount) = analyzer::fill_totals(&op.sell_orders);
            if sell_volume <= Decimal::ZERO {
                info!(
                    pair = %op.pair,
                    native_transfer_fee = %op.native_transfer_fee,
                    "Transfer fee consumes the whole fill, dropping"
                );
                log_opportunity(&op);
                return None;
            }

            let sell_taker_fee = self
                .config
                .exchange(op.sell_on)
                .map(|e| e.taker_fee)
                .unwrap_or(Decimal::ZERO);
            op.sell_price = sell_amount / sell_volume;
            op.sell_fee = sell_amount * sell_taker_fee;
            op.total_sell_price = sell_amount - op.sell_fee;
            op.price_diff = op.sell_price - op.buy_price;
            op.net_profit = op.computed_net_profit();
            op.profitable = op.net_profit > Decimal::ZERO;
        }

        log_opportunity(&op);

        let withdraw_min = match buy_exchange.get_withdraw_min(&op.pair).await {
            Ok(min) => min,
            Err(e) => {
                error!(exchange = %op.buy_on, pair = %op.pair, error = %e, "Failed to get withdrawal minimum");
                return None;
            }
        };
        if op.buy_volume < withdraw_min {
            info!(
                pair = %op.pair,
                buy_volume = %op.buy_volume,
                withdraw_min = %withdraw_min,
                "Buy volume below withdrawal minimum"
            );
            return None;
        }

        let deposit_min = match sell_exchange.get_deposit_min(&op.pair).await {
            Ok(min) => min,
            Err(e) => {
                error!(exchange = %op.sell_on, pair = %op.pair, error = %e, "Failed to get deposit minimum");
                return None;
            }
        };
        if op.sell_volume < deposit_min {
            info!(
                pair = %op.pair,
                sell_volume = %op.sell_volume,
                deposit_min = %deposit_min,
                "Sell volume below deposit minimum"
            );
            return None;
        }

        let min_profit = self
            .config
            .arbitrage
            .get(&op.pair)
            .map(|a| a.min_profit)
            .unwrap_or(Decimal::ZERO);
        if op.profitable && op.net_profit >= min_profit {
            Some(op)
        } else {
            None
        }
    }

    /// Resolve the dynamic transfer fee under the tick deadline: the
    /// deposit address comes from the sell venue, the fee from the buy
    /// venue.
    async fn resolve_transfer_fee(
        &self,
        buy_exchange: &Arc<dyn ExchangeAdapter>,
        sell_exchange: &Arc<dyn ExchangeAdapter>,
        op: &ArbitrageOpportunity,
        deadline: Instant,
    ) -> Option<Decimal> {
        let resolve = async {
            let address = sell_exchange.get_deposit_address(&op.pair).await?;
            buy_exchange
                .get_transfer_fee(&op.pair, &address, op.buy_volume)
                .await
        };

        match timeout_at(deadline, resolve).await {
            Ok(Ok(fee)) if fee >= Decimal::ZERO => Some(fee),
            Ok(Ok(_)) => {
                error!(
                    exchange = %op.buy_on,
                    pair = %op.pair,
                    "Venue could not determine the transfer fee, dropping"
                );
                None
            }
            Ok(Err(e)) => {
                error!(
                    exchange = %op.buy_on,
                    pair = %op.pair,
                    error = %e,
                    "Failed to get transfer fee, dropping"
                );
                None
            }
            Err(_) => {
                error!(
                    exchange = %op.buy_on,
                    pair = %op.pair,
                    "Timed out resolving transfer fee, dropping"
                );
                None
            }
        }
    }

    fn exchange_by_venue(&self, venue: Venue) -> Option<&Arc<dyn ExchangeAdapter>> {
        let found = self.exchanges.iter().find(|e| e.name() == venue);
        if found.is_none() {
            error!(exchange = %venue, "No adapter registered for venue");
        }
        found
    }
}

/// Post-analysis invariants. A violation indicates an analyzer bug, not a
/// recoverable market state; the candidate is dropped with a loud log.
pub fn passes_sanity(op: &ArbitrageOpportunity) -> bool {
    if op.buy_price > op.sell_price {
        error!(
            pair = %op.pair,
            buy_on = %op.buy_on,
            sell_on = %op.sell_on,
            buy_price = %op.buy_price,
            sell_price = %op.sell_price,
            "Invariant violation: buy price above sell price, dropping candidate"
        );
        return false;
    }
    if op.buy_volume != op.sell_volume {
        error!(
            pair = %op.pair,
            buy_on = %op.buy_on,
            sell_on = %op.sell_on,
            buy_volume = %op.buy_volume,
            sell_volume = %op.sell_volume,
            "Invariant violation: buy volume differs from sell volume, dropping candidate"
        );
        return false;
    }
    true
}

/// Mirror every analyzed opportunity to the arbitrage log as JSON
fn log_opportunity(op: &ArbitrageOpportunity) {
    match serde_json::to_string(op) {
        Ok(json) => info!(target: "arbitrage", opportunity = %json, "Opportunity analyzed"),
        Err(e) => error!(error = %e, "Failed to serialize opportunity"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_utils::MockExchange;
    use crate::adapters::types::PriceLevel;
    use rust_decimal_macros::dec;

    const TEST_CONFIG: &str = r#"{
        "market": { "SOLMYR": { "enabled": true, "max_price_diff": 0.02 } },
        "arbitrage": {
            "SOLMYR": { "min_profit": 2, "slippage_mode": "Percentage", "slippage": 0.01 }
        },
        "exchange": {
            "luno": {
                "enabled": true,
                "api_key": "k1", "api_secret": "s1",
                "maker_fee": 0.004, "taker_fee": 0.006,
                "crypto": {
                    "SOLMYR": {
                        "address": "luno-sol-addr",
                        "withdraw_fee": 0.01,
                        "withdraw_min_amount": 0, "deposit_min_amount": 0
                    }
                }
            },
            "hata": {
                "enabled": true,
                "api_key": "k2", "api_secret": "s2",
                "maker_fee": 0.002, "taker_fee": 0.004,
                "crypto": {
                    "SOLMYR": {
                        "address": "hata-sol-addr",
                        "withdraw_fee": 0.01,
                        "withdraw_min_amount": 0, "deposit_min_amount": 0
                    }
                }
            }
        },
        "discord": { "webhook_url": "https://discord.com/api/webhooks/t/t" },
        "watcher": { "interval_secs": 5, "mode": "Scheduled" }
    }"#;

    fn test_config() -> Config {
        serde_json::from_str(TEST_CONFIG).unwrap()
    }

    fn book(venue: Venue, asks: Vec<(Decimal, Decimal)>, bids: Vec<(Decimal, Decimal)>) -> OrderBook {
        let mut ob = OrderBook::new(venue, "SOLMYR");
        ob.asks = asks.into_iter().map(|(p, v)| PriceLevel::new(p, v)).collect();
        ob.bids = bids.into_iter().map(|(p, v)| PriceLevel::new(p, v)).collect();
        ob
    }

    /// Luno carries the deep bids (sell side), Hata the cheap asks (buy side)
    fn luno_book() -> OrderBook {
        book(Venue::Luno, vec![(dec!(1100), dec!(1))], vec![(dec!(1050), dec!(3))])
    }

    fn hata_book() -> OrderBook {
        book(Venue::Hata, vec![(dec!(1000), dec!(2))], vec![(dec!(999), dec!(1))])
    }

    fn watcher(config: Config, luno: MockExchange, hata: MockExchange) -> Watcher {
        let config = Arc::new(config);
        let exchanges: Vec<Arc<dyn ExchangeAdapter>> = vec![Arc::new(luno), Arc::new(hata)];
        let alerter = Alerter::new(config.discord.webhook_url.clone());
        Watcher::new(config, exchanges, alerter)
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    // =========================================================================
    // Pipeline: static fee
    // =========================================================================

    #[tokio::test]
    async fn test_profitable_opportunity_passes_pipeline() {
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata),
        );
        let books = vec![luno_book(), hata_book()];

        let alerts = w.evaluate_books("SOLMYR", &books, far_deadline()).await;
        assert_eq!(alerts.len(), 1);

        let op = &alerts[0];
        assert_eq!(op.buy_on, Venue::Hata);
        assert_eq!(op.sell_on, Venue::Luno);
        // 2 bought minus the 0.01 configured withdrawal fee
        assert_eq!(op.buy_volume, dec!(1.99));
        assert_eq!(op.sell_volume, dec!(1.99));
        assert!(op.profitable);
        assert!(op.net_profit >= dec!(2));
        assert!(!op.is_dynamic_transfer_fee);
    }

    #[tokio::test]
    async fn test_min_profit_threshold_blocks_alert() {
        let mut config = test_config();
        config.arbitrage.get_mut("SOLMYR").unwrap().min_profit = dec!(1000);

        let w = watcher(
            config,
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno_book(), hata_book()], far_deadline())
            .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_unprofitable_candidate_not_alerted() {
        // Narrow the spread so fees eat the profit
        let luno = book(Venue::Luno, vec![(dec!(1100), dec!(1))], vec![(dec!(1001), dec!(3))]);
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno, hata_book()], far_deadline())
            .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_min_blocks_alert() {
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata).with_withdraw_min(dec!(10)),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno_book(), hata_book()], far_deadline())
            .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_deposit_min_blocks_alert() {
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno).with_deposit_min(dec!(10)),
            MockExchange::new(Venue::Hata),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno_book(), hata_book()], far_deadline())
            .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_no_spread_no_alert() {
        let luno = book(Venue::Luno, vec![(dec!(1000), dec!(1))], vec![(dec!(999), dec!(1))]);
        let hata = book(Venue::Hata, vec![(dec!(1001), dec!(1))], vec![(dec!(998), dec!(1))]);
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata),
        );
        let alerts = w.evaluate_books("SOLMYR", &[luno, hata], far_deadline()).await;
        assert!(alerts.is_empty());
    }

    // =========================================================================
    // Pipeline: dynamic fee
    // =========================================================================

    fn dynamic_config() -> Config {
        let mut config = test_config();
        config
            .exchange
            .get_mut(&Venue::Luno)
            .unwrap()
            .crypto
            .get_mut("SOLMYR")
            .unwrap()
            .withdraw_fee = DYNAMIC_FEE_SENTINEL;
        config
    }

    #[tokio::test]
    async fn test_dynamic_fee_resolution_reclamps_sell_side() {
        // Buy on hata → its mock serves the resolved fee
        let w = watcher(
            dynamic_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata).with_transfer_fee(dec!(0.01)),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno_book(), hata_book()], far_deadline())
            .await;
        assert_eq!(alerts.len(), 1);

        let op = &alerts[0];
        assert!(op.is_dynamic_transfer_fee);
        assert_eq!(op.native_transfer_fee, dec!(0.01));
        // Planned with zero fee, so the full 2 were bought
        assert_eq!(op.buy_volume, dec!(2));
        assert_eq!(op.sell_volume, dec!(1.99));
        // Sell plan re-clamped to the post-fee volume
        assert_eq!(op.sell_orders, vec![PriceLevel::new(dec!(1050), dec!(1.99))]);
        assert_eq!(op.transfer_fee, dec!(0.01) * op.buy_price);
        assert_eq!(op.net_profit, op.computed_net_profit());
        assert!(op.profitable);
    }

    #[tokio::test]
    async fn test_dynamic_fee_making_trade_unprofitable_drops_it() {
        let w = watcher(
            dynamic_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata).with_transfer_fee(dec!(0.5)),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno_book(), hata_book()], far_deadline())
            .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_fee_failure_drops_candidate() {
        let w = watcher(
            dynamic_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata).failing_transfer_fee(),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno_book(), hata_book()], far_deadline())
            .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_fee_sentinel_from_venue_drops_candidate() {
        // The venue itself answers with the "cannot determine" sentinel
        let w = watcher(
            dynamic_config(),
            MockExchange::new(Venue::Luno),
            MockExchange::new(Venue::Hata).with_transfer_fee(dec!(-1)),
        );
        let alerts = w
            .evaluate_books("SOLMYR", &[luno_book(), hata_book()], far_deadline())
            .await;
        assert!(alerts.is_empty());
    }

    // =========================================================================
    // Fetch fan-out
    // =========================================================================

    #[tokio::test]
    async fn test_fetch_order_books_in_configured_order() {
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno).with_book(luno_book()),
            MockExchange::new(Venue::Hata).with_book(hata_book()),
        );
        let books = w
            .fetch_order_books("SOLMYR", far_deadline(), false)
            .await
            .unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].venue, Venue::Luno);
        assert_eq!(books[1].venue, Venue::Hata);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_pair() {
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno).with_book(luno_book()),
            MockExchange::new(Venue::Hata).failing_fetch(),
        );
        assert!(w.fetch_order_books("SOLMYR", far_deadline(), false).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_timeout_skips_pair() {
        let w = watcher(
            test_config(),
            MockExchange::new(Venue::Luno).with_book(luno_book()),
            MockExchange::new(Venue::Hata)
                .with_book(hata_book())
                .with_fetch_delay(Duration::from_millis(200)),
        );
        let deadline = Instant::now() + Duration::from_millis(20);
        assert!(w.fetch_order_books("SOLMYR", deadline, false).await.is_none());
    }

    // =========================================================================
    // Sanity check
    // =========================================================================

    fn hand_built_op() -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            pair: "SOLMYR".to_string(),
            buy_on: Venue::Hata,
            sell_on: Venue::Luno,
            buy_price: dec!(1000),
            buy_volume: dec!(1),
            buy_fee: dec!(4),
            total_buy_price: dec!(1004),
            sell_price: dec!(1050),
            sell_volume: dec!(1),
            sell_fee: dec!(6.3),
            total_sell_price: dec!(1043.7),
            price_diff: dec!(50),
            native_transfer_fee: Decimal::ZERO,
            transfer_fee: Decimal::ZERO,
            net_profit: dec!(39.7),
            profitable: true,
            buy_orders: vec![PriceLevel::new(dec!(1000), dec!(1))],
            sell_orders: vec![PriceLevel::new(dec!(1050), dec!(1))],
            is_dynamic_transfer_fee: false,
        }
    }

    #[test]
    fn test_sanity_accepts_consistent_candidate() {
        assert!(passes_sanity(&hand_built_op()));
    }

    #[test]
    fn test_sanity_rejects_inverted_prices() {
        let mut op = hand_built_op();
        op.buy_price = dec!(2000);
        assert!(!passes_sanity(&op));
    }

    #[test]
    fn test_sanity_rejects_volume_mismatch() {
        let mut op = hand_built_op();
        op.sell_volume = dec!(0.9);
        assert!(!passes_sanity(&op));
    }
}
