//! Slippage-bounded arbitrage analysis across two order books
//!
//! Pure function of the two books and the fee/slippage parameters: equal
//! inputs produce equal outputs. Both trade directions are evaluated; a
//! direction is a candidate only when its cross-venue spread is strictly
//! negative (the buy side is cheaper than the sell side). Profitability is
//! computed here but filtering happens in the watcher.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::adapters::types::{OrderBook, PriceLevel, Venue};
use crate::config::types::{SlippageMode, DYNAMIC_FEE_SENTINEL};

/// Notional ceiling per fill plan, in quote currency (MYR). Applies to the
/// buy side only; the sell side is clamped to the buy volume.
pub const MAX_QUOTE: Decimal = dec!(5000);

// =============================================================================
// Types
// =============================================================================

/// A candidate cross-exchange trade with its fill plans and fee-adjusted
/// profit estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    pub pair: String,
    pub buy_on: Venue,
    pub sell_on: Venue,
    /// Volume-weighted average buy price
    pub buy_price: Decimal,
    pub buy_volume: Decimal,
    pub buy_fee: Decimal,
    /// Quote spent including taker fee
    pub total_buy_price: Decimal,
    /// Volume-weighted average sell price
    pub sell_price: Decimal,
    pub sell_volume: Decimal,
    pub sell_fee: Decimal,
    /// Quote received net of taker fee
    pub total_sell_price: Decimal,
    pub price_diff: Decimal,
    /// On-chain withdrawal fee in base units
    pub native_transfer_fee: Decimal,
    /// Withdrawal fee converted to quote at the buy price
    pub transfer_fee: Decimal,
    pub net_profit: Decimal,
    pub profitable: bool,
    pub buy_orders: Vec<PriceLevel>,
    pub sell_orders: Vec<PriceLevel>,
    /// The withdrawal fee was the runtime-query sentinel and must be
    /// resolved before the final profit figure
    pub is_dynamic_transfer_fee: bool,
}

impl ArbitrageOpportunity {
    /// Derived-field contract for net profit
    pub fn computed_net_profit(&self) -> Decimal {
        self.total_sell_price - self.total_buy_price - self.transfer_fee
    }
}

/// Fee and slippage parameters for one analysis call
#[derive(Debug, Clone)]
pub struct AnalyzeParams {
    /// Taker fee on the first book's venue
    pub first_taker_fee: Decimal,
    /// Taker fee on the second book's venue
    pub second_taker_fee: Decimal,
    /// Configured withdrawal fee in base units; the -1 sentinel means
    /// "resolve at runtime" and is treated as zero for planning
    pub withdraw_fee: Decimal,
    pub slippage_mode: SlippageMode,
    pub slippage: Decimal,
}

#[derive(Error, Debug, PartialEq)]
pub enum AnalyzeError {
    #[error("pair mismatch: {first} != {second}")]
    PairMismatch { first: String, second: String },

    #[error("empty order book for {pair} on {venue}")]
    EmptyBook { venue: Venue, pair: String },
}

/// Reasons a direction produced no fill plan. Not an error condition; the
/// direction simply yields no opportunity.
#[derive(Debug, PartialEq, Eq)]
enum FillError {
    NoEligibleAsks,
    NoEligibleBids,
}

// =============================================================================
// Analysis
// =============================================================================

/// Analyze both trade directions across two order books.
///
/// Returns zero, one, or two opportunities, each with `profitable`
/// computed from the derived-field contract.
pub fn analyze(
    first: &OrderBook,
    second: &OrderBook,
    params: &AnalyzeParams,
) -> Result<Vec<ArbitrageOpportunity>, AnalyzeError> {
    if first.pair != second.pair {
        return Err(AnalyzeError::PairMismatch {
            first: first.pair.clone(),
            second: second.pair.clone(),
        });
    }
    for book in [first, second] {
        if book.asks.is_empty() || book.bids.is_empty() {
            return Err(AnalyzeError::EmptyBook {
                venue: book.venue,
                pair: book.pair.clone(),
            });
        }
    }

    let is_dynamic = params.withdraw_fee == DYNAMIC_FEE_SENTINEL;
    let planning_fee = if is_dynamic {
        Decimal::ZERO
    } else {
        params.withdraw_fee
    };

    let mut output = Vec::new();

    // Buy on the second venue, sell on the first
    if second.asks[0].price - first.bids[0].price < Decimal::ZERO {
        if let Some(opportunity) = build_opportunity(
            second,
            first,
            params.second_taker_fee,
            params.first_taker_fee,
            planning_fee,
            is_dynamic,
            params,
        ) {
            output.push(opportunity);
        }
    }

    // Buy on the first venue, sell on the second
    if first.asks[0].price - second.bids[0].price < Decimal::ZERO {
        if let Some(opportunity) = build_opportunity(
            first,
            second,
            params.first_taker_fee,
            params.second_taker_fee,
            planning_fee,
            is_dynamic,
            params,
        ) {
            output.push(opportunity);
        }
    }

    Ok(output)
}

/// Build one directional opportunity, or nothing when the slippage window
/// or the transfer fee leaves no tradable volume.
#[allow(clippy::too_many_arguments)]
fn build_opportunity(
    buy_book: &OrderBook,
    sell_book: &OrderBook,
    buy_taker_fee: Decimal,
    sell_taker_fee: Decimal,
    transfer_fee: Decimal,
    is_dynamic: bool,
    params: &AnalyzeParams,
) -> Option<ArbitrageOpportunity> {
    let (buy_orders, sell_orders) = match generate_potential_limit_order(
        buy_book,
        sell_book,
        transfer_fee,
        params.slippage_mode,
        params.slippage,
    ) {
        Ok(plan) => plan,
        Err(reason) => {
            debug!(
                pair = %buy_book.pair,
                buy_on = %buy_book.venue,
                sell_on = %sell_book.venue,
                reason = ?reason,
                "No fill plan within slippage"
            );
            return None;
        }
    };

    // The transfer fee consumed the whole eligible volume
    if buy_orders.is_empty() || sell_orders.is_empty() {
        return None;
    }

    let (buy_volume, buy_amount) = fill_totals(&buy_orders);
    let (sell_volume, sell_amount) = fill_totals(&sell_orders);

    let buy_price = buy_amount / buy_volume;
    let buy_fee = buy_amount * buy_taker_fee;
    let total_buy_price = buy_amount + buy_fee;

    let sell_price = sell_amount / sell_volume;
    let sell_fee = sell_amount * sell_taker_fee;
    let total_sell_price = sell_amount - sell_fee;

    let transfer_fee_quote = transfer_fee * buy_price;

    let mut opportunity = ArbitrageOpportunity {
        pair: buy_book.pair.clone(),
        buy_on: buy_book.venue,
        sell_on: sell_book.venue,
        buy_price,
        buy_volume,
        buy_fee,
        total_buy_price,
        sell_price,
        sell_volume,
        sell_fee,
        total_sell_price,
        price_diff: sell_price - buy_price,
        native_transfer_fee: transfer_fee,
        transfer_fee: transfer_fee_quote,
        net_profit: Decimal::ZERO,
        profitable: false,
        buy_orders,
        sell_orders,
        is_dynamic_transfer_fee: is_dynamic,
    };
    opportunity.net_profit = opportunity.computed_net_profit();
    opportunity.profitable = opportunity.net_profit > Decimal::ZERO;

    Some(opportunity)
}

/// Capped, slippage-bounded fill plan construction.
///
/// Scans the buy book's asks ascending within the slippage envelope,
/// accumulating notional against `MAX_QUOTE` (partial last level on the
/// cap), deducts the transfer fee from the bought base volume, clamps to
/// what the sell book's eligible bids can absorb, and builds matching buy
/// and sell fill plans.
fn generate_potential_limit_order(
    buy_book: &OrderBook,
    sell_book: &OrderBook,
    transfer_fee: Decimal,
    slippage_mode: SlippageMode,
    slippage: Decimal,
) -> Result<(Vec<PriceLevel>, Vec<PriceLevel>), FillError> {
    // Step 1: asks within slippage, capped by the notional ceiling
    let lowest_ask = buy_book.asks[0].price;
    let max_ask_price = match slippage_mode {
        SlippageMode::Price => lowest_ask + slippage,
        SlippageMode::Percentage => lowest_ask * (Decimal::ONE + slippage),
    };

    let mut eligible_asks: Vec<PriceLevel> = Vec::new();
    let mut total_buy_amount = Decimal::ZERO;
    for ask in &buy_book.asks {
        if ask.price > max_ask_price {
            break;
        }

        let order_amount = ask.price * ask.volume;
        if total_buy_amount + order_amount > MAX_QUOTE {
            let remaining_quote = MAX_QUOTE - total_buy_amount;
            if remaining_quote > Decimal::ZERO {
                eligible_asks.push(PriceLevel::new(ask.price, remaining_quote / ask.price));
            }
            break;
        }

        eligible_asks.push(ask.clone());
        total_buy_amount += order_amount;
    }

    if eligible_asks.is_empty() {
        return Err(FillError::NoEligibleAsks);
    }

    // Step 2: bids within slippage
    let highest_bid = sell_book.bids[0].price;
    let min_bid_price = match slippage_mode {
        SlippageMode::Price => highest_bid - slippage,
        SlippageMode::Percentage => highest_bid * (Decimal::ONE - slippage),
    };

    let mut eligible_bids: Vec<PriceLevel> = Vec::new();
    for bid in &sell_book.bids {
        if bid.price < min_bid_price {
            break;
        }
        eligible_bids.push(bid.clone());
    }

    if eligible_bids.is_empty() {
        return Err(FillError::NoEligibleBids);
    }

    // Step 3: base volume left after the on-chain transfer
    let mut target_base: Decimal = eligible_asks.iter().map(|l| l.volume).sum();
    target_base -= transfer_fee;
    if target_base <= Decimal::ZERO {
        return Ok((Vec::new(), Vec::new()));
    }

    // Step 4: clamp to the volume the sell side can absorb
    let mut accumulated_bid_volume = Decimal::ZERO;
    let mut final_bid_volume = Decimal::ZERO;
    for bid in &eligible_bids {
        if accumulated_bid_volume + bid.volume >= target_base {
            final_bid_volume = target_base;
            break;
        }
        accumulated_bid_volume += bid.volume;
        final_bid_volume = accumulated_bid_volume;
    }
    if final_bid_volume < target_base {
        target_base = final_bid_volume;
    }

    // Step 5: matching fill plans, last level possibly partial
    Ok((
        clamp_to_volume(&eligible_asks, target_base),
        clamp_to_volume(&eligible_bids, target_base),
    ))
}

/// Walk levels best-first, taking volume until `target` is reached; the
/// last included level may be partial. Also used by the watcher to re-clamp
/// the sell plan after a dynamic transfer fee is resolved.
pub fn clamp_to_volume(levels: &[PriceLevel], target: Decimal) -> Vec<PriceLevel> {
    let mut out = Vec::new();
    let mut accumulated = Decimal::ZERO;
    for level in levels {
        if accumulated >= target {
            break;
        }
        let volume = if accumulated + level.volume > target {
            target - accumulated
        } else {
            level.volume
        };
        if volume > Decimal::ZERO {
            out.push(PriceLevel::new(level.price, volume));
        }
        accumulated += volume;
    }
    out
}

/// Total (volume, quote amount) of a fill plan
pub fn fill_totals(levels: &[PriceLevel]) -> (Decimal, Decimal) {
    let mut volume = Decimal::ZERO;
    let mut amount = Decimal::ZERO;
    for level in levels {
        volume += level.volume;
        amount += level.price * level.volume;
    }
    (volume, amount)
}

// ============================================================================
// Tests
// ============================================================================
