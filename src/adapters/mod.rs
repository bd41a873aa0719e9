//! Exchange adapters and the shared types they build on

pub mod errors;
pub mod hata;
pub mod luno;
pub mod test_utils;
pub mod traits;
pub mod types;
pub mod ws;

pub use traits::ExchangeAdapter;
pub use types::{OrderBook, PriceLevel, Venue};

use rust_decimal::Decimal;

use crate::config::types::{Config, DYNAMIC_FEE_SENTINEL};

/// Configured minimum withdrawal for (venue, pair); zero when unconfigured
pub(crate) fn config_withdraw_min(config: &Config, venue: Venue, pair: &str) -> Decimal {
    config
        .crypto(venue, pair)
        .map(|c| c.withdraw_min_amount)
        .unwrap_or(Decimal::ZERO)
}

/// Configured minimum deposit for (venue, pair); zero when unconfigured
pub(crate) fn config_deposit_min(config: &Config, venue: Venue, pair: &str) -> Decimal {
    config
        .crypto(venue, pair)
        .map(|c| c.deposit_min_amount)
        .unwrap_or(Decimal::ZERO)
}

/// Configured deposit address for (venue, pair); empty when unconfigured
pub(crate) fn config_deposit_address(config: &Config, venue: Venue, pair: &str) -> String {
    config
        .crypto(venue, pair)
        .map(|c| c.address.clone())
        .unwrap_or_default()
}

/// Configured static withdrawal fee; the -1 sentinel when unconfigured so
/// callers fall back to a runtime query
pub(crate) fn config_withdraw_fee(config: &Config, venue: Venue, pair: &str) -> Decimal {
    config
        .crypto(venue, pair)
        .map(|c| c.withdraw_fee)
        .unwrap_or(DYNAMIC_FEE_SENTINEL)
}
