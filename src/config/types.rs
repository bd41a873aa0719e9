//! Configuration types for the arbitrage watcher
//!
//! The configuration is a single JSON object loaded once at startup and
//! shared read-only via `Arc<Config>` afterwards. Every rule is validated
//! eagerly by `Config::validate` so a malformed file fails the process
//! before any task starts.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::adapters::types::Venue;
use crate::error::AppError;

/// Sentinel value for `withdraw_fee` meaning "query the venue at runtime"
pub const DYNAMIC_FEE_SENTINEL: Decimal = dec!(-1);

// ============================================================================
// Enums
// ============================================================================

/// How the slippage envelope around the best level is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlippageMode {
    /// Absolute bound in quote currency units
    Price,
    /// Relative bound as a fraction of the best price
    Percentage,
}

/// Watcher operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WatchMode {
    /// Poll REST snapshots on a fixed interval
    #[default]
    Scheduled,
    /// Subscribe to venue streams and evaluate live projections
    Stream,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Per-pair market settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Whether the pair is watched at all
    pub enabled: bool,
    /// Fraction (0.02 = 2%) clipping far-from-top levels out of the
    /// projected book
    pub max_price_diff: Decimal,
}

/// Per-pair arbitrage thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    /// Minimum net profit in quote currency before alerting
    pub min_profit: Decimal,
    pub slippage_mode: SlippageMode,
    pub slippage: Decimal,
}

/// Per-asset transfer settings for one venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Deposit address on this venue
    pub address: String,
    /// Destination memo/tag where the chain requires one
    #[serde(default)]
    pub memo: Option<String>,
    /// On-chain withdrawal fee in base units; -1 means query at runtime
    pub withdraw_fee: Decimal,
    pub withdraw_min_amount: Decimal,
    pub deposit_min_amount: Decimal,
}

impl CryptoConfig {
    /// Whether the withdrawal fee must be resolved from the venue API
    pub fn is_dynamic_withdraw_fee(&self) -> bool {
        self.withdraw_fee == DYNAMIC_FEE_SENTINEL
    }
}

/// Per-venue credentials and fee schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub enabled: bool,
    pub api_key: String,
    pub api_secret: String,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    #[serde(default)]
    pub crypto: HashMap<String, CryptoConfig>,
}

/// Discord alerting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
}

/// Watcher loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Tick interval; also the per-tick deadline for fetches
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub mode: WatchMode,
}

fn default_interval_secs() -> u64 {
    30
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            mode: WatchMode::Scheduled,
        }
    }
}

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub market: HashMap<String, MarketConfig>,
    pub arbitrage: HashMap<String, ArbitrageConfig>,
    pub exchange: HashMap<Venue, ExchangeConfig>,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

impl Config {
    /// Pairs with `market.enabled = true`, sorted for deterministic ticks
    pub fn enabled_pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self
            .market
            .iter()
            .filter(|(_, m)| m.enabled)
            .map(|(pair, _)| pair.clone())
            .collect();
        pairs.sort();
        pairs
    }

    /// Venues with `exchange.enabled = true`
    pub fn enabled_venues(&self) -> Vec<Venue> {
        let mut venues: Vec<Venue> = self
            .exchange
            .iter()
            .filter(|(_, e)| e.enabled)
            .map(|(v, _)| *v)
            .collect();
        venues.sort_by_key(|v| v.to_string());
        venues
    }

    pub fn exchange(&self, venue: Venue) -> Option<&ExchangeConfig> {
        self.exchange.get(&venue)
    }

    /// Transfer settings for (venue, pair), if configured
    pub fn crypto(&self, venue: Venue, pair: &str) -> Option<&CryptoConfig> {
        self.exchange.get(&venue).and_then(|e| e.crypto.get(pair))
    }

    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        let pairs = self.enabled_pairs();
        if pairs.is_empty() {
            return Err(AppError::Config(
                "at least one enabled market pair is required".to_string(),
            ));
        }

        for (pair, market) in &self.market {
            if market.max_price_diff <= Decimal::ZERO {
                return Err(AppError::Config(format!(
                    "market '{}': max_price_diff must be > 0 (got {})",
                    pair, market.max_price_diff
                )));
            }
        }

        for pair in &pairs {
            let arb = self.arbitrage.get(pair).ok_or_else(|| {
                AppError::Config(format!("enabled pair '{}' has no arbitrage section", pair))
            })?;
            if arb.slippage < Decimal::ZERO {
                return Err(AppError::Config(format!(
                    "arbitrage '{}': slippage must be >= 0 (got {})",
                    pair, arb.slippage
                )));
            }
            if arb.slippage_mode == SlippageMode::Percentage && arb.slippage >= Decimal::ONE {
                return Err(AppError::Config(format!(
                    "arbitrage '{}': percentage slippage must be < 1 (got {})",
                    pair, arb.slippage
                )));
            }
        }

        let venues = self.enabled_venues();
        if venues.len() < 2 {
            return Err(AppError::Config(format!(
                "at least two enabled exchanges are required (got {})",
                venues.len()
            )));
        }

        for venue in &venues {
            let exchange = &self.exchange[venue];
            if exchange.api_key.trim().is_empty() || exchange.api_secret.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "exchange '{}': api_key and api_secret are required when enabled",
                    venue
                )));
            }
            if exchange.taker_fee < Decimal::ZERO || exchange.taker_fee >= Decimal::ONE {
                return Err(AppError::Config(format!(
                    "exchange '{}': taker_fee must be in [0, 1) (got {})",
                    venue, exchange.taker_fee
                )));
            }
            if exchange.maker_fee < Decimal::ZERO || exchange.maker_fee >= Decimal::ONE {
                return Err(AppError::Config(format!(
                    "exchange '{}': maker_fee must be in [0, 1) (got {})",
                    venue, exchange.maker_fee
                )));
            }
            for (pair, crypto) in &exchange.crypto {
                if crypto.withdraw_fee < Decimal::ZERO
                    && crypto.withdraw_fee != DYNAMIC_FEE_SENTINEL
                {
                    return Err(AppError::Config(format!(
                        "exchange '{}' crypto '{}': withdraw_fee must be >= 0 or the -1 sentinel (got {})",
                        venue, pair, crypto.withdraw_fee
                    )));
                }
            }
        }

        if self.discord.webhook_url.trim().is_empty() {
            return Err(AppError::Config(
                "discord.webhook_url is required".to_string(),
            ));
        }

        if self.watcher.interval_secs == 0 {
            return Err(AppError::Config(
                "watcher.interval_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config_json() -> &'static str {
        r#"{
            "market": {
                "SOLMYR": { "enabled": true, "max_price_diff": 0.02 }
            },
            "arbitrage": {
                "SOLMYR": { "min_profit": 2, "slippage_mode": "Percentage", "slippage": 0.01 }
            },
            "exchange": {
                "luno": {
                    "enabled": true,
                    "api_key": "luno-key",
                    "api_secret": "luno-secret",
                    "maker_fee": 0.004,
                    "taker_fee": 0.006,
                    "crypto": {
                        "SOLMYR": {
                            "address": "sol-addr-luno",
                            "withdraw_fee": -1,
                            "withdraw_min_amount": 0.1,
                            "deposit_min_amount": 0.01
                        }
                    }
                },
                "hata": {
                    "enabled": true,
                    "api_key": "hata-key",
                    "api_secret": "hata-secret",
                    "maker_fee": 0.002,
                    "taker_fee": 0.004,
                    "crypto": {
                        "SOLMYR": {
                            "address": "sol-addr-hata",
                            "memo": null,
                            "withdraw_fee": 0.01,
                            "withdraw_min_amount": 0.2,
                            "deposit_min_amount": 0.02
                        }
                    }
                }
            },
            "discord": { "webhook_url": "https://discord.com/api/webhooks/x/y" }
        }"#
    }

    fn valid_config() -> Config {
        serde_json::from_str(valid_config_json()).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled_pairs(), vec!["SOLMYR".to_string()]);
        assert_eq!(config.enabled_venues(), vec![Venue::Hata, Venue::Luno]);
    }

    #[test]
    fn test_watcher_defaults() {
        let config = valid_config();
        assert_eq!(config.watcher.interval_secs, 30);
        assert_eq!(config.watcher.mode, WatchMode::Scheduled);
    }

    #[test]
    fn test_dynamic_fee_sentinel() {
        let config = valid_config();
        let luno = config.crypto(Venue::Luno, "SOLMYR").unwrap();
        assert!(luno.is_dynamic_withdraw_fee());
        let hata = config.crypto(Venue::Hata, "SOLMYR").unwrap();
        assert!(!hata.is_dynamic_withdraw_fee());
        assert_eq!(hata.withdraw_fee, rust_decimal_macros::dec!(0.01));
    }

    #[test]
    fn test_no_enabled_pairs_fails() {
        let mut config = valid_config();
        config.market.get_mut("SOLMYR").unwrap().enabled = false;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least one enabled market pair"));
    }

    #[test]
    fn test_missing_arbitrage_section_fails() {
        let mut config = valid_config();
        config.arbitrage.clear();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no arbitrage section"));
    }

    #[test]
    fn test_single_enabled_exchange_fails() {
        let mut config = valid_config();
        config.exchange.get_mut(&Venue::Hata).unwrap().enabled = false;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least two enabled exchanges"));
    }

    #[test]
    fn test_empty_credentials_fail() {
        let mut config = valid_config();
        config.exchange.get_mut(&Venue::Luno).unwrap().api_key = "  ".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("api_key"));
    }

    #[test]
    fn test_percentage_slippage_at_or_above_one_fails() {
        let mut config = valid_config();
        config.arbitrage.get_mut("SOLMYR").unwrap().slippage = Decimal::ONE;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("percentage slippage must be < 1"));
    }

    #[test]
    fn test_absolute_slippage_above_one_is_valid() {
        let mut config = valid_config();
        {
            let arb = config.arbitrage.get_mut("SOLMYR").unwrap();
            arb.slippage_mode = SlippageMode::Price;
            arb.slippage = rust_decimal_macros::dec!(5);
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_max_price_diff_fails() {
        let mut config = valid_config();
        config.market.get_mut("SOLMYR").unwrap().max_price_diff =
            rust_decimal_macros::dec!(-0.02);

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("max_price_diff"));
    }

    #[test]
    fn test_invalid_withdraw_fee_fails() {
        let mut config = valid_config();
        config
            .exchange
            .get_mut(&Venue::Hata)
            .unwrap()
            .crypto
            .get_mut("SOLMYR")
            .unwrap()
            .withdraw_fee = rust_decimal_macros::dec!(-0.5);

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("withdraw_fee"));
    }

    #[test]
    fn test_empty_webhook_url_fails() {
        let mut config = valid_config();
        config.discord.webhook_url = String::new();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("webhook_url"));
    }

    #[test]
    fn test_zero_interval_fails() {
        let mut config = valid_config();
        config.watcher.interval_secs = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("interval_secs"));
    }

    #[test]
    fn test_slippage_mode_serde_values() {
        let price: SlippageMode = serde_json::from_str("\"Price\"").unwrap();
        assert_eq!(price, SlippageMode::Price);
        let pct: SlippageMode = serde_json::from_str("\"Percentage\"").unwrap();
        assert_eq!(pct, SlippageMode::Percentage);
    }
}
