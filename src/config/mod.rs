//! Configuration: typed settings, JSON loader, and logging setup

pub mod loader;
pub mod logging;
pub mod types;

pub use loader::{load_config, load_config_from_str};
pub use logging::init_logging;
pub use types::{
    ArbitrageConfig, Config, CryptoConfig, DiscordConfig, ExchangeConfig, MarketConfig,
    SlippageMode, WatchMode, WatcherConfig, DYNAMIC_FEE_SENTINEL,
};
