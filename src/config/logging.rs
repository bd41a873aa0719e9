//! Logging setup: console output plus four named rotating file sinks
//!
//! The process writes four log files: `logs/app.log` for general
//! events, `logs/internal_state.log` for order-book engine state,
//! `logs/arbitrage.log` for every analyzed opportunity (JSON lines), and
//! `logs/scraping.log` for raw venue payloads. Events are routed by
//! `tracing` target; files rotate daily via `tracing-appender`.
//!
//! # Environment Variables
//! - `LOG_FORMAT`: console format - `json` (default) or `pretty`
//! - `RUST_LOG`: console level filter (default: `info`)

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::{filter_fn, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Target for order-book engine state events → `internal_state.log`
pub const STATE_TARGET: &str = "state";
/// Target for analyzed opportunities → `arbitrage.log`
pub const ARBITRAGE_TARGET: &str = "arbitrage";
/// Target for raw venue payloads → `scraping.log`
pub const SCRAPING_TARGET: &str = "scraping";

/// Directory holding all rotating log files
const LOG_DIR: &str = "logs";

/// Events that belong to the app log file (everything not claimed by a
/// dedicated sink)
fn is_app_event(target: &str) -> bool {
    target != STATE_TARGET && target != ARBITRAGE_TARGET && target != SCRAPING_TARGET
}

/// Events shown on the console: app events plus arbitrage results; the
/// state and scraping firehoses stay file-only
fn is_console_event(target: &str) -> bool {
    target != STATE_TARGET && target != SCRAPING_TARGET
}

/// Initialize logging with the four file sinks and a console layer.
///
/// The returned guards must be held for the lifetime of the process;
/// dropping them stops the non-blocking writers and loses buffered lines.
pub fn init_logging() -> Vec<WorkerGuard> {
    let mut guards = Vec::new();

    let (app_writer, guard) = tracing_appender::non_blocking(rolling::daily(LOG_DIR, "app.log"));
    guards.push(guard);
    let (state_writer, guard) =
        tracing_appender::non_blocking(rolling::daily(LOG_DIR, "internal_state.log"));
    guards.push(guard);
    let (arbitrage_writer, guard) =
        tracing_appender::non_blocking(rolling::daily(LOG_DIR, "arbitrage.log"));
    guards.push(guard);
    let (scraping_writer, guard) =
        tracing_appender::non_blocking(rolling::daily(LOG_DIR, "scraping.log"));
    guards.push(guard);

    let app_file = fmt::layer()
        .json()
        .with_writer(app_writer)
        .with_filter(filter_fn(|meta| is_app_event(meta.target())));
    let state_file = fmt::layer()
        .json()
        .with_writer(state_writer)
        .with_filter(Targets::new().with_target(STATE_TARGET, Level::TRACE));
    let arbitrage_file = fmt::layer()
        .json()
        .with_writer(arbitrage_writer)
        .with_filter(Targets::new().with_target(ARBITRAGE_TARGET, Level::TRACE));
    let scraping_file = fmt::layer()
        .json()
        .with_writer(scraping_writer)
        .with_filter(Targets::new().with_target(SCRAPING_TARGET, Level::TRACE));

    let registry = tracing_subscriber::registry()
        .with(app_file)
        .with(state_file)
        .with(arbitrage_file)
        .with(scraping_file);

    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    if log_format == "pretty" {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_filter(filter_fn(|meta| is_console_event(meta.target())))
                    .with_filter(console_filter),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_filter(filter_fn(|meta| is_console_event(meta.target())))
                    .with_filter(console_filter),
            )
            .init();
    }

    guards
}
