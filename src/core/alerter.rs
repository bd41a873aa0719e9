//! Discord webhook alerting for profitable opportunities
//!
//! Posts a structured embed to the configured webhook. Delivery failures
//! are logged and never fatal; the watcher keeps ticking.

use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::core::analyzer::ArbitrageOpportunity;

/// Webhook delivery timeout
const ALERT_TIMEOUT_SECS: u64 = 10;

const EMBED_COLOR_GREEN: u32 = 0x00ff00;

/// Decimal places kept at the display boundary; internal arithmetic stays
/// unrounded
const DISPLAY_DECIMALS: u32 = 6;

pub struct Alerter {
    http: reqwest::Client,
    webhook_url: String,
}

impl Alerter {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ALERT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            webhook_url: webhook_url.into(),
        }
    }

    /// Post one opportunity to the webhook
    pub async fn send(&self, opportunity: &ArbitrageOpportunity) {
        let payload = build_webhook_payload(opportunity);

        match self.http.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    pair = %opportunity.pair,
                    net_profit = %opportunity.net_profit,
                    "Alert delivered"
                );
            }
            Ok(response) => {
                error!(
                    pair = %opportunity.pair,
                    status = %response.status(),
                    "Webhook rejected alert"
                );
            }
            Err(e) => {
                error!(pair = %opportunity.pair, error = %e, "Failed to deliver alert");
            }
        }
    }
}

fn display(value: Decimal) -> String {
    value.round_dp(DISPLAY_DECIMALS).normalize().to_string()
}

fn field(name: &str, value: String, inline: bool) -> Value {
    json!({ "name": name, "value": value, "inline": inline })
}

/// Embed with venue routing, fill aggregates, fees, and net profit
fn build_webhook_payload(op: &ArbitrageOpportunity) -> Value {
    let spacer = || field("\u{200b}", "\u{200b}".to_string(), false);

    let fields = vec![
        field("Buy On", op.buy_on.to_string(), true),
        field("Sell On", op.sell_on.to_string(), true),
        field("Pair", op.pair.clone(), true),
        spacer(),
        field("Buy Price", display(op.buy_price), true),
        field("Buy Volume", display(op.buy_volume), true),
        field("Total Buy Price", display(op.total_buy_price), true),
        field("Sell Price", display(op.sell_price), true),
        field("Sell Volume", display(op.sell_volume), true),
        field("Total Sell Price", display(op.total_sell_price), true),
        spacer(),
        field("Buy Fee", display(op.buy_fee), true),
        field("Sell Fee", display(op.sell_fee), true),
        field("Transfer Fee", display(op.transfer_fee), true),
        field("Net Profit", display(op.net_profit), true),
    ];

    json!({
        "embeds": [{
            "title": "Arbitrage opportunities found",
            "color": EMBED_COLOR_GREEN,
            "fields": fields,
        }]
    })
}
