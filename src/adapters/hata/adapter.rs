//! Hata exchange adapter (REST only)
//!
//! Serves signed order book snapshots; transfer fee, minimums, and the
//! deposit address all come from static configuration.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::traits::ExchangeAdapter;
use crate::adapters::types::{create_http_client, OrderBook, PriceLevel, Venue};
use crate::adapters::{
    config_deposit_address, config_deposit_min, config_withdraw_fee, config_withdraw_min,
};
use crate::config::types::Config;
use crate::error::AppError;

use super::types::{sign_query, HataOrderBookResponse};

const HATA_API_BASE_URL: &str = "https://my-api.hata.io";

pub struct HataAdapter {
    http: reqwest::Client,
    api_base_url: String,
    api_key_id: String,
    api_key_secret: String,
    config: Arc<Config>,
}

impl HataAdapter {
    pub fn new(config: Arc<Config>) -> Result<Self, AppError> {
        let exchange = config
            .exchange(Venue::Hata)
            .ok_or_else(|| AppError::Config("missing exchange.hata section".to_string()))?;

        Ok(Self {
            http: create_http_client(Venue::Hata),
            api_base_url: HATA_API_BASE_URL.to_string(),
            api_key_id: exchange.api_key.clone(),
            api_key_secret: exchange.api_secret.clone(),
            config,
        })
    }

    /// Decode and sort an order book response body
    fn parse_order_book(pair: &str, body: &str) -> ExchangeResult<OrderBook> {
        let decoded: HataOrderBookResponse = serde_json::from_str(body)
            .map_err(|e| ExchangeError::Decode(format!("hata order book: {}", e)))?;

        let mut book = OrderBook::new(Venue::Hata, pair);
        book.asks = decoded
            .data
            .asks
            .into_iter()
            .map(|l| PriceLevel::new(l.price, l.volume))
            .collect();
        book.bids = decoded
            .data
            .bids
            .into_iter()
            .map(|l| PriceLevel::new(l.price, l.volume))
            .collect();

        // The endpoint does not guarantee ordering
        book.asks.sort_by(|a, b| a.price.cmp(&b.price));
        book.bids.sort_by(|a, b| b.price.cmp(&a.price));

        if book.asks.is_empty() || book.bids.is_empty() {
            return Err(ExchangeError::EmptyBook {
                venue: Venue::Hata,
                pair: pair.to_string(),
            });
        }
        book.check_integrity();

        Ok(book)
    }
}

#[async_trait]
impl ExchangeAdapter for HataAdapter {
    fn name(&self) -> Venue {
        Venue::Hata
    }

    async fn get_order_book(&self, pair: &str) -> ExchangeResult<OrderBook> {
        let query = format!("pair_name={}", pair);
        let signature = sign_query(&self.api_key_secret, &query);
        let url = format!("{}/orderbook/api/orderbook?{}", self.api_base_url, query);

        info!(exchange = "hata", pair = %pair, "Fetching order book snapshot");

        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key_id)
            .header("Signature", signature)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(ExchangeError::from)?;
        info!(target: "scraping", exchange = "hata", pair = %pair, body = %body, "Order book response");

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ExchangeError::Auth {
                venue: Venue::Hata,
                reason: format!("HTTP {}", status),
            });
        }
        if !status.is_success() {
            return Err(ExchangeError::Transport(format!("HTTP {} from hata", status)));
        }

        Self::parse_order_book(pair, &body)
    }

    async fn get_transfer_fee(
        &self,
        pair: &str,
        _address: &str,
        _amount: Decimal,
    ) -> ExchangeResult<Decimal> {
        // Static configuration; -1 when the pair has no entry
        Ok(config_withdraw_fee(&self.config, Venue::Hata, pair))
    }

    async fn get_withdraw_min(&self, pair: &str) -> ExchangeResult<Decimal> {
        Ok(config_withdraw_min(&self.config, Venue::Hata, pair))
    }

    async fn get_deposit_min(&self, pair: &str) -> ExchangeResult<Decimal> {
        Ok(config_deposit_min(&self.config, Venue::Hata, pair))
    }

    async fn get_deposit_address(&self, pair: &str) -> ExchangeResult<String> {
        Ok(config_deposit_address(&self.config, Venue::Hata, pair))
    }
}
