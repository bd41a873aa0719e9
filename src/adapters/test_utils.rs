//! Shared mock adapter for watcher and pipeline tests
//!
//! Scripted order books, fees, and failure injection behind the same
//! trait the real venues implement.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::traits::ExchangeAdapter;
use crate::adapters::types::{OrderBook, Venue};

pub struct MockExchange {
    pub venue: Venue,
    book: StdMutex<Option<OrderBook>>,
    fail_fetch: bool,
    fetch_delay: Option<Duration>,
    transfer_fee: Decimal,
    fail_transfer_fee: bool,
    withdraw_min: Decimal,
    deposit_min: Decimal,
    deposit_address: String,
}

impl MockExchange {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            book: StdMutex::new(None),
            fail_fetch: false,
            fetch_delay: None,
            transfer_fee: Decimal::ZERO,
            fail_transfer_fee: false,
            withdraw_min: Decimal::ZERO,
            deposit_min: Decimal::ZERO,
            deposit_address: format!("{}-deposit-address", venue),
        }
    }

    pub fn with_book(self, book: OrderBook) -> Self {
        *self.book.lock().unwrap() = Some(book);
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn with_transfer_fee(mut self, fee: Decimal) -> Self {
        self.transfer_fee = fee;
        self
    }

    pub fn failing_transfer_fee(mut self) -> Self {
        self.fail_transfer_fee = true;
        self
    }

    pub fn with_withdraw_min(mut self, min: Decimal) -> Self {
        self.withdraw_min = min;
        self
    }

    pub fn with_deposit_min(mut self, min: Decimal) -> Self {
        self.deposit_min = min;
        self
    }

    pub fn set_book(&self, book: OrderBook) {
        *self.book.lock().unwrap() = Some(book);
    }
}

#[async_trait]
impl ExchangeAdapter for MockExchange {
    fn name(&self) -> Venue {
        self.venue
    }

    async fn get_order_book(&self, pair: &str) -> ExchangeResult<OrderBook> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetch {
            return Err(ExchangeError::Transport("mock fetch failure".to_string()));
        }
        self.book
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ExchangeError::EmptyBook {
                venue: self.venue,
                pair: pair.to_string(),
            })
    }

    async fn get_transfer_fee(
        &self,
        _pair: &str,
        _address: &str,
        _amount: Decimal,
    ) -> ExchangeResult<Decimal> {
        if self.fail_transfer_fee {
            return Err(ExchangeError::Transport(
                "mock transfer fee failure".to_string(),
            ));
        }
        Ok(self.transfer_fee)
    }

    async fn get_withdraw_min(&self, _pair: &str) -> ExchangeResult<Decimal> {
        Ok(self.withdraw_min)
    }

    async fn get_deposit_min(&self, _pair: &str) -> ExchangeResult<Decimal> {
        Ok(self.deposit_min)
    }

    async fn get_deposit_address(&self, _pair: &str) -> ExchangeResult<String> {
        Ok(self.deposit_address.clone())
    }
}
