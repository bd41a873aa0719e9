//! Luno wire types: REST order book, stream frames, and the send-fee query
//!
//! The stream sends one snapshot frame on connect, then sequenced update
//! frames. All numerics arrive as strings; the sequence is a
//! string-encoded integer.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::state::{
    BookSide, BookSnapshot, BookUpdate, CreateOrder, DeleteOrder, KeyedLevel, TradeFill,
};

fn u64_from_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

// =============================================================================
// REST
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RestPriceLevel {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

/// `GET /api/1/orderbook` response
#[derive(Debug, Deserialize)]
pub struct RestOrderBookResponse {
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub asks: Vec<RestPriceLevel>,
    pub bids: Vec<RestPriceLevel>,
}

/// `GET /api/1/send_fee` response
#[derive(Debug, Deserialize)]
pub struct SendFeeResponse {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub fee: Decimal,
}

// =============================================================================
// Stream
// =============================================================================

/// Credentials frame sent as the first text message after dialing
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub api_key_id: &'a str,
    pub api_key_secret: &'a str,
}

/// One resting order in the snapshot frame
#[derive(Debug, Deserialize)]
pub struct FeedLevel {
    pub id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

/// First frame after subscribing: the full book
#[derive(Debug, Deserialize)]
pub struct FeedSnapshot {
    #[serde(deserialize_with = "u64_from_string")]
    pub sequence: u64,
    pub asks: Vec<FeedLevel>,
    pub bids: Vec<FeedLevel>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl FeedSnapshot {
    pub fn into_snapshot(self) -> BookSnapshot {
        BookSnapshot {
            sequence: self.sequence,
            asks: self
                .asks
                .into_iter()
                .map(|l| KeyedLevel::new(l.id, l.price, l.volume))
                .collect(),
            bids: self
                .bids
                .into_iter()
                .map(|l| KeyedLevel::new(l.id, l.price, l.volume))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedTradeUpdate {
    #[serde(with = "rust_decimal::serde::str")]
    pub base: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub counter: Option<Decimal>,
    pub maker_order_id: String,
    #[serde(default)]
    pub taker_order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedCreateUpdate {
    pub order_id: String,
    /// "ASK" or "BID"
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct FeedDeleteUpdate {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedStatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
}

/// Sequenced update frame
#[derive(Debug, Deserialize)]
pub struct FeedUpdate {
    #[serde(deserialize_with = "u64_from_string")]
    pub sequence: u64,
    #[serde(default)]
    pub trade_updates: Option<Vec<FeedTradeUpdate>>,
    #[serde(default)]
    pub create_update: Option<FeedCreateUpdate>,
    #[serde(default)]
    pub delete_update: Option<FeedDeleteUpdate>,
    /// Opaque; carried but not acted on
    #[serde(default)]
    pub status_update: Option<FeedStatusUpdate>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl FeedUpdate {
    pub fn into_update(self) -> BookUpdate {
        BookUpdate {
            sequence: self.sequence,
            trades: self
                .trade_updates
                .unwrap_or_default()
                .into_iter()
                .map(|t| TradeFill {
                    maker_order_id: t.maker_order_id,
                    base: t.base,
                })
                .collect(),
            create: self.create_update.map(|c| CreateOrder {
                order_id: c.order_id,
                side: if c.order_type == "ASK" {
                    BookSide::Ask
                } else {
                    BookSide::Bid
                },
                price: c.price,
                volume: c.volume,
            }),
            delete: self.delete_update.map(|d| DeleteOrder {
                order_id: d.order_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_snapshot_frame() {
        let body = r#"{
            "sequence": "24352",
            "asks": [{"id": "BXMC2CJ7HNB88U4", "price": "1234.00", "volume": "0.93"}],
            "bids": [{"id": "BXMC2CJ7HNB88U5", "price": "1201.00", "volume": "1.22"}],
            "status": "ACTIVE",
            "timestamp": 1528884331021
        }"#;

        let snapshot: FeedSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(snapshot.sequence, 24352);

        let converted = snapshot.into_snapshot();
        assert_eq!(converted.asks[0].order_id, "BXMC2CJ7HNB88U4");
        assert_eq!(converted.asks[0].price, dec!(1234.00));
        assert_eq!(converted.bids[0].volume, dec!(1.22));
    }

    #[test]
    fn test_decode_trade_update_frame() {
        let body = r#"{
            "sequence": "24353",
            "trade_updates": [{
                "base": "0.1",
                "counter": "123.40",
                "maker_order_id": "BXMC2CJ7HNB88U4",
                "taker_order_id": "BXMC2CJ7HNB88U6"
            }],
            "create_update": null,
            "delete_update": null,
            "status_update": null,
            "timestamp": 1528884331022
        }"#;

        let update: FeedUpdate = serde_json::from_str(body).unwrap();
        let converted = update.into_update();
        assert_eq!(converted.sequence, 24353);
        assert_eq!(converted.trades.len(), 1);
        assert_eq!(converted.trades[0].base, dec!(0.1));
        assert!(converted.create.is_none());
        assert!(converted.delete.is_none());
    }

    #[test]
    fn test_decode_create_and_delete_frame() {
        let body = r#"{
            "sequence": "10",
            "create_update": {
                "order_id": "BXNEW1", "type": "ASK",
                "price": "1250.00", "volume": "0.5"
            },
            "delete_update": {"order_id": "BXOLD1"},
            "timestamp": 1528884331023
        }"#;

        let update: FeedUpdate = serde_json::from_str(body).unwrap();
        let converted = update.into_update();

        let create = converted.create.unwrap();
        assert_eq!(create.side, BookSide::Ask);
        assert_eq!(create.price, dec!(1250.00));
        assert_eq!(converted.delete.unwrap().order_id, "BXOLD1");
    }

    #[test]
    fn test_bid_create_type() {
        let body = r#"{
            "sequence": "11",
            "create_update": {
                "order_id": "BXNEW2", "type": "BID",
                "price": "1200.00", "volume": "2"
            }
        }"#;
        let update: FeedUpdate = serde_json::from_str(body).unwrap();
        assert_eq!(update.into_update().create.unwrap().side, BookSide::Bid);
    }

    #[test]
    fn test_update_frame_rejected_as_snapshot() {
        // Frames without asks/bids fail snapshot decoding and get
        // discarded while awaiting a snapshot
        let body = r#"{"sequence": "24353", "trade_updates": [], "timestamp": 1}"#;
        assert!(serde_json::from_str::<FeedSnapshot>(body).is_err());
    }

    #[test]
    fn test_decode_rest_order_book() {
        let body = r#"{
            "timestamp": 1528884331021,
            "asks": [{"price": "1234.00", "volume": "0.93"}],
            "bids": [{"price": "1201.00", "volume": "1.22"}]
        }"#;
        let decoded: RestOrderBookResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.asks[0].price, dec!(1234.00));
        assert_eq!(decoded.bids[0].volume, dec!(1.22));
    }

    #[test]
    fn test_decode_send_fee() {
        let body = r#"{"currency": "SOL", "fee": "0.0125"}"#;
        let decoded: SendFeeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.fee, dec!(0.0125));
    }

    #[test]
    fn test_auth_request_serializes_credential_fields() {
        let auth = AuthRequest {
            api_key_id: "id123",
            api_key_secret: "secret456",
        };
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["api_key_id"], "id123");
        assert_eq!(json["api_key_secret"], "secret456");
    }
}
