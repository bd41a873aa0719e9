//! Hata wire types and request signing
//!
//! The order book endpoint returns numerics as strings and requires an
//! HMAC-SHA256 signature of the URL-encoded query string, hex lowercase,
//! sent in the `Signature` header next to the `X-API-Key` header.

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a URL-encoded query string with the API secret
pub fn sign_query(secret: &str, query: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// One price level as served by the order book endpoint
#[derive(Debug, Deserialize)]
pub struct HataPriceLevel {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "qty", with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct HataOrderBookData {
    pub asks: Vec<HataPriceLevel>,
    pub bids: Vec<HataPriceLevel>,
}

/// `GET /orderbook/api/orderbook` response envelope
#[derive(Debug, Deserialize)]
pub struct HataOrderBookResponse {
    pub data: HataOrderBookData,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sign_query_shape() {
        let signature = sign_query("secret", "pair_name=SOLMYR");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(signature, signature.to_lowercase());
    }

    #[test]
    fn test_sign_query_deterministic_and_keyed() {
        let a = sign_query("secret", "pair_name=SOLMYR");
        let b = sign_query("secret", "pair_name=SOLMYR");
        let c = sign_query("other-secret", "pair_name=SOLMYR");
        let d = sign_query("secret", "pair_name=XRPMYR");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_decode_order_book_response() {
        let body = r#"{
            "data": {
                "asks": [{"price": "1042.50", "qty": "1.5"}],
                "bids": [{"price": "1041.00", "qty": "0.25"}]
            },
            "status": "success"
        }"#;

        let decoded: HataOrderBookResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.status, "success");
        assert_eq!(decoded.data.asks[0].price, dec!(1042.50));
        assert_eq!(decoded.data.asks[0].volume, dec!(1.5));
        assert_eq!(decoded.data.bids[0].price, dec!(1041.00));
    }

    #[test]
    fn test_decode_rejects_numeric_fields() {
        // The venue sends numerics as strings; bare numbers are malformed
        let body = r#"{"data": {"asks": [{"price": 1042.5, "qty": "1"}], "bids": []}}"#;
        assert!(serde_json::from_str::<HataOrderBookResponse>(body).is_err());
    }
}
