//! Brokerage gateway wire types

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{ClientError, Result};
use crate::common::types::{OrderAction, PriceType, Quote, RawTimestamp, Tick};

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub api_key: String,
    pub secret_key: String,
    pub simulation: bool,
}

/// Login response with the session token and bound futures account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Columnar tick response
///
/// Price comes in a `close` column, or `price` on older gateways.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicksResponse {
    #[serde(default)]
    pub ts: Vec<RawTimestamp>,
    #[serde(default)]
    pub close: Option<Vec<Decimal>>,
    #[serde(default)]
    pub price: Option<Vec<Decimal>>,
}

impl TicksResponse {
    /// Zip the columns into ticks
    pub fn into_ticks(self) -> Result<Vec<Tick>> {
        let prices = match (self.close, self.price) {
            (Some(close), _) => close,
            (None, Some(price)) => price,
            (None, None) if self.ts.is_empty() => return Ok(Vec::new()),
            (None, None) => {
                return Err(ClientError::InvalidResponse(
                    "tick response has no close or price column".to_string(),
                ))
            }
        };

        if prices.len() != self.ts.len() {
            return Err(ClientError::InvalidResponse(format!(
                "tick columns differ in length: ts={} price={}",
                self.ts.len(),
                prices.len()
            )));
        }

        Ok(self
            .ts
            .into_iter()
            .zip(prices)
            .map(|(timestamp, price)| Tick::new(timestamp, price))
            .collect())
    }
}

/// One entry of the snapshots response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub code: String,
    pub close: Decimal,
    /// Epoch nanoseconds of the last trade
    #[serde(default)]
    pub ts: Option<i64>,
}

impl From<SnapshotResponse> for Quote {
    fn from(snapshot: SnapshotResponse) -> Self {
        let timestamp = snapshot
            .ts
            .map(|nanos| Utc.timestamp_nanos(nanos))
            .unwrap_or_else(Utc::now);
        Quote {
            contract: snapshot.code,
            close: snapshot.close,
            timestamp,
        }
    }
}

/// Order request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub contract: String,
    pub action: OrderAction,
    pub quantity: u32,
    pub price_type: PriceType,
    /// Time in force; market orders go in as IOC
    pub order_type: String,
}

/// Order response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub msg: Option<String>,
}

impl OrderResponse {
    /// Whether the gateway reports the order as refused
    pub fn is_rejected(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "rejected" | "failed" | "cancelled"
        )
    }
}

/// Error body returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
