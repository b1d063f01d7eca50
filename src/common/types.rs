//! Unified types shared by the brokerage client, the strategy and the store

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Order action that opens a position on this side
    pub fn entry_action(&self) -> OrderAction {
        match self {
            Side::Long => OrderAction::Buy,
            Side::Short => OrderAction::Sell,
        }
    }

    /// Order action that flattens a position on this side
    pub fn exit_action(&self) -> OrderAction {
        match self {
            Side::Long => OrderAction::Sell,
            Side::Short => OrderAction::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            other => Err(format!("unknown side: {}", other)),
        }
    }
}

/// Order action sent to the brokerage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderAction {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderAction::Buy => write!(f, "BUY"),
            OrderAction::Sell => write!(f, "SELL"),
        }
    }
}

/// Raw tick timestamp as delivered by the brokerage
///
/// The gateway sends epoch nanoseconds, but text timestamps show up too.
/// Anything else is kept so the tick can be dropped later instead of
/// failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Nanos(i64),
    Text(String),
    Other(serde_json::Value),
}

/// A single trade print
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub timestamp: RawTimestamp,
    pub price: Decimal,
}

impl Tick {
    pub fn new(timestamp: RawTimestamp, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// Latest snapshot quote for a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub contract: String,
    /// Last traded price
    pub close: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Price type of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceType {
    Mkt,
}

/// A market order for one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub contract: String,
    pub action: OrderAction,
    pub quantity: u32,
    pub price_type: PriceType,
}

impl OrderRequest {
    /// Single-lot market order
    pub fn market(contract: impl Into<String>, action: OrderAction) -> Self {
        Self {
            contract: contract.into(),
            action,
            quantity: 1,
            price_type: PriceType::Mkt,
        }
    }
}

/// Brokerage acknowledgement of an accepted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub status: String,
}
