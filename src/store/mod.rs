//! Position persistence
//!
//! One logical table of position rows keyed by contract code. Rows are only
//! ever inserted or flipped from `open` to `closed`, never deleted.

pub mod memory;
pub mod postgres;
pub mod tracker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::Result;
use crate::common::types::Side;

pub use memory::InMemoryPositionStore;
pub use postgres::PgPositionStore;
pub use tracker::PositionTracker;

/// Status flag of a position row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
        }
    }
}

/// A row to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewPosition {
    pub code: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub reason: String,
}

/// A stored position row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: i64,
    pub code: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub status: PositionStatus,
    pub reason: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Storage backend for position rows
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Insert a new open row
    async fn insert(&self, position: NewPosition) -> Result<PositionRecord>;

    /// All open rows for a contract, newest first
    async fn find_open(&self, code: &str) -> Result<Vec<PositionRecord>>;

    /// Flip a row to closed, appending the close reason
    async fn mark_closed(&self, id: i64, reason: &str) -> Result<()>;
}
