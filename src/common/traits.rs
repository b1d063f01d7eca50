//! Trait definitions for external collaborators

use async_trait::async_trait;
use chrono::NaiveDate;

use super::errors::Result;
use super::types::{OrderAck, OrderRequest, Quote, Tick};

/// Trait for brokerage clients
///
/// This trait provides the narrow surface the engine needs from a futures
/// brokerage: historical ticks, a live quote and market order placement.
/// Login and account binding happen before the client is handed out.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Fetch all ticks for a contract on a trading date
    ///
    /// # Arguments
    /// * `contract` - Contract code, e.g. `MXF202603`
    /// * `date` - Trading date in exchange local time
    async fn ticks(&self, contract: &str, date: NaiveDate) -> Result<Vec<Tick>>;

    /// Fetch the latest snapshot quote for a contract
    async fn snapshot(&self, contract: &str) -> Result<Quote>;

    /// Place an order
    ///
    /// Returns `ClientError::OrderRejected` when the brokerage refuses it.
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck>;
}

/// Trait for chat notification endpoints
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Push a text message to the configured recipient
    async fn push(&self, text: &str) -> Result<()>;

    /// Whether messages actually leave the process
    fn is_enabled(&self) -> bool {
        true
    }
}
