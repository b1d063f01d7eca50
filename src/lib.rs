//! MXF Breakout Library
//!
//! Moving-average breakout monitor for index futures: derives a session
//! baseline from 5-minute bars, compares the live quote against it, places
//! market orders through a brokerage gateway and reports to a chat endpoint.

pub mod broker;
pub mod common;
pub mod config;
pub mod notify;
pub mod store;
pub mod strategy;
pub mod trader;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use broker::BrokerRestClient;
pub use common::errors::{ClientError, Result};
pub use common::traits::{Broker, Notifier};
pub use common::types::{OrderAck, OrderAction, OrderRequest, Quote, RawTimestamp, Side, Tick};
pub use config::types::AppConfig;
pub use notify::{DisabledNotifier, LinePushNotifier};
pub use store::{InMemoryPositionStore, PgPositionStore, PositionStore, PositionTracker};
pub use trader::{EvaluationOutcome, Evaluator, Scheduler};

// Strategy types
pub use strategy::{
    BaselineCalculator, Decision, EvaluationMode, PositionState, SessionConfig, TradeIntent,
};
