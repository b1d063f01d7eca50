//! Strategy module for breakout decision making
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  BaselineCalculator                                         │
//! │    ticks ──► 5m bars (right-closed, forward-filled)         │
//! │          ──► 21-bar SMA sampled at the session anchor       │
//! └─────────────────────────────────────────────────────────────┘
//!                           │ baseline
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Decision rules                                             │
//! │    flat: price vs baseline ± gap   ──► open long / short    │
//! │    open: adverse excursion vs SL   ──► close                │
//! │    exit: anything open             ──► close                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`BaselineCalculator`]: tick resampling and the moving-average baseline
//! - [`SessionConfig`]: day/night parameters picked by wall-clock hour
//! - [`Decision`]: Go/NoGo returned by the rules in [`decision`]
//! - [`PositionState`]: flat or open, as read from the position tracker

pub mod baseline;
pub mod decision;
pub mod session;
mod types;

pub use baseline::{moving_average, normalize_timestamp, Bar, BaselineCalculator, RollingSma};
pub use decision::{decide, evaluate_entry, evaluate_exit, evaluate_stop_loss};
pub use session::{SessionConfig, SessionKind};
pub use types::{
    Action, CloseReason, Decision, EvaluationMode, OpenPosition, PositionState, TradeIntent,
};
