use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::Side;

/// Which rule set an evaluation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Look for a breakout while flat
    Entry,
    /// Check the stop-loss of an open position
    Monitor,
    /// Force-close any open position
    Exit,
    /// Entry when flat, monitor when open (polling loop)
    Auto,
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationMode::Entry => write!(f, "entry"),
            EvaluationMode::Monitor => write!(f, "monitor"),
            EvaluationMode::Exit => write!(f, "exit"),
            EvaluationMode::Auto => write!(f, "auto"),
        }
    }
}

/// Why a position is being closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss,
    SessionEnd,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::StopLoss => "stop_loss",
            CloseReason::SessionEnd => "session_end",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single action carried by a Go decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open(Side),
    Close(CloseReason),
}

/// An action together with a human readable explanation
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub action: Action,
    pub reason: String,
}

impl TradeIntent {
    pub fn new(action: Action, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }
}

/// Strategy decision output
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No action should be taken
    NoGo,
    /// Execute the trade intent
    Go(TradeIntent),
}

impl Decision {
    /// Create a Go decision opening a position
    pub fn open(side: Side, reason: impl Into<String>) -> Self {
        Self::Go(TradeIntent::new(Action::Open(side), reason))
    }

    /// Create a Go decision closing the open position
    pub fn close(reason: CloseReason, detail: impl Into<String>) -> Self {
        Self::Go(TradeIntent::new(Action::Close(reason), detail))
    }

    /// Returns true if this is a Go decision
    pub fn is_go(&self) -> bool {
        matches!(self, Self::Go(_))
    }

    pub fn intent(&self) -> Option<&TradeIntent> {
        match self {
            Self::Go(intent) => Some(intent),
            Self::NoGo => None,
        }
    }
}

/// An open position as seen by the decision rules
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    /// Row id in the position table
    pub id: i64,
    pub side: Side,
    pub entry_price: Decimal,
}

/// Per-contract position state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open(_))
    }

    pub fn open_position(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Open(position) => Some(position),
            PositionState::Flat => None,
        }
    }
}
