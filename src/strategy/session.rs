//! Session selection by wall-clock hour

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;

use crate::common::errors::Result;
use crate::config::types::{SessionParams, StrategyConfig};

/// Trading session regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Day,
    Night,
}

/// Parameters of the session active at one instant
///
/// Re-derived on every evaluation and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub kind: SessionKind,
    pub label: String,
    /// Bar label at which the baseline is sampled
    pub anchor: NaiveTime,
    /// Entry threshold in index points
    pub gap: Decimal,
    /// Stop-loss distance in index points
    pub stop_loss: Decimal,
}

impl SessionConfig {
    fn from_params(kind: SessionKind, params: &SessionParams) -> Result<Self> {
        Ok(Self {
            kind,
            label: params.label.clone(),
            anchor: params.anchor_time()?,
            gap: params.gap,
            stop_loss: params.stop_loss,
        })
    }

    /// Session active at a local hour (0-23)
    pub fn for_hour(strategy: &StrategyConfig, hour: u32) -> Result<Self> {
        if (strategy.day_start_hour..strategy.day_end_hour).contains(&hour) {
            Self::from_params(SessionKind::Day, &strategy.day)
        } else {
            Self::from_params(SessionKind::Night, &strategy.night)
        }
    }

    /// Session active at an exchange-local instant
    pub fn for_time(strategy: &StrategyConfig, now: &DateTime<FixedOffset>) -> Result<Self> {
        Self::for_hour(strategy, now.hour())
    }

    /// Date whose ticks carry this session's anchor bar
    ///
    /// The night session runs past midnight; before the day session opens
    /// its anchor was printed on the previous calendar day.
    pub fn baseline_date(&self, strategy: &StrategyConfig, now: &DateTime<FixedOffset>) -> NaiveDate {
        let today = now.date_naive();
        if self.kind == SessionKind::Night && now.hour() < strategy.day_start_hour {
            today.pred_opt().unwrap_or(today)
        } else {
            today
        }
    }
}
