//! Breakout and stop-loss rules
//!
//! Pure functions of price, baseline, session and position state. They
//! never open while a position is open and never close while flat.

use rust_decimal::Decimal;

use super::session::SessionConfig;
use super::types::{CloseReason, Decision, EvaluationMode, OpenPosition, PositionState};
use crate::common::types::Side;

/// Breakout entry rule, evaluated only when flat
///
/// Both thresholds are inclusive.
pub fn evaluate_entry(
    price: Decimal,
    baseline: Decimal,
    session: &SessionConfig,
    state: &PositionState,
) -> Decision {
    if state.is_open() {
        return Decision::NoGo;
    }

    let upper = baseline + session.gap;
    let lower = baseline - session.gap;

    if price >= upper {
        Decision::open(
            Side::Long,
            format!("price {} >= baseline {} + gap {}", price, baseline, session.gap),
        )
    } else if price <= lower {
        Decision::open(
            Side::Short,
            format!("price {} <= baseline {} - gap {}", price, baseline, session.gap),
        )
    } else {
        Decision::NoGo
    }
}

/// Adverse excursion of a position at `price`
pub fn adverse_excursion(position: &OpenPosition, price: Decimal) -> Decimal {
    match position.side {
        Side::Long => position.entry_price - price,
        Side::Short => price - position.entry_price,
    }
}

/// Stop-loss rule, evaluated only when a position is open
pub fn evaluate_stop_loss(price: Decimal, session: &SessionConfig, state: &PositionState) -> Decision {
    let Some(position) = state.open_position() else {
        return Decision::NoGo;
    };

    let excursion = adverse_excursion(position, price);
    if excursion >= session.stop_loss {
        Decision::close(
            CloseReason::StopLoss,
            format!(
                "{} from {} moved {} against at {} (limit {})",
                position.side, position.entry_price, excursion, price, session.stop_loss
            ),
        )
    } else {
        Decision::NoGo
    }
}

/// Session-end rule: close whatever is open
pub fn evaluate_exit(state: &PositionState) -> Decision {
    match state.open_position() {
        Some(position) => Decision::close(
            CloseReason::SessionEnd,
            format!("session end, closing {} from {}", position.side, position.entry_price),
        ),
        None => Decision::NoGo,
    }
}

/// Apply the rule set selected by `mode`
///
/// `baseline` is only consulted for entries; `None` means no signal.
pub fn decide(
    mode: EvaluationMode,
    price: Decimal,
    baseline: Option<Decimal>,
    session: &SessionConfig,
    state: &PositionState,
) -> Decision {
    match mode {
        EvaluationMode::Exit => evaluate_exit(state),
        EvaluationMode::Monitor => evaluate_stop_loss(price, session, state),
        EvaluationMode::Entry => match baseline {
            Some(baseline) => evaluate_entry(price, baseline, session, state),
            None => Decision::NoGo,
        },
        EvaluationMode::Auto if state.is_open() => evaluate_stop_loss(price, session, state),
        EvaluationMode::Auto => match baseline {
            Some(baseline) => evaluate_entry(price, baseline, session, state),
            None => Decision::NoGo,
        },
    }
}
