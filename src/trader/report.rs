//! Report and notification text

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use crate::common::errors::ClientError;
use crate::common::types::{OrderAck, Side};
use crate::strategy::{evaluate_entry, Action, Decision, PositionState, SessionConfig, TradeIntent};

/// Header of a combined report
pub fn report_header(now: &DateTime<FixedOffset>) -> String {
    format!(
        "🔔 Breakout monitor report\nTime: {}\n",
        now.format("%Y-%m-%d %H:%M")
    )
}

/// Verdict line for a price against a baseline, as if flat
pub fn verdict(price: Decimal, baseline: Decimal, session: &SessionConfig) -> &'static str {
    match evaluate_entry(price, baseline, session, &PositionState::Flat) {
        Decision::Go(TradeIntent {
            action: Action::Open(Side::Long),
            ..
        }) => "🚩 breakout, long entry signal",
        Decision::Go(TradeIntent {
            action: Action::Open(Side::Short),
            ..
        }) => "💀 breakdown, short entry signal",
        _ => "no signal",
    }
}

/// Per-contract block of the report
pub fn contract_report(
    contract: &str,
    session: &SessionConfig,
    window: usize,
    baseline: Decimal,
    price: Decimal,
) -> String {
    let diff = (price - baseline).round_dp(2);
    format!(
        "📊 {} session report\n\
         Contract: {}\n\
         Baseline ({}MA): {}\n\
         Price: {} (diff: {})\n\
         Gap: {} | Stop-loss: {}\n\
         Verdict: {}",
        session.label,
        contract,
        window,
        baseline,
        price,
        diff,
        session.gap,
        session.stop_loss,
        verdict(price, baseline, session)
    )
}

/// Block used when the baseline or the quote could not be fetched
pub fn unavailable_report(contract: &str, error: &ClientError) -> String {
    format!("[{}] baseline data unavailable ({})", contract, error)
}

/// Block used when the baseline is known but the quote could not be fetched
pub fn quote_unavailable_report(
    contract: &str,
    session: &SessionConfig,
    baseline: Decimal,
    error: &ClientError,
) -> String {
    format!(
        "[{}] {} session baseline {}, quote unavailable ({})",
        contract, session.label, baseline, error
    )
}

/// Join a header and per-contract blocks
pub fn combine(header: String, blocks: &[String]) -> String {
    let mut report = header;
    for block in blocks {
        report.push_str("\n---\n");
        report.push_str(block);
    }
    report
}

fn action_label(action: &Action) -> String {
    match action {
        Action::Open(side) => format!("open {}", side),
        Action::Close(reason) => format!("close ({})", reason),
    }
}

/// Sent after an order is accepted and recorded
pub fn executed_message(
    contract: &str,
    session: &SessionConfig,
    intent: &TradeIntent,
    price: Option<Decimal>,
    ack: &OrderAck,
) -> String {
    let price = price
        .map(|p| p.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "✅ {} order filled\nContract: {}\nSession: {}\nPrice: {}\nOrder: {} ({})\nReason: {}",
        action_label(&intent.action),
        contract,
        session.label,
        price,
        ack.order_id,
        ack.status,
        intent.reason
    )
}

/// Sent when the brokerage refused an order
pub fn order_failed_message(contract: &str, intent: &TradeIntent, error: &ClientError) -> String {
    format!(
        "❌ {} order failed\nContract: {}\nError: {}\nNo position change was recorded.",
        action_label(&intent.action),
        contract,
        error
    )
}

/// Sent when an accepted order could not be written to the position table
pub fn record_failed_message(contract: &str, intent: &TradeIntent, error: &ClientError) -> String {
    format!(
        "⚠️ {} order was placed but not recorded\nContract: {}\nError: {}\n\
         Trading on this contract is paused until the position table is reconciled.",
        action_label(&intent.action),
        contract,
        error
    )
}
