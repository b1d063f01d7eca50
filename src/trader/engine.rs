//! Per-contract evaluation and the order side-effect policy
//!
//! One evaluation reads the position state, computes the baseline if an
//! entry is possible, quotes the contract, applies the decision rules and
//! executes at most one action. An action's side effects run in order:
//! order placement, position-table write, success notification. A failed
//! order stops the chain and only notifies the failure.

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use super::cache::{BaselineCache, BaselineKey};
use super::report;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::{Broker, Notifier};
use crate::common::types::{OrderRequest, Side};
use crate::config::types::StrategyConfig;
use crate::store::PositionTracker;
use crate::strategy::{
    decide, evaluate_exit, Action, BaselineCalculator, CloseReason, Decision, EvaluationMode,
    OpenPosition, PositionState, SessionConfig, TradeIntent,
};

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// Nothing to do this cycle
    NoSignal { reason: String },
    /// Order accepted and position table updated
    Executed {
        intent: TradeIntent,
        price: Option<Decimal>,
        order_id: String,
    },
    /// Brokerage refused the order; nothing recorded
    OrderFailed { intent: TradeIntent, error: String },
    /// Order accepted but the position table write failed
    RecordFailed { intent: TradeIntent, error: String },
    /// Contract is paused until the position table is reconciled
    Quarantined { reason: String },
}

impl EvaluationOutcome {
    fn no_signal(reason: impl Into<String>) -> Self {
        Self::NoSignal {
            reason: reason.into(),
        }
    }
}

/// State the position table must reach before a paused contract resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRecord {
    Open,
    Close,
}

/// Position-table write that follows an accepted order
enum PendingWrite<'a> {
    Open { side: Side, entry_price: Decimal },
    Close {
        reason: CloseReason,
        position: &'a OpenPosition,
    },
}

/// Evaluates contracts against the breakout rules
pub struct Evaluator {
    broker: Arc<dyn Broker>,
    notifier: Arc<dyn Notifier>,
    tracker: PositionTracker,
    calculator: BaselineCalculator,
    strategy: StrategyConfig,
    cache: BaselineCache,
    quarantine: RwLock<HashMap<String, PendingRecord>>,
}

impl Evaluator {
    pub fn new(
        broker: Arc<dyn Broker>,
        notifier: Arc<dyn Notifier>,
        tracker: PositionTracker,
        strategy: StrategyConfig,
    ) -> Result<Self> {
        strategy.validate()?;
        let calculator = BaselineCalculator::from_config(&strategy)?;
        Ok(Self {
            broker,
            notifier,
            tracker,
            calculator,
            strategy,
            cache: BaselineCache::new(),
            quarantine: RwLock::new(HashMap::new()),
        })
    }

    /// Exchange time zone
    pub fn timezone(&self) -> FixedOffset {
        self.calculator.timezone()
    }

    /// Baseline for the session, served from the cache when available
    pub async fn baseline(
        &self,
        contract: &str,
        date: NaiveDate,
        session: &SessionConfig,
    ) -> Result<Decimal> {
        let key = BaselineKey::new(contract, date, &session.label);
        if let Some(value) = self.cache.get(&key).await {
            return Ok(value);
        }

        let value = self
            .calculator
            .fetch_base_ma(self.broker.as_ref(), contract, date, session.anchor)
            .await?;
        self.cache.insert(key, value).await;
        Ok(value)
    }

    /// Run one evaluation for a contract
    #[instrument(skip(self, now), fields(session = tracing::field::Empty))]
    pub async fn evaluate(
        &self,
        contract: &str,
        mode: EvaluationMode,
        now: DateTime<FixedOffset>,
    ) -> Result<EvaluationOutcome> {
        let session = SessionConfig::for_time(&self.strategy, &now)?;
        tracing::Span::current().record("session", session.label.as_str());

        if let Some(reason) = self.check_quarantine(contract).await? {
            return Ok(EvaluationOutcome::Quarantined { reason });
        }

        // read immediately before acting; guards one open position per contract
        let state = self.tracker.state(contract).await?;
        match (mode, &state) {
            (EvaluationMode::Entry, PositionState::Open(_)) => {
                return Ok(EvaluationOutcome::no_signal("position already open"));
            }
            (EvaluationMode::Monitor | EvaluationMode::Exit, PositionState::Flat) => {
                return Ok(EvaluationOutcome::no_signal("no open position"));
            }
            _ => {}
        }

        let (decision, price) = if mode == EvaluationMode::Exit {
            let price = match self.broker.snapshot(contract).await {
                Ok(quote) => Some(quote.close),
                Err(e) => {
                    warn!(contract, error = %e, "quote unavailable, closing anyway");
                    None
                }
            };
            (evaluate_exit(&state), price)
        } else {
            let baseline = if state.is_open() {
                None
            } else {
                let date = session.baseline_date(&self.strategy, &now);
                match self.baseline(contract, date, &session).await {
                    Ok(value) => Some(value),
                    Err(e) if e.is_data_unavailable() => {
                        info!(contract, reason = %e, "baseline unavailable");
                        return Ok(EvaluationOutcome::no_signal(e.to_string()));
                    }
                    Err(e) => return Err(e),
                }
            };

            let price = self.broker.snapshot(contract).await?.close;
            debug!(contract, %price, baseline = ?baseline, "evaluating");
            (decide(mode, price, baseline, &session, &state), Some(price))
        };

        match decision {
            Decision::NoGo => Ok(EvaluationOutcome::no_signal(match price {
                Some(p) => format!("no signal at {}", p),
                None => "no signal".to_string(),
            })),
            Decision::Go(intent) => self.execute(contract, &session, &state, intent, price).await,
        }
    }

    async fn execute(
        &self,
        contract: &str,
        session: &SessionConfig,
        state: &PositionState,
        intent: TradeIntent,
        price: Option<Decimal>,
    ) -> Result<EvaluationOutcome> {
        let write = match intent.action {
            Action::Open(side) => PendingWrite::Open {
                side,
                entry_price: price.ok_or_else(|| {
                    ClientError::Internal(format!("no entry price for {}", contract))
                })?,
            },
            Action::Close(reason) => PendingWrite::Close {
                reason,
                position: state.open_position().ok_or_else(|| {
                    ClientError::Internal(format!("close requested for flat {}", contract))
                })?,
            },
        };

        let order = match &write {
            PendingWrite::Open { side, .. } => OrderRequest::market(contract, side.entry_action()),
            PendingWrite::Close { position, .. } => {
                OrderRequest::market(contract, position.side.exit_action())
            }
        };

        info!(contract, action = %order.action, reason = %intent.reason, "placing order");
        let ack = match self.broker.place_order(&order).await {
            Ok(ack) => ack,
            Err(e) => {
                warn!(contract, error = %e, "order placement failed");
                self.notify(&report::order_failed_message(contract, &intent, &e))
                    .await;
                return Ok(EvaluationOutcome::OrderFailed {
                    intent,
                    error: e.to_string(),
                });
            }
        };

        let (recorded, pending) = match write {
            PendingWrite::Open { side, entry_price } => (
                self.tracker
                    .open(contract, side, entry_price, &intent.reason)
                    .await
                    .map(|_| ()),
                PendingRecord::Open,
            ),
            PendingWrite::Close { reason, position } => {
                let detail = format!("{}: {}", reason, intent.reason);
                (
                    self.tracker.close(contract, position, &detail).await,
                    PendingRecord::Close,
                )
            }
        };

        if let Err(e) = recorded {
            error!(contract, error = %e, "order placed but position not recorded");
            self.quarantine
                .write()
                .await
                .insert(contract.to_string(), pending);
            self.notify(&report::record_failed_message(contract, &intent, &e))
                .await;
            return Ok(EvaluationOutcome::RecordFailed {
                intent,
                error: e.to_string(),
            });
        }

        self.notify(&report::executed_message(contract, session, &intent, price, &ack))
            .await;
        Ok(EvaluationOutcome::Executed {
            intent,
            price,
            order_id: ack.order_id,
        })
    }

    /// Returns the pause reason while a contract is still unreconciled
    async fn check_quarantine(&self, contract: &str) -> Result<Option<String>> {
        let pending = match self.quarantine.read().await.get(contract).copied() {
            Some(pending) => pending,
            None => return Ok(None),
        };

        let state = self.tracker.state(contract).await?;
        let reconciled = match pending {
            PendingRecord::Open => state.is_open(),
            PendingRecord::Close => !state.is_open(),
        };

        if reconciled {
            info!(contract, "position table reconciled, resuming");
            self.quarantine.write().await.remove(contract);
            Ok(None)
        } else {
            Ok(Some(format!(
                "waiting for position table to show the {} as {}",
                contract,
                match pending {
                    PendingRecord::Open => "open",
                    PendingRecord::Close => "closed",
                }
            )))
        }
    }

    /// Per-contract block for the one-shot report
    pub async fn report(&self, contract: &str, now: DateTime<FixedOffset>) -> String {
        let session = match SessionConfig::for_time(&self.strategy, &now) {
            Ok(session) => session,
            Err(e) => return report::unavailable_report(contract, &e),
        };

        let date = session.baseline_date(&self.strategy, &now);
        let baseline = match self.baseline(contract, date, &session).await {
            Ok(value) => value,
            Err(e) => return report::unavailable_report(contract, &e),
        };

        match self.broker.snapshot(contract).await {
            Ok(quote) => report::contract_report(
                contract,
                &session,
                self.calculator.window(),
                baseline,
                quote.close,
            ),
            Err(e) => report::quote_unavailable_report(contract, &session, baseline, &e),
        }
    }

    /// Push a message, logging and swallowing any failure
    pub async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.push(text).await {
            warn!(error = %e, "notification failed");
        }
    }
}
