//! Polling tasks and one-pass runs over the target contracts

use chrono::{DateTime, FixedOffset, Utc};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::engine::{EvaluationOutcome, Evaluator};
use super::report;
use crate::strategy::EvaluationMode;

/// Drives the evaluator over every target contract
#[derive(Clone)]
pub struct Scheduler {
    evaluator: Arc<Evaluator>,
    targets: Vec<String>,
    interval: Duration,
}

impl Scheduler {
    /// Repeated targets are dropped so each contract gets a single poller
    pub fn new(evaluator: Arc<Evaluator>, mut targets: Vec<String>, interval: Duration) -> Self {
        let mut seen = HashSet::new();
        targets.retain(|contract| {
            let first = seen.insert(contract.clone());
            if !first {
                warn!(contract = %contract, "duplicate target ignored");
            }
            first
        });

        Self {
            evaluator,
            targets,
            interval,
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.evaluator.timezone())
    }

    /// Evaluate each target once, in order
    ///
    /// A failure on one contract is logged and does not stop the others.
    pub async fn run_pass(&self, mode: EvaluationMode) -> Vec<(String, Option<EvaluationOutcome>)> {
        let mut results = Vec::with_capacity(self.targets.len());
        for contract in &self.targets {
            let outcome = evaluate_logged(&self.evaluator, contract, mode, self.now()).await;
            results.push((contract.clone(), outcome));
        }
        results
    }

    /// Build the combined report, push it once and return it
    pub async fn run_report(&self) -> String {
        let now = self.now();
        let mut blocks = Vec::with_capacity(self.targets.len());
        for contract in &self.targets {
            blocks.push(self.evaluator.report(contract, now).await);
        }

        let text = report::combine(report::report_header(&now), &blocks);
        info!(report = %text, "report generated");
        self.evaluator.notify(&text).await;
        text
    }

    /// Poll every target in its own task until `shutdown` turns true
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!(
            targets = ?self.targets,
            interval_secs = self.interval.as_secs(),
            "polling started"
        );

        let handles = self.targets.iter().cloned().map(|contract| {
            let evaluator = Arc::clone(&self.evaluator);
            let interval = self.interval;
            let shutdown = shutdown.clone();
            tokio::spawn(poll_contract(evaluator, contract, interval, shutdown))
        });

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "polling task panicked");
            }
        }
        info!("polling stopped");
    }
}

async fn poll_contract(
    evaluator: Arc<Evaluator>,
    contract: String,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let now = Utc::now().with_timezone(&evaluator.timezone());
        evaluate_logged(&evaluator, &contract, EvaluationMode::Auto, now).await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // sender dropped
                    break;
                }
            }
        }
    }
    info!(contract = %contract, "polling task finished");
}

async fn evaluate_logged(
    evaluator: &Evaluator,
    contract: &str,
    mode: EvaluationMode,
    now: DateTime<FixedOffset>,
) -> Option<EvaluationOutcome> {
    match evaluator.evaluate(contract, mode, now).await {
        Ok(outcome) => {
            match &outcome {
                EvaluationOutcome::NoSignal { reason } => {
                    info!(contract, %mode, reason = %reason, "no signal")
                }
                EvaluationOutcome::Executed { intent, order_id, .. } => {
                    info!(contract, %mode, order_id = %order_id, reason = %intent.reason, "action executed")
                }
                EvaluationOutcome::OrderFailed { error, .. } => {
                    warn!(contract, %mode, error = %error, "order failed")
                }
                EvaluationOutcome::RecordFailed { error, .. } => {
                    error!(contract, %mode, error = %error, "position write failed")
                }
                EvaluationOutcome::Quarantined { reason } => {
                    warn!(contract, %mode, reason = %reason, "contract paused")
                }
            }
            Some(outcome)
        }
        Err(e) => {
            error!(contract, %mode, error = %e, "evaluation failed");
            None
        }
    }
}

/// Flip `shutdown` on Ctrl-C
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal, finishing in-flight evaluations"),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
        let _ = tx.send(true);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::ClientError;
    use crate::config::types::StrategyConfig;
    use crate::store::{InMemoryPositionStore, PositionTracker};
    use crate::testing::{MockBroker, MockNotifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scheduler(broker: MockBroker, notifier: MockNotifier, targets: &[&str]) -> Scheduler {
        let evaluator = Evaluator::new(
            Arc::new(broker),
            Arc::new(notifier),
            PositionTracker::new(Arc::new(InMemoryPositionStore::new())),
            StrategyConfig::default(),
        )
        .unwrap();
        Scheduler::new(
            Arc::new(evaluator),
            targets.iter().map(|t| t.to_string()).collect(),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_pass_isolates_failures() {
        let mut broker = MockBroker::new();
        broker.expect_ticks().returning(|contract, _| {
            if contract == "BAD" {
                Err(ClientError::InvalidResponse("boom".into()))
            } else {
                Ok(Vec::new())
            }
        });
        broker.expect_snapshot().never();

        let sched = scheduler(broker, MockNotifier::new(), &["BAD", "MXF202603"]);
        let results = sched.run_pass(EvaluationMode::Entry).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].0, "MXF202603");
        assert!(results.iter().all(|(_, outcome)| matches!(
            outcome,
            Some(EvaluationOutcome::NoSignal { .. })
        )));
    }

    #[tokio::test]
    async fn test_duplicate_targets_are_evaluated_once() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();

        let mut broker = MockBroker::new();
        broker.expect_ticks().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let sched = scheduler(
            broker,
            MockNotifier::new(),
            &["MXF202603", "MXF202604", "MXF202603"],
        );
        let results = sched.run_pass(EvaluationMode::Entry).await;

        let contracts: Vec<&str> = results.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(contracts, vec!["MXF202603", "MXF202604"]);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_report_pushed_once() {
        let mut broker = MockBroker::new();
        broker.expect_ticks().returning(|_, _| Ok(Vec::new()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_push()
            .withf(|text| {
                text.starts_with("🔔 Breakout monitor report")
                    && text.matches("baseline data unavailable").count() == 2
            })
            .times(1)
            .returning(|_| Ok(()));

        let sched = scheduler(broker, notifier, &["MXF202603", "MXF202604"]);
        let text = sched.run_report().await;
        assert!(text.contains("[MXF202604]"));
    }

    #[tokio::test]
    async fn test_polling_stops_on_shutdown() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();

        let mut broker = MockBroker::new();
        broker.expect_ticks().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let sched = scheduler(broker, MockNotifier::new(), &["MXF202603", "MXF202604"]);
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(async move { sched.run(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        // both tasks ran at least one iteration
        assert!(fetches.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_polling_skips_when_already_shut_down() {
        let mut broker = MockBroker::new();
        broker.expect_ticks().never();

        let sched = scheduler(broker, MockNotifier::new(), &["MXF202603"]);
        let (_tx, rx) = watch::channel(true);
        sched.run(rx).await;
    }
}
