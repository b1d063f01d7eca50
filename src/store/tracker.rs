//! Position state tracker
//!
//! Presents the position table as a `flat` / `open(side, entry)` state per
//! contract and guards the one-open-position-per-contract rule. The guard is
//! read-then-act, not transactional; a single process owns all contracts.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use super::{NewPosition, PositionRecord, PositionStore};
use crate::common::errors::{ClientError, Result};
use crate::common::types::Side;
use crate::strategy::{OpenPosition, PositionState};

#[derive(Clone)]
pub struct PositionTracker {
    store: Arc<dyn PositionStore>,
}

impl PositionTracker {
    pub fn new(store: Arc<dyn PositionStore>) -> Self {
        Self { store }
    }

    /// Current state of a contract
    pub async fn state(&self, code: &str) -> Result<PositionState> {
        let rows = self.store.find_open(code).await?;
        if rows.len() > 1 {
            warn!(
                contract = code,
                open_rows = rows.len(),
                "more than one open position row, using the most recent"
            );
        }

        Ok(match rows.into_iter().next() {
            Some(row) => PositionState::Open(OpenPosition {
                id: row.id,
                side: row.side,
                entry_price: row.entry_price,
            }),
            None => PositionState::Flat,
        })
    }

    /// Record a newly opened position
    ///
    /// Refuses when the store already holds an open row for the contract.
    pub async fn open(
        &self,
        code: &str,
        side: Side,
        entry_price: Decimal,
        reason: &str,
    ) -> Result<PositionRecord> {
        if self.state(code).await?.is_open() {
            return Err(ClientError::Internal(format!(
                "position already open for {}",
                code
            )));
        }

        let record = self
            .store
            .insert(NewPosition {
                code: code.to_string(),
                side,
                entry_price,
                reason: reason.to_string(),
            })
            .await?;
        info!(contract = code, id = record.id, %side, %entry_price, "position opened");
        Ok(record)
    }

    /// Mark an open position closed
    pub async fn close(&self, code: &str, position: &OpenPosition, reason: &str) -> Result<()> {
        self.store.mark_closed(position.id, reason).await?;
        info!(contract = code, id = position.id, reason, "position closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPositionStore;
    use rust_decimal_macros::dec;

    fn tracker() -> (PositionTracker, Arc<InMemoryPositionStore>) {
        let store = Arc::new(InMemoryPositionStore::new());
        (PositionTracker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_flat_then_open_then_flat() {
        let (tracker, _) = tracker();
        assert_eq!(tracker.state("MXF202603").await.unwrap(), PositionState::Flat);

        tracker
            .open("MXF202603", Side::Short, dec!(19926), "breakdown")
            .await
            .unwrap();
        let state = tracker.state("MXF202603").await.unwrap();
        let position = state.open_position().cloned().unwrap();
        assert_eq!(position.side, Side::Short);
        assert_eq!(position.entry_price, dec!(19926));

        tracker.close("MXF202603", &position, "stop_loss").await.unwrap();
        assert_eq!(tracker.state("MXF202603").await.unwrap(), PositionState::Flat);
    }

    #[tokio::test]
    async fn test_second_open_is_refused() {
        let (tracker, store) = tracker();
        tracker.open("MXF202603", Side::Long, dec!(100), "a").await.unwrap();
        assert!(tracker.open("MXF202603", Side::Long, dec!(101), "b").await.is_err());
        assert_eq!(store.find_open("MXF202603").await.unwrap().len(), 1);

        // other contracts are independent
        tracker.open("MXF202604", Side::Long, dec!(100), "c").await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_open_rows_use_most_recent() {
        let (tracker, store) = tracker();
        for price in [dec!(100), dec!(200)] {
            store
                .insert(NewPosition {
                    code: "MXF202603".into(),
                    side: Side::Long,
                    entry_price: price,
                    reason: String::new(),
                })
                .await
                .unwrap();
        }
        let state = tracker.state("MXF202603").await.unwrap();
        assert_eq!(state.open_position().unwrap().entry_price, dec!(200));
    }
}
