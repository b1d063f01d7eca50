//! In-process position store

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::{NewPosition, PositionRecord, PositionStatus, PositionStore};
use crate::common::errors::{ClientError, Result};

/// Position store kept in memory
///
/// Used when no database is configured and in tests. State is lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryPositionStore {
    rows: RwLock<Vec<PositionRecord>>,
    next_id: AtomicI64,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row ever written, in insertion order
    pub async fn rows(&self) -> Vec<PositionRecord> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn insert(&self, position: NewPosition) -> Result<PositionRecord> {
        let record = PositionRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            code: position.code,
            side: position.side,
            entry_price: position.entry_price,
            status: PositionStatus::Open,
            reason: position.reason,
            opened_at: Utc::now(),
            closed_at: None,
        };
        self.rows.write().await.push(record.clone());
        Ok(record)
    }

    async fn find_open(&self, code: &str) -> Result<Vec<PositionRecord>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|r| r.code == code && r.status == PositionStatus::Open)
            .cloned()
            .collect())
    }

    async fn mark_closed(&self, id: i64, reason: &str) -> Result<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ClientError::Internal(format!("position {} not found", id)))?;
        row.status = PositionStatus::Closed;
        row.closed_at = Some(Utc::now());
        row.reason = format!("{} | {}", row.reason, reason);
        Ok(())
    }
}
