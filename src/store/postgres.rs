//! Postgres-backed position store

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{NewPosition, PositionRecord, PositionStatus, PositionStore};
use crate::common::errors::{ClientError, Result};
use crate::common::types::Side;
use crate::config::types::DatabaseConfig;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS positions (
  id          BIGSERIAL PRIMARY KEY,
  code        TEXT        NOT NULL,
  side        TEXT        NOT NULL,
  entry_price NUMERIC     NOT NULL,
  status      TEXT        NOT NULL DEFAULT 'open',
  reason      TEXT        NOT NULL DEFAULT '',
  opened_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
  closed_at   TIMESTAMPTZ
);
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS positions_code_status_idx ON positions (code, status);";

/// SQLx-backed implementation of PositionStore.
/// Responsible only for persistence and row mapping.
#[derive(Debug, Clone)]
pub struct PgPositionStore {
    pool: PgPool,
}

impl PgPositionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and make sure the table exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect(&config.url)
            .await?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!("Position table ready");
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PositionStore for PgPositionStore {
    #[instrument(skip(self, position), fields(code = %position.code))]
    async fn insert(&self, position: NewPosition) -> Result<PositionRecord> {
        let row = sqlx::query(
            r#"
INSERT INTO positions (code, side, entry_price, status, reason)
VALUES ($1, $2, $3, 'open', $4)
RETURNING id, code, side, entry_price, status, reason, opened_at, closed_at;
"#,
        )
        .bind(&position.code)
        .bind(position.side.as_str())
        .bind(position.entry_price)
        .bind(&position.reason)
        .fetch_one(&self.pool)
        .await?;

        row_to_record(&row)
    }

    #[instrument(skip(self))]
    async fn find_open(&self, code: &str) -> Result<Vec<PositionRecord>> {
        let rows = sqlx::query(
            r#"
SELECT id, code, side, entry_price, status, reason, opened_at, closed_at
FROM positions
WHERE code = $1 AND status = 'open'
ORDER BY opened_at DESC, id DESC;
"#,
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_record(&r) {
                Ok(record) => out.push(record),
                Err(e) => {
                    warn!(error = %e, "skipping malformed position row");
                }
            }
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    async fn mark_closed(&self, id: i64, reason: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
UPDATE positions
SET status = 'closed',
    closed_at = now(),
    reason = reason || ' | ' || $2
WHERE id = $1 AND status = 'open';
"#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ClientError::Internal(format!(
                "no open position with id {}",
                id
            )));
        }
        Ok(())
    }
}

fn parse_status(raw: &str) -> Result<PositionStatus> {
    match raw {
        "open" => Ok(PositionStatus::Open),
        "closed" => Ok(PositionStatus::Closed),
        other => Err(ClientError::InvalidResponse(format!(
            "unknown position status: {}",
            other
        ))),
    }
}

fn row_to_record(r: &PgRow) -> Result<PositionRecord> {
    let side: String = r.try_get("side")?;
    let status: String = r.try_get("status")?;

    Ok(PositionRecord {
        id: r.try_get("id")?,
        code: r.try_get("code")?,
        side: side
            .parse::<Side>()
            .map_err(ClientError::InvalidResponse)?,
        entry_price: r.try_get("entry_price")?,
        status: parse_status(&status)?,
        reason: r.try_get("reason")?,
        opened_at: r.try_get("opened_at")?,
        closed_at: r.try_get("closed_at")?,
    })
}
