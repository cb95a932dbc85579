use async_trait::async_trait;
use libsql::params;
use thiserror::Error;

use super::models::{CheckRow, EndpointRecord};
use crate::config::EndpointConfig;
use crate::monitoring::types::ProbeOutcome;
use crate::pool::{LibsqlManager, LibsqlPool};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool::managed::PoolError<libsql::Error>),
    #[error("failed to serialize endpoint config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("upsert did not produce an endpoint row")]
    UpsertMissingRow,
}

/// Query contract over the persisted endpoints and their check history.
///
/// Check rows are append-only; "most recent" means highest `checked_at`,
/// with the rowid breaking timestamp ties in insertion order.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert the endpoint or update the row matched by its unique name.
    /// The returned id is stable across updates.
    async fn upsert_endpoint(&self, endpoint: &EndpointConfig) -> Result<i64, StoreError>;

    /// Read one endpoint row back by name.
    async fn endpoint_by_name(&self, name: &str) -> Result<Option<EndpointRecord>, StoreError>;

    /// Append one immutable check result row.
    async fn insert_check(
        &self,
        endpoint_id: i64,
        checked_at: i64,
        outcome: &ProbeOutcome,
    ) -> Result<(), StoreError>;

    /// Most recent check for the endpoint, or None if none were recorded.
    async fn last_check(&self, endpoint_id: i64) -> Result<Option<CheckRow>, StoreError>;

    /// Count of ok checks and of all checks with `checked_at >= since`
    /// (all checks when `since` is None). `(0, 0)` means no data.
    async fn uptime(&self, endpoint_id: i64, since: Option<i64>) -> Result<(i64, i64), StoreError>;

    /// The most recent `limit` checks, newest first.
    async fn history(&self, endpoint_id: i64, limit: usize) -> Result<Vec<CheckRow>, StoreError>;
}

/// LibSQL-backed store implementation.
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Store for LibsqlStore {
    async fn upsert_endpoint(&self, endpoint: &EndpointConfig) -> Result<i64, StoreError> {
        let conn = self.get_conn().await?;
        let headers_json = endpoint
            .headers
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let expected_statuses_json = endpoint
            .expected_statuses
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let created_at = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO endpoints (name, url, method, interval_seconds, timeout_seconds, headers_json, expected_statuses_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                url = excluded.url,
                method = excluded.method,
                interval_seconds = excluded.interval_seconds,
                timeout_seconds = excluded.timeout_seconds,
                headers_json = excluded.headers_json,
                expected_statuses_json = excluded.expected_statuses_json",
            params![
                endpoint.name.clone(),
                endpoint.url.clone(),
                endpoint.method.clone(),
                endpoint.interval_seconds as i64,
                endpoint.timeout_seconds as i64,
                headers_json,
                expected_statuses_json,
                created_at
            ],
        )
        .await?;

        // last_insert_rowid is wrong on the update path, so read the id back.
        let mut rows = conn
            .query(
                "SELECT id FROM endpoints WHERE name = ?",
                params![endpoint.name.clone()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::UpsertMissingRow)?;
        Ok(row.get::<i64>(0)?)
    }

    async fn endpoint_by_name(&self, name: &str) -> Result<Option<EndpointRecord>, StoreError> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, url, method, interval_seconds, timeout_seconds, headers_json, expected_statuses_json, created_at
                 FROM endpoints WHERE name = ?",
            )
            .await?;

        let mut rows = stmt.query(params![name.to_string()]).await?;
        if let Some(row) = rows.next().await? {
            Ok(Some(EndpointRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                method: row.get(3)?,
                interval_seconds: row.get::<i64>(4)? as u64,
                timeout_seconds: row.get::<i64>(5)? as u64,
                headers_json: row.get(6)?,
                expected_statuses_json: row.get(7)?,
                created_at: row.get(8)?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn insert_check(
        &self,
        endpoint_id: i64,
        checked_at: i64,
        outcome: &ProbeOutcome,
    ) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO checks (endpoint_id, checked_at, ok, status_code, latency_ms, error)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                endpoint_id,
                checked_at,
                if outcome.ok { 1 } else { 0 },
                outcome.status_code.map(i64::from),
                outcome.latency_ms as i64,
                outcome.error.clone()
            ],
        )
        .await?;
        Ok(())
    }

    async fn last_check(&self, endpoint_id: i64) -> Result<Option<CheckRow>, StoreError> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT checked_at, ok, status_code, latency_ms, error
                 FROM checks
                 WHERE endpoint_id = ?
                 ORDER BY checked_at DESC, id DESC
                 LIMIT 1",
            )
            .await?;

        let mut rows = stmt.query(params![endpoint_id]).await?;
        if let Some(row) = rows.next().await? {
            Ok(Some(check_row_from(&row)?))
        } else {
            Ok(None)
        }
    }

    async fn uptime(&self, endpoint_id: i64, since: Option<i64>) -> Result<(i64, i64), StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = match since {
            Some(since) => {
                conn.query(
                    "SELECT SUM(ok), COUNT(*) FROM checks WHERE endpoint_id = ? AND checked_at >= ?",
                    params![endpoint_id, since],
                )
                .await?
            }
            None => {
                conn.query(
                    "SELECT SUM(ok), COUNT(*) FROM checks WHERE endpoint_id = ?",
                    params![endpoint_id],
                )
                .await?
            }
        };

        let Some(row) = rows.next().await? else {
            return Ok((0, 0));
        };
        let up = row.get::<Option<i64>>(0)?.unwrap_or(0);
        let total = row.get::<i64>(1)?;
        Ok((up, total))
    }

    async fn history(&self, endpoint_id: i64, limit: usize) -> Result<Vec<CheckRow>, StoreError> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT checked_at, ok, status_code, latency_ms, error
                 FROM checks
                 WHERE endpoint_id = ?
                 ORDER BY checked_at DESC, id DESC
                 LIMIT ?",
            )
            .await?;

        let mut rows = stmt.query(params![endpoint_id, limit as i64]).await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(check_row_from(&row)?);
        }
        Ok(results)
    }
}

fn check_row_from(row: &libsql::Row) -> Result<CheckRow, StoreError> {
    Ok(CheckRow {
        checked_at: row.get(0)?,
        ok: row.get::<i64>(1)? != 0,
        status_code: row.get::<Option<i64>>(2)?.map(|code| code as u16),
        latency_ms: row.get::<Option<i64>>(3)?.map(|latency| latency as u64),
        error: row.get(4)?,
    })
}
