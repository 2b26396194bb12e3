//! SQLite-backed client directory (spec §3/§4.9): clients are discovered
//! lazily, the first time an aggregation pass folds a query-log row bearing
//! their IP into the `clients` table via `INSERT ... ON CONFLICT`. No write
//! to this table happens from the query hot path — `aggregate_from_query_log`
//! is driven entirely by `ClientStatsAggregationJob`.

use async_trait::async_trait;
use glory_hole_application::ports::ClientRepository;
use glory_hole_domain::{Client, DnsError};
use sqlx::{Row, SqlitePool};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn millis_since_epoch(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

fn from_millis(ms: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms.max(0) as u64)
}

pub struct SqliteClientRepository {
    pool: SqlitePool,
}

impl SqliteClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    /// Folds every `query_log` row past the saved watermark into `clients`:
    /// a per-IP `GROUP BY` gives first/last timestamps, a query count, and
    /// blocked/NXDOMAIN counts, which are additively merged into any existing
    /// row (or inserted fresh for an IP never seen before). The watermark in
    /// `client_stats_cursor` then advances to the highest row folded in, so a
    /// crash mid-pass just re-scans a few already-applied rows rather than
    /// double-counting the whole log.
    async fn aggregate_from_query_log(&self) -> Result<u64, DnsError> {
        let mut tx = self.pool.begin().await.map_err(|e| DnsError::Database(e.to_string()))?;

        let cursor: i64 = sqlx::query_scalar("SELECT last_query_log_id FROM client_stats_cursor WHERE id = 1")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DnsError::Database(e.to_string()))?;

        let max_id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM query_log WHERE id > ?")
            .bind(cursor)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DnsError::Database(e.to_string()))?;

        let Some(max_id) = max_id else {
            tx.commit().await.map_err(|e| DnsError::Database(e.to_string()))?;
            return Ok(0);
        };

        let result = sqlx::query(
            "INSERT INTO clients (ip, first_seen, last_seen, total_queries, blocked_count, nxdomain_count) \
             SELECT client_ip, MIN(timestamp), MAX(timestamp), COUNT(*), \
                    SUM(blocked), SUM(CASE WHEN response_code = 'NXDOMAIN' THEN 1 ELSE 0 END) \
             FROM query_log WHERE id > ? AND id <= ? GROUP BY client_ip \
             ON CONFLICT(ip) DO UPDATE SET \
                last_seen = MAX(clients.last_seen, excluded.last_seen), \
                total_queries = clients.total_queries + excluded.total_queries, \
                blocked_count = clients.blocked_count + excluded.blocked_count, \
                nxdomain_count = clients.nxdomain_count + excluded.nxdomain_count",
        )
        .bind(cursor)
        .bind(max_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DnsError::Database(e.to_string()))?;

        sqlx::query("UPDATE client_stats_cursor SET last_query_log_id = ? WHERE id = 1")
            .bind(max_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DnsError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| DnsError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn get_all(&self, limit: u32, offset: u32) -> Result<Vec<Client>, DnsError> {
        let rows = sqlx::query("SELECT ip, first_seen, last_seen, total_queries, blocked_count, nxdomain_count, name, notes, group_name FROM clients ORDER BY last_seen DESC LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DnsError::Database(e.to_string()))?;

        rows.iter().map(row_to_client).collect()
    }

    async fn delete_older_than(&self, days: u32) -> Result<u64, DnsError> {
        let cutoff = millis_since_epoch(SystemTime::now()) - (days as i64 * 86_400_000);
        let result = sqlx::query("DELETE FROM clients WHERE last_seen < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DnsError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<Client, DnsError> {
    let ip_str: String = row.try_get("ip").map_err(|e| DnsError::Database(e.to_string()))?;
    Ok(Client {
        ip: ip_str.parse().map_err(|_| DnsError::Database("corrupt ip in clients table".to_string()))?,
        first_seen: from_millis(row.try_get("first_seen").map_err(|e| DnsError::Database(e.to_string()))?),
        last_seen: from_millis(row.try_get("last_seen").map_err(|e| DnsError::Database(e.to_string()))?),
        total_queries: row.try_get::<i64, _>("total_queries").map_err(|e| DnsError::Database(e.to_string()))? as u64,
        blocked_count: row.try_get::<i64, _>("blocked_count").map_err(|e| DnsError::Database(e.to_string()))? as u64,
        nxdomain_count: row.try_get::<i64, _>("nxdomain_count").map_err(|e| DnsError::Database(e.to_string()))? as u64,
        name: row.try_get("name").map_err(|e| DnsError::Database(e.to_string()))?,
        notes: row.try_get("notes").map_err(|e| DnsError::Database(e.to_string()))?,
        group: row.try_get("group_name").map_err(|e| DnsError::Database(e.to_string()))?,
    })
}
