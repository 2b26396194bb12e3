//! Buffered async query-log writer (spec §4.9), backed by SQLite.
//!
//! Grounded on the teacher's `repositories/query_log_repository/writer.rs`:
//! a bounded mpsc channel decouples the hot path from disk, a background
//! task drains it in batches (whichever comes first — batch size or flush
//! interval) and commits each batch as chunked multi-row `INSERT ... VALUES
//! (?,...),(?,...)` statements, `ROWS_PER_CHUNK` sized to stay under
//! SQLite's bound-parameter limit. `submit` itself never awaits; a full
//! channel drops the entry and counts it rather than applying backpressure
//! to the handler.

use async_trait::async_trait;
use glory_hole_application::ports::QueryLogPort;
use glory_hole_domain::{DnsError, QueryLogEntry, QueryStats};
use sqlx::{Row, SqlitePool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const COLS_PER_ROW: usize = 11;
const ROWS_PER_CHUNK: usize = 999 / COLS_PER_ROW;

fn millis_since_epoch(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

fn build_multi_insert_sql(n: usize) -> String {
    debug_assert!(n > 0 && n <= ROWS_PER_CHUNK);
    const HEADER: &str = "INSERT INTO query_log \
        (timestamp, client_ip, domain, query_type, response_code, blocked, cached, response_time_ms, upstream_used, total_latency_ms, upstream_latency_ms) \
        VALUES ";
    const PLACEHOLDER: &str = "(?,?,?,?,?,?,?,?,?,?,?)";
    let mut sql = String::with_capacity(HEADER.len() + n * (PLACEHOLDER.len() + 1));
    sql.push_str(HEADER);
    for i in 0..n {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str(PLACEHOLDER);
    }
    sql
}

pub struct QueryLogWriter {
    sender: mpsc::Sender<QueryLogEntry>,
    pool: SqlitePool,
    dropped: AtomicU64,
}

impl QueryLogWriter {
    pub fn new(pool: SqlitePool, buffer_size: usize, batch_size: usize, flush_interval: Duration, shutdown: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        tokio::spawn(flush_loop(pool.clone(), receiver, batch_size, flush_interval, shutdown));
        Self {
            sender,
            pool,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

async fn flush_loop(pool: SqlitePool, mut receiver: mpsc::Receiver<QueryLogEntry>, batch_size: usize, flush_interval: Duration, shutdown: CancellationToken) {
    let mut batch = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(flush_interval);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                while let Ok(entry) = receiver.try_recv() {
                    batch.push(entry);
                }
                flush_batch(&pool, &mut batch).await;
                return;
            }
            maybe_entry = receiver.recv() => {
                match maybe_entry {
                    Some(entry) => {
                        batch.push(entry);
                        while batch.len() < batch_size {
                            match receiver.try_recv() {
                                Ok(e) => batch.push(e),
                                Err(_) => break,
                            }
                        }
                        if batch.len() >= batch_size {
                            flush_batch(&pool, &mut batch).await;
                        }
                    }
                    None => {
                        flush_batch(&pool, &mut batch).await;
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    flush_batch(&pool, &mut batch).await;
                }
            }
        }
    }
}

async fn flush_batch(pool: &SqlitePool, batch: &mut Vec<QueryLogEntry>) {
    let count = batch.len();
    if count == 0 {
        return;
    }

    let start = Instant::now();

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!(error = %e, count, "failed to begin query log batch transaction");
            batch.clear();
            return;
        }
    };

    let mut inserted = 0usize;
    let mut errors = 0usize;

    for chunk in batch.chunks(ROWS_PER_CHUNK) {
        let sql = build_multi_insert_sql(chunk.len());
        let mut q = sqlx::query(&sql);
        for entry in chunk {
            q = q
                .bind(millis_since_epoch(entry.timestamp))
                .bind(entry.client_ip.to_string())
                .bind(entry.domain.as_str())
                .bind(entry.query_type.as_str())
                .bind(entry.response_code.as_str())
                .bind(entry.blocked as i64)
                .bind(entry.cached as i64)
                .bind(entry.response_time_ms as i64)
                .bind(entry.upstream_used.as_deref())
                .bind(entry.total_latency_ms as i64)
                .bind(entry.upstream_latency_ms.map(|v| v as i64));
        }
        match q.execute(&mut *tx).await {
            Ok(r) => inserted += r.rows_affected() as usize,
            Err(e) => {
                errors += chunk.len();
                tracing::warn!(error = %e, chunk_size = chunk.len(), "failed to insert query log chunk");
            }
        }
    }

    match tx.commit().await {
        Ok(_) => {
            let elapsed = start.elapsed();
            tracing::debug!(
                inserted,
                errors,
                duration_ms = elapsed.as_millis(),
                throughput = (inserted as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64,
                "query log batch flushed"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, count, "failed to commit query log batch");
        }
    }

    batch.clear();
}

#[async_trait]
impl QueryLogPort for QueryLogWriter {
    fn submit(&self, entry: QueryLogEntry) {
        if self.sender.try_send(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn recent(&self, limit: u32) -> Result<Vec<QueryLogEntry>, DnsError> {
        let rows = sqlx::query(
            "SELECT timestamp, client_ip, domain, query_type, response_code, blocked, cached, response_time_ms, upstream_used, total_latency_ms, upstream_latency_ms \
             FROM query_log ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DnsError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let ts_ms: i64 = row.try_get("timestamp").map_err(|e| DnsError::Database(e.to_string()))?;
                let client_ip: String = row.try_get("client_ip").map_err(|e| DnsError::Database(e.to_string()))?;
                Ok(QueryLogEntry {
                    timestamp: UNIX_EPOCH + Duration::from_millis(ts_ms.max(0) as u64),
                    client_ip: client_ip.parse().map_err(|_| DnsError::Database("corrupt client_ip in query_log".to_string()))?,
                    domain: row.try_get("domain").map_err(|e| DnsError::Database(e.to_string()))?,
                    query_type: row.try_get("query_type").map_err(|e| DnsError::Database(e.to_string()))?,
                    response_code: row.try_get("response_code").map_err(|e| DnsError::Database(e.to_string()))?,
                    blocked: row.try_get::<i64, _>("blocked").map_err(|e| DnsError::Database(e.to_string()))? != 0,
                    cached: row.try_get::<i64, _>("cached").map_err(|e| DnsError::Database(e.to_string()))? != 0,
                    response_time_ms: row.try_get::<i64, _>("response_time_ms").map_err(|e| DnsError::Database(e.to_string()))? as u64,
                    upstream_used: row.try_get("upstream_used").map_err(|e| DnsError::Database(e.to_string()))?,
                    total_latency_ms: row.try_get::<i64, _>("total_latency_ms").map_err(|e| DnsError::Database(e.to_string()))? as u64,
                    upstream_latency_ms: row.try_get::<Option<i64>, _>("upstream_latency_ms").map_err(|e| DnsError::Database(e.to_string()))?.map(|v| v as u64),
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<QueryStats, DnsError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
                    SUM(blocked) AS blocked, \
                    SUM(cached) AS cached, \
                    SUM(CASE WHEN response_code = 'NXDOMAIN' THEN 1 ELSE 0 END) AS nxdomain \
             FROM query_log",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DnsError::Database(e.to_string()))?;

        Ok(QueryStats {
            total_queries: row.try_get::<i64, _>("total").unwrap_or(0) as u64,
            blocked_queries: row.try_get::<Option<i64>, _>("blocked").ok().flatten().unwrap_or(0) as u64,
            cached_queries: row.try_get::<Option<i64>, _>("cached").ok().flatten().unwrap_or(0) as u64,
            nxdomain_queries: row.try_get::<Option<i64>, _>("nxdomain").ok().flatten().unwrap_or(0) as u64,
        })
    }

    async fn delete_older_than(&self, retention_days: u32) -> Result<u64, DnsError> {
        let cutoff = millis_since_epoch(SystemTime::now()) - (retention_days as i64 * 86_400_000);
        let result = sqlx::query("DELETE FROM query_log WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DnsError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
