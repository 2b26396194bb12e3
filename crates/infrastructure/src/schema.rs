//! Embedded, forward-only SQLite schema (spec §6's "migrations are
//! forward-only and embedded in the binary").
//!
//! A single `schema_version` row tracks the applied version; `run_migrations`
//! walks the `MIGRATIONS` slice starting just past whatever is recorded,
//! applying each step inside its own transaction.

use glory_hole_domain::DnsError;
use sqlx::SqlitePool;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS query_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        client_ip TEXT NOT NULL,
        domain TEXT NOT NULL,
        query_type TEXT NOT NULL,
        response_code TEXT NOT NULL,
        blocked INTEGER NOT NULL,
        cached INTEGER NOT NULL,
        response_time_ms INTEGER NOT NULL,
        upstream_used TEXT,
        total_latency_ms INTEGER NOT NULL,
        upstream_latency_ms INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_query_log_timestamp ON query_log (timestamp);
    CREATE INDEX IF NOT EXISTS idx_query_log_client_ip ON query_log (client_ip);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        ip TEXT PRIMARY KEY,
        first_seen INTEGER NOT NULL,
        last_seen INTEGER NOT NULL,
        total_queries INTEGER NOT NULL DEFAULT 0,
        blocked_count INTEGER NOT NULL DEFAULT 0,
        nxdomain_count INTEGER NOT NULL DEFAULT 0,
        name TEXT,
        notes TEXT,
        group_name TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS client_stats_cursor (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        last_query_log_id INTEGER NOT NULL DEFAULT 0
    );
    INSERT OR IGNORE INTO client_stats_cursor (id, last_query_log_id) VALUES (1, 0);
    "#,
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DnsError> {
    sqlx::raw_sql(MIGRATIONS[0])
        .execute(pool)
        .await
        .map_err(|e| DnsError::Database(format!("failed to create schema_version table: {e}")))?;

    let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(|e| DnsError::Database(format!("failed to read schema version: {e}")))?;

    for (idx, migration) in MIGRATIONS.iter().enumerate().skip(1) {
        let version = idx as i64;
        if version <= current {
            continue;
        }
        let mut tx = pool.begin().await.map_err(|e| DnsError::Database(e.to_string()))?;
        sqlx::raw_sql(migration).execute(&mut *tx).await.map_err(|e| DnsError::Database(format!("migration {version} failed: {e}")))?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(|e| DnsError::Database(e.to_string()))?;
        tx.commit().await.map_err(|e| DnsError::Database(e.to_string()))?;
    }

    Ok(())
}
