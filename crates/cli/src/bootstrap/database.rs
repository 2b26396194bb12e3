//! Opens the SQLite pool and runs the embedded migrations, adapted from the
//! teacher's `bootstrap/database.rs`. The teacher split reads and writes
//! across two pools; this gateway's write volume (query log batches, client
//! touches) is modest enough that a single pool, grounded on the teacher's
//! simpler single-pool predecessors in the pack, is the right size here.

use glory_hole_domain::config::DatabaseConfig;
use glory_hole_infrastructure::schema;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

pub async fn init_database(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    info!(path = %cfg.path, "initializing database");

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new().max_connections(8).connect_with(options).await?;

    schema::run_migrations(&pool).await?;

    info!("database initialized successfully");
    Ok(pool)
}
