//! Connection pool and schema bootstrap.
//!
//! The schema is created with `CREATE ... IF NOT EXISTS`, so [`migrate`] is safe
//! to run on every start.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, instrument};

use crate::error::{StoreError, StoreResult, map_sqlx_error};

/// How long a writer waits for the database lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stock_items (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL,
        name_key    TEXT    NOT NULL,
        quantity    INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
        created_at  TEXT    NOT NULL,
        updated_at  TEXT    NOT NULL,
        CONSTRAINT uq_stock_items_name_key UNIQUE (name_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id        INTEGER NOT NULL REFERENCES stock_items (id) ON DELETE CASCADE,
        movement_type  TEXT    NOT NULL CHECK (movement_type IN ('ENTRY', 'USE', 'LOSS', 'DAMAGE')),
        quantity       INTEGER NOT NULL CHECK (quantity > 0),
        location       TEXT,
        reason         TEXT,
        created_at     TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_stock_movements_item ON stock_movements (item_id)",
    "CREATE INDEX IF NOT EXISTS ix_stock_movements_recent ON stock_movements (created_at DESC, id DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        name_key    TEXT NOT NULL,
        address     TEXT,
        notes       TEXT,
        created_at  TEXT NOT NULL,
        CONSTRAINT uq_locations_name_key UNIQUE (name_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sectors (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        location_id  INTEGER NOT NULL REFERENCES locations (id),
        name         TEXT    NOT NULL,
        name_key     TEXT    NOT NULL,
        created_at   TEXT    NOT NULL,
        CONSTRAINT uq_sectors_location_name_key UNIQUE (location_id, name_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS equipments (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT    NOT NULL,
        brand         TEXT,
        value         TEXT,
        invoice_nf    TEXT,
        barcode_pat   TEXT    NOT NULL,
        invoice_file  TEXT,
        invoice_mime  TEXT,
        location_id   INTEGER NOT NULL REFERENCES locations (id),
        sector_id     INTEGER NOT NULL REFERENCES sectors (id),
        created_at    TEXT    NOT NULL,
        updated_at    TEXT    NOT NULL,
        CONSTRAINT uq_equipments_barcode UNIQUE (barcode_pat)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_equipments_location ON equipments (location_id)",
    "CREATE INDEX IF NOT EXISTS ix_equipments_sector ON equipments (sector_id)",
];

/// Open a pool for `database_url` (e.g. `sqlite://almox.db?mode=rwc`).
///
/// Foreign keys are always enabled. In-memory URLs get a private
/// single-connection pool (see [`connect_in_memory`]).
#[instrument(skip_all, err)]
pub async fn connect(database_url: &str) -> StoreResult<SqlitePool> {
    if is_in_memory(database_url) {
        return connect_in_memory().await;
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StoreError::Database(format!("invalid database url: {e}")))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    migrate(&pool).await?;
    info!("database ready");
    Ok(pool)
}

/// A private in-memory database.
///
/// Every SQLite `:memory:` connection is its own database, so the pool is
/// pinned to a single connection that never expires.
pub async fn connect_in_memory() -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| StoreError::Database(format!("invalid database url: {e}")))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Open a write transaction.
///
/// `BEGIN IMMEDIATE` takes the write lock up front, waiting up to
/// [`BUSY_TIMEOUT`] for it. A deferred transaction that reads before it writes
/// would instead fail its lock upgrade with `database is locked` under
/// concurrent writers.
pub(crate) async fn begin_write(pool: &SqlitePool) -> StoreResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Create tables and indexes that do not exist yet.
pub async fn migrate(pool: &SqlitePool) -> StoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        migrate(&pool).await.unwrap();

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('stock_items', 'stock_movements', 'locations', 'sectors', 'equipments')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn recognizes_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://almox?mode=memory"));
        assert!(!is_in_memory("sqlite://almox.db?mode=rwc"));
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let pool = connect_in_memory().await.unwrap();
        let err = sqlx::query(
            "INSERT INTO stock_movements (item_id, movement_type, quantity, created_at) \
             VALUES (999, 'ENTRY', 1, '2024-01-01T00:00:00.000000Z')",
        )
        .execute(&pool)
        .await
        .unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation()));
    }
}
