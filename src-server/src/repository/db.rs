//! Database Connection and Setup
//!
//! One SQLite connection behind an async mutex. Every write runs inside a
//! single transaction that is rolled back if any step fails.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, Transaction};
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Shared database handle
pub type DbConn = Arc<Mutex<Connection>>;

/// Convert a driver error. Details go to the log, not to the user.
pub fn store_err(e: rusqlite::Error) -> DomainError {
    tracing::error!("database error: {}", e);
    DomainError::store(e.to_string())
}

/// Open (or create) the database and run migrations.
pub async fn init_db(db_path: &Path) -> DomainResult<DbConn> {
    let conn = if db_path.as_os_str() == ":memory:" {
        Connection::open_in_memory()
    } else {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DomainError::store(format!("create {}: {}", parent.display(), e)))?;
        }
        Connection::open(db_path)
    }
    .map_err(store_err)?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(store_err)?;
    run_migrations(&conn)?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Run `f` inside one transaction; commit only if it succeeds.
pub async fn write<T, F>(conn: &DbConn, f: F) -> DomainResult<T>
where
    F: FnOnce(&Transaction<'_>) -> DomainResult<T> + Send,
    T: Send,
{
    let mut guard = conn.lock().await;
    let tx = guard.transaction().map_err(store_err)?;
    let out = f(&tx)?;
    tx.commit().map_err(store_err)?;
    Ok(out)
}

/// Run a read-only closure against the connection.
pub async fn read<T, F>(conn: &DbConn, f: F) -> DomainResult<T>
where
    F: FnOnce(&Connection) -> DomainResult<T> + Send,
    T: Send,
{
    let guard = conn.lock().await;
    f(&guard)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT,
            email TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

        CREATE TABLE IF NOT EXISTS boards (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            visibility TEXT NOT NULL DEFAULT 'private',
            created_by TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS memberships (
            board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (board_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS lists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            created_by TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_lists_board_position ON lists(board_id, position);

        CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            list_id TEXT NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cards_list_position ON cards(list_id, position);

        CREATE TABLE IF NOT EXISTS attachments (
            id TEXT PRIMARY KEY,
            card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            blob_key TEXT NOT NULL,
            url TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_attachments_card ON attachments(card_id, created_at);

        CREATE TABLE IF NOT EXISTS activities (
            id TEXT PRIMARY KEY,
            card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            user_name TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_activities_card ON activities(card_id, created_at);

        CREATE TABLE IF NOT EXISTS invitations (
            id TEXT PRIMARY KEY,
            board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            requester_id TEXT NOT NULL,
            requestee_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (board_id, requestee_id)
        );",
    )
    .map_err(store_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = init_db(Path::new(":memory:")).await.unwrap();
        let conn = db.lock().await;
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 8);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let db = init_db(Path::new(":memory:")).await.unwrap();

        let result: DomainResult<()> = write(&db, |tx| {
            tx.execute(
                "INSERT INTO users (id, name, email, created_at) VALUES ('u1', NULL, NULL, 0)",
                [],
            )
            .map_err(store_err)?;
            Err(DomainError::conflict("abort"))
        })
        .await;
        assert!(result.is_err());

        let count: i64 = read(&db, |conn| {
            conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(store_err)
        })
        .await
        .unwrap();
        assert_eq!(count, 0);
    }
}
