//! User Repository
//!
//! Users are owned by the upstream authenticator; rows here are a cache of
//! what its headers last said, kept for names and invitation lookups.

use rusqlite::{params, OptionalExtension, Row};

use super::db::{read, store_err, write, DbConn};
use crate::domain::{now_millis, DomainResult, User};

pub struct UserRepository {
    conn: DbConn,
}

impl UserRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Insert or refresh a user. Missing name/email keep their stored value.
    pub async fn upsert(&self, user: &User) -> DomainResult<User> {
        let user = user.clone();
        write(&self.conn, move |tx| {
            tx.execute(
                "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = COALESCE(excluded.name, users.name),
                    email = COALESCE(excluded.email, users.email)",
                params![user.id, user.name, user.email, now_millis()],
            )
            .map_err(store_err)?;
            tx.query_row(
                "SELECT id, name, email FROM users WHERE id = ?1",
                params![user.id],
                row_to_user,
            )
            .map_err(store_err)
        })
        .await
    }

    pub async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        read(&self.conn, |conn| {
            conn.query_row(
                "SELECT id, name, email FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(store_err)
        })
        .await
    }

    /// Emails compare case-insensitively
    pub async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let email = email.trim().to_lowercase();
        read(&self.conn, move |conn| {
            conn.query_row(
                "SELECT id, name, email FROM users WHERE lower(email) = ?1 LIMIT 1",
                params![email],
                row_to_user,
            )
            .optional()
            .map_err(store_err)
        })
        .await
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}
