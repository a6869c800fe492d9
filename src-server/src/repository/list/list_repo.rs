//! List Repository - Core CRUD Operations

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{DomainError, DomainResult, List};
use crate::repository::db::{read, store_err, write, DbConn};
use crate::repository::plan_sql::{count_in_scope, PositionTable};
use crate::repository::traits::Repository;

pub(crate) const LIST_COLUMNS: &str = "id, name, board_id, position, created_by, created_at";

pub struct ListRepository {
    pub(super) conn: DbConn,
}

impl ListRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Board the list belongs to
    pub async fn board_of(&self, list_id: &str) -> DomainResult<Option<String>> {
        read(&self.conn, |conn| {
            conn.query_row(
                "SELECT board_id FROM lists WHERE id = ?1",
                params![list_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)
        })
        .await
    }
}

#[async_trait]
impl Repository<List> for ListRepository {
    /// Appends: the new list's position is the board's current list count.
    async fn create(&self, entity: &List) -> DomainResult<List> {
        let mut list = entity.clone();
        write(&self.conn, move |tx| {
            list.position = count_in_scope(tx, PositionTable::Lists, &list.board_id)?;
            tx.execute(
                "INSERT INTO lists (id, name, board_id, position, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    list.id,
                    list.name,
                    list.board_id,
                    list.position,
                    list.created_by,
                    list.created_at
                ],
            )
            .map_err(store_err)?;
            Ok(list)
        })
        .await
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<List>> {
        read(&self.conn, |conn| find_list(conn, id)).await
    }

    /// Renames only
    async fn update(&self, entity: &List) -> DomainResult<List> {
        let list_id = entity.id.clone();
        let name = entity.name.clone();
        write(&self.conn, move |tx| {
            let updated = tx
                .execute(
                    "UPDATE lists SET name = ?1 WHERE id = ?2",
                    params![name, list_id],
                )
                .map_err(store_err)?;
            if updated == 0 {
                return Err(DomainError::not_found("List not found"));
            }
            find_list(tx, &list_id)?.ok_or_else(|| DomainError::not_found("List not found"))
        })
        .await
    }
}

pub(crate) fn find_list(conn: &Connection, list_id: &str) -> DomainResult<Option<List>> {
    conn.query_row(
        &format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ?1"),
        params![list_id],
        row_to_list,
    )
    .optional()
    .map_err(store_err)
}

pub(crate) fn row_to_list(row: &Row<'_>) -> rusqlite::Result<List> {
    Ok(List {
        id: row.get(0)?,
        name: row.get(1)?,
        board_id: row.get(2)?,
        position: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}
