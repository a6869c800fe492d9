//! List Positioning Operations
//!
//! Moving lists within a board, and keeping positions dense when one goes.

use async_trait::async_trait;
use kanban_core::{plan_reposition, Position, ShiftStep};
use rusqlite::params;

use crate::domain::{DomainError, DomainResult};
use crate::repository::db::{store_err, write};
use crate::repository::plan_sql::{
    count_in_scope, execute_plan, execute_shift, locate, PositionTable,
};

/// What a list deletion left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedList {
    /// Position the list held before it went
    pub position: Position,
    /// Blobs of every attachment on its cards
    pub blob_keys: Vec<String>,
}

#[async_trait]
pub trait ListPositioningOperations {
    /// Move a list from `old_index` to `new_index` on its board.
    ///
    /// `old_index` is the position the client saw. Returns `false` when the
    /// indices are equal and nothing was written.
    async fn move_list(
        &self,
        board_id: &str,
        list_id: &str,
        old_index: Position,
        new_index: Position,
    ) -> DomainResult<bool>;

    /// Delete a list with its cards and close the gap it leaves.
    async fn delete_list_and_compact(&self, board_id: &str, list_id: &str)
        -> DomainResult<DeletedList>;
}

#[async_trait]
impl ListPositioningOperations for super::list_repo::ListRepository {
    async fn move_list(
        &self,
        board_id: &str,
        list_id: &str,
        old_index: Position,
        new_index: Position,
    ) -> DomainResult<bool> {
        write(&self.conn, |tx| {
            let (scope, _) = locate(tx, PositionTable::Lists, list_id)?
                .ok_or_else(|| DomainError::not_found("List not found"))?;
            if scope != board_id {
                return Err(DomainError::validation(DomainError::GENERIC_MESSAGE));
            }

            let count = count_in_scope(tx, PositionTable::Lists, board_id)?;
            if old_index >= count || new_index >= count {
                return Err(DomainError::validation(DomainError::GENERIC_MESSAGE));
            }

            let Some(plan) = plan_reposition(list_id, board_id, old_index, new_index) else {
                return Ok(false);
            };
            execute_plan(tx, PositionTable::Lists, &plan)?;
            Ok(true)
        })
        .await
    }

    async fn delete_list_and_compact(
        &self,
        board_id: &str,
        list_id: &str,
    ) -> DomainResult<DeletedList> {
        write(&self.conn, |tx| {
            let (scope, position) = locate(tx, PositionTable::Lists, list_id)?
                .ok_or_else(|| DomainError::not_found("List not found"))?;
            if scope != board_id {
                return Err(DomainError::validation(DomainError::GENERIC_MESSAGE));
            }

            let blob_keys: Vec<String> = {
                let mut stmt = tx
                    .prepare(
                        "SELECT a.blob_key FROM attachments a
                         JOIN cards c ON a.card_id = c.id
                         WHERE c.list_id = ?1",
                    )
                    .map_err(store_err)?;
                let rows = stmt
                    .query_map(params![list_id], |row| row.get(0))
                    .map_err(store_err)?;
                rows.collect::<Result<_, _>>().map_err(store_err)?
            };

            tx.execute("DELETE FROM lists WHERE id = ?1", params![list_id])
                .map_err(store_err)?;
            execute_shift(
                tx,
                PositionTable::Lists,
                &ShiftStep::closing(board_id, position),
            )?;

            Ok(DeletedList {
                position,
                blob_keys,
            })
        })
        .await
    }
}
