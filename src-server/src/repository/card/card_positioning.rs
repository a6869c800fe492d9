//! Card Positioning Operations
//!
//! Cards move within a list or between two lists of the same board.

use async_trait::async_trait;
use kanban_core::{plan_move, CardMoveValues, Position, ShiftStep};
use rusqlite::params;

use crate::domain::{DomainError, DomainResult};
use crate::repository::db::{store_err, write};
use crate::repository::plan_sql::{
    count_in_scope, execute_plan, execute_shift, locate, PositionTable,
};

/// What a card deletion left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedCard {
    pub list_id: String,
    pub position: Position,
    pub blob_keys: Vec<String>,
}

#[async_trait]
pub trait CardPositioningOperations {
    /// Move a card to `values.list_id` at `values.final_card_index`.
    ///
    /// `initial_index` is the position the client saw in `initial_list_id`.
    /// Returns `false` for a same-list move that changes nothing.
    async fn move_card(
        &self,
        board_id: &str,
        values: &CardMoveValues,
        initial_list_id: &str,
        initial_index: Position,
    ) -> DomainResult<bool>;

    /// Delete a card and close the gap in its list.
    async fn delete_card_and_compact(&self, board_id: &str, card_id: &str)
        -> DomainResult<DeletedCard>;
}

#[async_trait]
impl CardPositioningOperations for super::card_repo::CardRepository {
    async fn move_card(
        &self,
        board_id: &str,
        values: &CardMoveValues,
        initial_list_id: &str,
        initial_index: Position,
    ) -> DomainResult<bool> {
        write(&self.conn, |tx| {
            let (current_list, _) = locate(tx, PositionTable::Cards, &values.card_id)?
                .ok_or_else(|| DomainError::not_found("Card not found"))?;
            if current_list != initial_list_id {
                return Err(DomainError::conflict("Card was moved by someone else"));
            }

            for list_id in [initial_list_id, values.list_id.as_str()] {
                let (scope, _) = locate(tx, PositionTable::Lists, list_id)?
                    .ok_or_else(|| DomainError::not_found("List not found"))?;
                if scope != board_id {
                    return Err(DomainError::validation(DomainError::GENERIC_MESSAGE));
                }
            }

            let to_index = values.final_card_index;
            let from_count = count_in_scope(tx, PositionTable::Cards, initial_list_id)?;
            let in_bounds = if initial_list_id == values.list_id {
                initial_index < from_count && to_index < from_count
            } else {
                let to_count = count_in_scope(tx, PositionTable::Cards, &values.list_id)?;
                initial_index < from_count && to_index <= to_count
            };
            if !in_bounds {
                return Err(DomainError::validation(DomainError::GENERIC_MESSAGE));
            }

            let Some(plan) = plan_move(
                &values.card_id,
                initial_list_id,
                initial_index,
                &values.list_id,
                to_index,
            ) else {
                return Ok(false);
            };
            execute_plan(tx, PositionTable::Cards, &plan)?;
            Ok(true)
        })
        .await
    }

    async fn delete_card_and_compact(
        &self,
        board_id: &str,
        card_id: &str,
    ) -> DomainResult<DeletedCard> {
        write(&self.conn, |tx| {
            let (list_id, position) = locate(tx, PositionTable::Cards, card_id)?
                .ok_or_else(|| DomainError::not_found("Card not found"))?;
            let (scope, _) = locate(tx, PositionTable::Lists, &list_id)?
                .ok_or_else(|| DomainError::not_found("List not found"))?;
            if scope != board_id {
                return Err(DomainError::validation(DomainError::GENERIC_MESSAGE));
            }

            let blob_keys: Vec<String> = {
                let mut stmt = tx
                    .prepare("SELECT blob_key FROM attachments WHERE card_id = ?1")
                    .map_err(store_err)?;
                let rows = stmt
                    .query_map(params![card_id], |row| row.get(0))
                    .map_err(store_err)?;
                rows.collect::<Result<_, _>>().map_err(store_err)?
            };

            tx.execute("DELETE FROM cards WHERE id = ?1", params![card_id])
                .map_err(store_err)?;
            execute_shift(
                tx,
                PositionTable::Cards,
                &ShiftStep::closing(&list_id, position),
            )?;

            Ok(DeletedCard {
                list_id,
                position,
                blob_keys,
            })
        })
        .await
    }
}
