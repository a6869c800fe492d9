//! Board Repository
//!
//! Boards, their memberships, and the full board snapshot a client loads.

use async_trait::async_trait;
use kanban_core::BoardView;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::card::{latest_attachment, row_to_card, CARD_COLUMNS};
use super::db::{read, store_err, write, DbConn};
use super::list::{row_to_list, LIST_COLUMNS};
use super::plan_sql::{reindex_scope, PositionTable};
use super::traits::Repository;
use crate::domain::{now_millis, Board, DomainError, DomainResult, ListWithCards, Visibility};

const BOARD_COLUMNS: &str = "id, name, description, visibility, created_by, created_at";

pub struct BoardRepository {
    conn: DbConn,
}

impl BoardRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    pub async fn is_member(&self, board_id: &str, user_id: &str) -> DomainResult<bool> {
        read(&self.conn, |conn| is_member(conn, board_id, user_id)).await
    }

    /// Members always; anyone when the board is public
    pub async fn can_read(&self, board_id: &str, user_id: &str) -> DomainResult<bool> {
        read(&self.conn, |conn| {
            let Some(board) = find_board(conn, board_id)? else {
                return Ok(false);
            };
            Ok(board.visibility == Visibility::Public || is_member(conn, board_id, user_id)?)
        })
        .await
    }

    /// Boards the user belongs to, newest first
    pub async fn list_for_member(&self, user_id: &str) -> DomainResult<Vec<Board>> {
        read(&self.conn, |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM boards b
                     WHERE EXISTS (SELECT 1 FROM memberships m WHERE m.board_id = b.id AND m.user_id = ?1)
                     ORDER BY b.created_at DESC",
                    prefixed(BOARD_COLUMNS, "b")
                ))
                .map_err(store_err)?;
            let rows = stmt
                .query_map(params![user_id], row_to_board)
                .map_err(store_err)?;
            rows.collect::<Result<_, _>>().map_err(store_err)
        })
        .await
    }

    /// Lists ordered by position, each with its cards ordered by position
    pub async fn load_view(&self, board_id: &str, user_id: &str) -> DomainResult<BoardView> {
        read(&self.conn, |conn| {
            let board = find_board(conn, board_id)?
                .ok_or_else(|| DomainError::not_found("Board not found"))?;
            let is_member = is_member(conn, board_id, user_id)?;

            let mut lists: Vec<ListWithCards> = {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {LIST_COLUMNS} FROM lists WHERE board_id = ?1 ORDER BY position"
                    ))
                    .map_err(store_err)?;
                let rows = stmt
                    .query_map(params![board_id], row_to_list)
                    .map_err(store_err)?;
                rows.map(|r| r.map(ListWithCards::new))
                    .collect::<Result<_, _>>()
                    .map_err(store_err)?
            };

            let mut cards = {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM cards c JOIN lists l ON c.list_id = l.id
                         WHERE l.board_id = ?1 ORDER BY c.position",
                        prefixed(CARD_COLUMNS, "c")
                    ))
                    .map_err(store_err)?;
                let rows = stmt
                    .query_map(params![board_id], row_to_card)
                    .map_err(store_err)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(store_err)?
            };

            for card in &mut cards {
                card.attachment = latest_attachment(conn, &card.id)?;
            }
            for card in cards {
                if let Some(list) = lists.iter_mut().find(|l| l.list.id == card.list_id) {
                    list.cards.push(card);
                }
            }

            Ok(BoardView::new(board, lists, is_member))
        })
        .await
    }

    pub async fn add_member(&self, board_id: &str, user_id: &str) -> DomainResult<()> {
        write(&self.conn, |tx| {
            tx.execute(
                "INSERT OR IGNORE INTO memberships (board_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![board_id, user_id, now_millis()],
            )
            .map_err(store_err)?;
            Ok(())
        })
        .await
    }

    /// Delete the board and everything under it. Returns the blob keys of
    /// the attachments that went with it.
    pub async fn delete_with_blobs(&self, board_id: &str) -> DomainResult<Vec<String>> {
        write(&self.conn, |tx| {
            let keys: Vec<String> = {
                let mut stmt = tx
                    .prepare(
                        "SELECT a.blob_key FROM attachments a
                         JOIN cards c ON a.card_id = c.id
                         JOIN lists l ON c.list_id = l.id
                         WHERE l.board_id = ?1",
                    )
                    .map_err(store_err)?;
                let rows = stmt
                    .query_map(params![board_id], |row| row.get(0))
                    .map_err(store_err)?;
                rows.collect::<Result<_, _>>().map_err(store_err)?
            };

            let deleted = tx
                .execute("DELETE FROM boards WHERE id = ?1", params![board_id])
                .map_err(store_err)?;
            if deleted == 0 {
                return Err(DomainError::not_found("Board not found"));
            }
            Ok(keys)
        })
        .await
    }

    /// Rewrite list positions and every list's card positions to `0..n`.
    pub async fn reindex(&self, board_id: &str) -> DomainResult<usize> {
        write(&self.conn, |tx| {
            let mut changed = reindex_scope(tx, PositionTable::Lists, board_id)?;
            let list_ids: Vec<String> = {
                let mut stmt = tx
                    .prepare("SELECT id FROM lists WHERE board_id = ?1")
                    .map_err(store_err)?;
                let rows = stmt
                    .query_map(params![board_id], |row| row.get(0))
                    .map_err(store_err)?;
                rows.collect::<Result<_, _>>().map_err(store_err)?
            };
            for list_id in &list_ids {
                changed += reindex_scope(tx, PositionTable::Cards, list_id)?;
            }
            Ok(changed)
        })
        .await
    }
}

#[async_trait]
impl Repository<Board> for BoardRepository {
    /// The creator becomes the first member
    async fn create(&self, entity: &Board) -> DomainResult<Board> {
        let board = entity.clone();
        write(&self.conn, move |tx| {
            tx.execute(
                "INSERT INTO boards (id, name, description, visibility, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    board.id,
                    board.name,
                    board.description,
                    board.visibility.as_str(),
                    board.created_by,
                    board.created_at
                ],
            )
            .map_err(store_err)?;
            tx.execute(
                "INSERT INTO memberships (board_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![board.id, board.created_by, board.created_at],
            )
            .map_err(store_err)?;
            Ok(board)
        })
        .await
    }

    async fn find_by_id(&self, id: &String) -> DomainResult<Option<Board>> {
        read(&self.conn, |conn| find_board(conn, id)).await
    }

    async fn update(&self, entity: &Board) -> DomainResult<Board> {
        let board = entity.clone();
        write(&self.conn, move |tx| {
            let updated = tx
                .execute(
                    "UPDATE boards SET name = ?1, description = ?2, visibility = ?3 WHERE id = ?4",
                    params![board.name, board.description, board.visibility.as_str(), board.id],
                )
                .map_err(store_err)?;
            if updated == 0 {
                return Err(DomainError::not_found("Board not found"));
            }
            Ok(board)
        })
        .await
    }
}

pub(super) fn find_board(conn: &Connection, board_id: &str) -> DomainResult<Option<Board>> {
    conn.query_row(
        &format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?1"),
        params![board_id],
        row_to_board,
    )
    .optional()
    .map_err(store_err)
}

pub(super) fn is_member(conn: &Connection, board_id: &str, user_id: &str) -> DomainResult<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM memberships WHERE board_id = ?1 AND user_id = ?2)",
        params![board_id, user_id],
        |row| row.get(0),
    )
    .map_err(store_err)
}

fn row_to_board(row: &Row<'_>) -> rusqlite::Result<Board> {
    let visibility: String = row.get(3)?;
    Ok(Board {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        visibility: Visibility::from_str(&visibility),
        created_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// `a, b` -> `t.a, t.b`
pub(super) fn prefixed(columns: &str, table: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", table, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
