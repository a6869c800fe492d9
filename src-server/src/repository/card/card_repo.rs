//! Card Repository - Creation and Lookups

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{Attachment, Card, DomainResult};
use crate::repository::db::{read, store_err, write, DbConn};
use crate::repository::plan_sql::{count_in_scope, PositionTable};

pub(crate) const CARD_COLUMNS: &str = "id, name, description, list_id, position";

pub struct CardRepository {
    pub(super) conn: DbConn,
}

impl CardRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Board and list the card currently sits in
    pub async fn card_location(&self, card_id: &str) -> DomainResult<Option<(String, String)>> {
        read(&self.conn, |conn| card_location(conn, card_id)).await
    }

    /// Appends to the end of the card's list
    pub async fn create(&self, entity: &Card) -> DomainResult<Card> {
        let mut card = entity.clone();
        write(&self.conn, move |tx| {
            card.position = count_in_scope(tx, PositionTable::Cards, &card.list_id)?;
            tx.execute(
                "INSERT INTO cards (id, name, description, list_id, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    card.id,
                    card.name,
                    card.description,
                    card.list_id,
                    card.position,
                    crate::domain::now_millis()
                ],
            )
            .map_err(store_err)?;
            card.attachment = None;
            Ok(card)
        })
        .await
    }
}

pub(crate) fn find_card(conn: &Connection, card_id: &str) -> DomainResult<Option<Card>> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
        params![card_id],
        row_to_card,
    )
    .optional()
    .map_err(store_err)
}

pub(crate) fn card_location(
    conn: &Connection,
    card_id: &str,
) -> DomainResult<Option<(String, String)>> {
    conn.query_row(
        "SELECT l.board_id, c.list_id FROM cards c JOIN lists l ON c.list_id = l.id
         WHERE c.id = ?1",
        params![card_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(store_err)
}

/// Most recently added attachment, if any
pub(crate) fn latest_attachment(
    conn: &Connection,
    card_id: &str,
) -> DomainResult<Option<Attachment>> {
    conn.query_row(
        "SELECT id, card_id, name, url, created_at FROM attachments
         WHERE card_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
        params![card_id],
        row_to_attachment,
    )
    .optional()
    .map_err(store_err)
}

pub(crate) fn row_to_card(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        list_id: row.get(3)?,
        position: row.get(4)?,
        attachment: None,
    })
}

pub(crate) fn row_to_attachment(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        card_id: row.get(1)?,
        name: row.get(2)?,
        url: row.get(3)?,
        created_at: row.get(4)?,
    })
}
