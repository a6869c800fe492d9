//! Card Detail Operations
//!
//! Everything behind the card dialog. Each change also appends to the card's
//! activity log in the same transaction.

use async_trait::async_trait;
use kanban_core::CardDetailView;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use super::card_repo::{card_location, find_card, latest_attachment, row_to_attachment};
use crate::domain::{Activity, Attachment, Card, DomainError, DomainResult};
use crate::repository::db::{read, store_err, write};

/// An attachment row that was just deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedAttachment {
    pub attachment: Attachment,
    pub blob_key: String,
    pub board_id: String,
    pub list_id: String,
    /// The card's latest attachment after the delete
    pub latest: Option<Attachment>,
}

#[async_trait]
pub trait CardDetailOperations {
    async fn update_description(
        &self,
        card_id: &str,
        description: &str,
        activity: &Activity,
    ) -> DomainResult<Card>;

    async fn add_attachment(
        &self,
        attachment: &Attachment,
        blob_key: &str,
        activity: &Activity,
    ) -> DomainResult<()>;

    async fn delete_attachment(&self, attachment_id: &str) -> DomainResult<RemovedAttachment>;

    /// Board and card an attachment belongs to
    async fn attachment_location(&self, attachment_id: &str)
        -> DomainResult<Option<(String, String)>>;

    /// Board owning a stored blob
    async fn blob_board(&self, blob_key: &str) -> DomainResult<Option<String>>;

    /// Card with its activities (newest first) and attachments (oldest first)
    async fn load_detail(&self, card_id: &str) -> DomainResult<CardDetailView>;
}

#[async_trait]
impl CardDetailOperations for super::card_repo::CardRepository {
    async fn update_description(
        &self,
        card_id: &str,
        description: &str,
        activity: &Activity,
    ) -> DomainResult<Card> {
        let activity = activity.clone();
        write(&self.conn, move |tx| {
            let updated = tx
                .execute(
                    "UPDATE cards SET description = ?1 WHERE id = ?2",
                    params![description, card_id],
                )
                .map_err(store_err)?;
            if updated == 0 {
                return Err(DomainError::not_found("Card not found"));
            }
            insert_activity(tx, &activity)?;
            let mut card =
                find_card(tx, card_id)?.ok_or_else(|| DomainError::not_found("Card not found"))?;
            card.attachment = latest_attachment(tx, card_id)?;
            Ok(card)
        })
        .await
    }

    async fn add_attachment(
        &self,
        attachment: &Attachment,
        blob_key: &str,
        activity: &Activity,
    ) -> DomainResult<()> {
        let attachment = attachment.clone();
        let activity = activity.clone();
        write(&self.conn, move |tx| {
            tx.execute(
                "INSERT INTO attachments (id, card_id, name, blob_key, url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    attachment.id,
                    attachment.card_id,
                    attachment.name,
                    blob_key,
                    attachment.url,
                    attachment.created_at
                ],
            )
            .map_err(store_err)?;
            insert_activity(tx, &activity)
        })
        .await
    }

    async fn delete_attachment(&self, attachment_id: &str) -> DomainResult<RemovedAttachment> {
        write(&self.conn, |tx| {
            let (attachment, blob_key) = tx
                .query_row(
                    "SELECT id, card_id, name, url, created_at, blob_key FROM attachments
                     WHERE id = ?1",
                    params![attachment_id],
                    |row| Ok((row_to_attachment(row)?, row.get::<_, String>(5)?)),
                )
                .optional()
                .map_err(store_err)?
                .ok_or_else(|| DomainError::not_found("Attachment not found"))?;

            let (board_id, list_id) = card_location(tx, &attachment.card_id)?
                .ok_or_else(|| DomainError::not_found("Card not found"))?;

            tx.execute("DELETE FROM attachments WHERE id = ?1", params![attachment_id])
                .map_err(store_err)?;
            let latest = latest_attachment(tx, &attachment.card_id)?;

            Ok(RemovedAttachment {
                attachment,
                blob_key,
                board_id,
                list_id,
                latest,
            })
        })
        .await
    }

    async fn attachment_location(
        &self,
        attachment_id: &str,
    ) -> DomainResult<Option<(String, String)>> {
        read(&self.conn, |conn| {
            conn.query_row(
                "SELECT l.board_id, a.card_id FROM attachments a
                 JOIN cards c ON a.card_id = c.id
                 JOIN lists l ON c.list_id = l.id
                 WHERE a.id = ?1",
                params![attachment_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(store_err)
        })
        .await
    }

    async fn blob_board(&self, blob_key: &str) -> DomainResult<Option<String>> {
        read(&self.conn, |conn| {
            conn.query_row(
                "SELECT l.board_id FROM attachments a
                 JOIN cards c ON a.card_id = c.id
                 JOIN lists l ON c.list_id = l.id
                 WHERE a.blob_key = ?1",
                params![blob_key],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)
        })
        .await
    }

    async fn load_detail(&self, card_id: &str) -> DomainResult<CardDetailView> {
        read(&self.conn, |conn| load_detail(conn, card_id)).await
    }
}

fn insert_activity(tx: &Transaction<'_>, activity: &Activity) -> DomainResult<()> {
    tx.execute(
        "INSERT INTO activities (id, card_id, user_id, user_name, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            activity.id,
            activity.card_id,
            activity.user_id,
            activity.user_name,
            activity.description,
            activity.created_at
        ],
    )
    .map_err(store_err)?;
    Ok(())
}

fn load_detail(conn: &Connection, card_id: &str) -> DomainResult<CardDetailView> {
    let mut card =
        find_card(conn, card_id)?.ok_or_else(|| DomainError::not_found("Card not found"))?;
    let (board_id, _) =
        card_location(conn, card_id)?.ok_or_else(|| DomainError::not_found("Card not found"))?;

    let activities: Vec<Activity> = {
        let mut stmt = conn
            .prepare(
                "SELECT id, card_id, user_id, user_name, description, created_at FROM activities
                 WHERE card_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![card_id], |row| {
                Ok(Activity {
                    id: row.get(0)?,
                    card_id: row.get(1)?,
                    user_id: row.get(2)?,
                    user_name: row.get(3)?,
                    description: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(store_err)?;
        rows.collect::<Result<_, _>>().map_err(store_err)?
    };

    let attachments: Vec<Attachment> = {
        let mut stmt = conn
            .prepare(
                "SELECT id, card_id, name, url, created_at FROM attachments
                 WHERE card_id = ?1 ORDER BY created_at, rowid",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![card_id], row_to_attachment)
            .map_err(store_err)?;
        rows.collect::<Result<_, _>>().map_err(store_err)?
    };

    card.attachment = attachments.last().cloned();
    Ok(CardDetailView {
        card,
        board_id,
        activities,
        attachments,
    })
}
