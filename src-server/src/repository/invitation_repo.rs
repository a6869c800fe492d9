//! Invitation Repository
//!
//! Requests for a user to join a board. Accepting one turns it into a
//! membership; either answer removes it.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::board_repo::is_member;
use super::db::{read, store_err, write, DbConn};
use crate::domain::{now_millis, DomainError, DomainResult, Invitation};

const INVITATION_SELECT: &str = "SELECT i.id, i.board_id, b.name, i.requester_id, u.name,
        i.requestee_id, i.created_at
    FROM invitations i
    JOIN boards b ON i.board_id = b.id
    LEFT JOIN users u ON i.requester_id = u.id";

pub struct InvitationRepository {
    conn: DbConn,
}

impl InvitationRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Record an invitation unless the requestee already belongs to the
    /// board or already has one pending.
    pub async fn create(
        &self,
        id: &str,
        board_id: &str,
        requester_id: &str,
        requestee_id: &str,
    ) -> DomainResult<Invitation> {
        write(&self.conn, |tx| {
            if is_member(tx, board_id, requestee_id)? {
                return Err(DomainError::conflict(
                    "User is already a member of this board!",
                ));
            }
            let pending: bool = tx
                .query_row(
                    "SELECT EXISTS (SELECT 1 FROM invitations WHERE board_id = ?1 AND requestee_id = ?2)",
                    params![board_id, requestee_id],
                    |row| row.get(0),
                )
                .map_err(store_err)?;
            if pending {
                return Err(DomainError::conflict(
                    "User has already been invited to this board!",
                ));
            }

            tx.execute(
                "INSERT INTO invitations (id, board_id, requester_id, requestee_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, board_id, requester_id, requestee_id, now_millis()],
            )
            .map_err(store_err)?;
            find_invitation(tx, id)?.ok_or_else(|| DomainError::not_found("Invitation not found"))
        })
        .await
    }

    pub async fn find_by_id(&self, id: &str) -> DomainResult<Option<Invitation>> {
        read(&self.conn, |conn| find_invitation(conn, id)).await
    }

    /// Pending invitations addressed to the user, newest first
    pub async fn list_for_user(&self, user_id: &str) -> DomainResult<Vec<Invitation>> {
        read(&self.conn, |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "{INVITATION_SELECT} WHERE i.requestee_id = ?1 ORDER BY i.created_at DESC"
                ))
                .map_err(store_err)?;
            let rows = stmt
                .query_map(params![user_id], row_to_invitation)
                .map_err(store_err)?;
            rows.collect::<Result<_, _>>().map_err(store_err)
        })
        .await
    }

    /// Join the board and drop the invitation. Only the requestee may answer.
    pub async fn accept(&self, id: &str, user_id: &str) -> DomainResult<Invitation> {
        write(&self.conn, |tx| {
            let invitation = owned_invitation(tx, id, user_id)?;
            tx.execute(
                "INSERT OR IGNORE INTO memberships (board_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![invitation.board_id, user_id, now_millis()],
            )
            .map_err(store_err)?;
            tx.execute("DELETE FROM invitations WHERE id = ?1", params![id])
                .map_err(store_err)?;
            Ok(invitation)
        })
        .await
    }

    pub async fn decline(&self, id: &str, user_id: &str) -> DomainResult<Invitation> {
        write(&self.conn, |tx| {
            let invitation = owned_invitation(tx, id, user_id)?;
            tx.execute("DELETE FROM invitations WHERE id = ?1", params![id])
                .map_err(store_err)?;
            Ok(invitation)
        })
        .await
    }
}

fn owned_invitation(conn: &Connection, id: &str, user_id: &str) -> DomainResult<Invitation> {
    let invitation =
        find_invitation(conn, id)?.ok_or_else(|| DomainError::not_found("Invitation not found"))?;
    if invitation.requestee_id != user_id {
        return Err(DomainError::NotAuthorized);
    }
    Ok(invitation)
}

fn find_invitation(conn: &Connection, id: &str) -> DomainResult<Option<Invitation>> {
    conn.query_row(
        &format!("{INVITATION_SELECT} WHERE i.id = ?1"),
        params![id],
        row_to_invitation,
    )
    .optional()
    .map_err(store_err)
}

fn row_to_invitation(row: &Row<'_>) -> rusqlite::Result<Invitation> {
    Ok(Invitation {
        id: row.get(0)?,
        board_id: row.get(1)?,
        board_name: row.get(2)?,
        requester_id: row.get(3)?,
        requester_name: row.get(4)?,
        requestee_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}
