//! Invitation commands

use kanban_core::command::InviteUser;
use kanban_core::{CommandResponse, Invitation};

use super::{fetch, post, send, send_empty};

pub async fn list_invitations() -> Result<Vec<Invitation>, String> {
    fetch("/api/invitations").await
}

pub async fn invite_user(args: &InviteUser) -> Result<CommandResponse, String> {
    send("/api/invitations", args).await
}

pub async fn accept_invitation(invitation_id: &str) -> Result<CommandResponse, String> {
    send_empty(post(&format!("/api/invitations/{invitation_id}/accept"))).await
}

pub async fn decline_invitation(invitation_id: &str) -> Result<CommandResponse, String> {
    send_empty(post(&format!("/api/invitations/{invitation_id}/decline"))).await
}
