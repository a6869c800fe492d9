//! Invitation handlers

use axum::extract::{Path, State};
use axum::Json;
use kanban_core::command::InviteUser;

use super::{ApiResult, CommandBody};
use crate::domain::Invitation;
use crate::session::Actor;
use crate::AppState;

/// `GET /api/invitations`: pending invitations for the caller
pub async fn list_invitations(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Vec<Invitation>> {
    Ok(Json(state.repos.invitations.list_for_user(&actor.id).await?))
}

/// `POST /api/invitations`
pub async fn invite_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<InviteUser>,
) -> ApiResult {
    Ok(Json(state.mutator.invite(&actor, &command).await?))
}

/// `POST /api/invitations/{id}/accept`
pub async fn accept_invitation(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult {
    Ok(Json(state.mutator.accept_invitation(&actor, &id).await?))
}

/// `POST /api/invitations/{id}/decline`
pub async fn decline_invitation(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult {
    Ok(Json(state.mutator.decline_invitation(&actor, &id).await?))
}
