//! Card handlers: tiles, the detail dialog and attachments

use axum::extract::{Path, State};
use axum::Json;
use kanban_core::command::{AddAttachment, AddCard, DeleteAttachment, DeleteCard, UpdateDescription};
use kanban_core::CardDetailView;

use super::{ApiResult, CommandBody};
use crate::domain::DomainError;
use crate::repository::CardDetailOperations;
use crate::session::Actor;
use crate::AppState;

/// `POST /api/cards`
pub async fn add_card(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<AddCard>,
) -> ApiResult {
    Ok(Json(state.mutator.add_card(&actor, &command).await?))
}

/// `POST /api/cards/delete`
pub async fn delete_card(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<DeleteCard>,
) -> ApiResult {
    Ok(Json(state.mutator.delete_card(&actor, &command).await?))
}

/// `GET /api/cards/{id}`
pub async fn get_card(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(card_id): Path<String>,
) -> ApiResult<CardDetailView> {
    let (board_id, _) = state
        .repos
        .cards
        .card_location(&card_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Card not found"))?;
    if !state.repos.boards.can_read(&board_id, &actor.id).await? {
        return Err(DomainError::NotAuthorized.into());
    }
    Ok(Json(state.repos.cards.load_detail(&card_id).await?))
}

/// `POST /api/cards/description`
pub async fn update_description(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<UpdateDescription>,
) -> ApiResult {
    Ok(Json(state.mutator.update_description(&actor, &command).await?))
}

/// `POST /api/attachments`
pub async fn add_attachment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<AddAttachment>,
) -> ApiResult {
    Ok(Json(state.mutator.add_attachment(&actor, &command).await?))
}

/// `POST /api/attachments/delete`
pub async fn delete_attachment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<DeleteAttachment>,
) -> ApiResult {
    Ok(Json(state.mutator.delete_attachment(&actor, &command).await?))
}
