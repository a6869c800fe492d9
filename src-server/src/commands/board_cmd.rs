//! Board handlers

use axum::extract::{Path, State};
use axum::Json;
use kanban_core::command::{CreateBoard, RenameBoard};
use kanban_core::BoardView;

use super::{ApiResult, CommandBody};
use crate::domain::{Board, DomainError, User};
use crate::session::Actor;
use crate::AppState;

/// `GET /api/session`
pub async fn current_user(Actor(actor): Actor) -> Json<User> {
    Json(actor)
}

/// `GET /api/boards`: boards the caller belongs to
pub async fn list_boards(State(state): State<AppState>, Actor(actor): Actor) -> ApiResult<Vec<Board>> {
    Ok(Json(state.repos.boards.list_for_member(&actor.id).await?))
}

/// `POST /api/boards`
pub async fn create_board(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<CreateBoard>,
) -> ApiResult {
    Ok(Json(state.mutator.create_board(&actor, &command).await?))
}

/// `GET /api/boards/{id}`
pub async fn get_board(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(board_id): Path<String>,
) -> ApiResult<BoardView> {
    if !state.repos.boards.can_read(&board_id, &actor.id).await? {
        return Err(DomainError::NotAuthorized.into());
    }
    Ok(Json(state.repos.boards.load_view(&board_id, &actor.id).await?))
}

/// `POST /api/boards/{id}/name`
pub async fn rename_board(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(board_id): Path<String>,
    CommandBody(command): CommandBody<RenameBoard>,
) -> ApiResult {
    Ok(Json(
        state.mutator.rename_board(&actor, &board_id, &command).await?,
    ))
}

/// `DELETE /api/boards/{id}`
pub async fn delete_board(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(board_id): Path<String>,
) -> ApiResult {
    Ok(Json(state.mutator.delete_board(&actor, &board_id).await?))
}

/// `POST /api/boards/{id}/reindex`
pub async fn reindex_board(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(board_id): Path<String>,
) -> ApiResult {
    Ok(Json(state.mutator.reindex_board(&actor, &board_id).await?))
}
