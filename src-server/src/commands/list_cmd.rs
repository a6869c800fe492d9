//! List handlers

use axum::extract::State;
use axum::Json;
use kanban_core::command::{AddList, DeleteList, RenameList};

use super::{ApiResult, CommandBody};
use crate::session::Actor;
use crate::AppState;

/// `POST /api/lists`
pub async fn add_list(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<AddList>,
) -> ApiResult {
    Ok(Json(state.mutator.add_list(&actor, &command).await?))
}

/// `POST /api/lists/name`
pub async fn rename_list(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<RenameList>,
) -> ApiResult {
    Ok(Json(state.mutator.rename_list(&actor, &command).await?))
}

/// `POST /api/lists/delete`
pub async fn delete_list(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<DeleteList>,
) -> ApiResult {
    Ok(Json(state.mutator.delete_list(&actor, &command).await?))
}
