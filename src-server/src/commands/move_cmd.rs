//! Drag-and-drop moves

use axum::extract::State;
use axum::Json;
use kanban_core::MoveCommand;

use super::{ApiResult, CommandBody};
use crate::session::Actor;
use crate::AppState;

/// `POST /api/moves`
pub async fn apply_move(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CommandBody(command): CommandBody<MoveCommand>,
) -> ApiResult {
    Ok(Json(state.mutator.apply_move(&actor, &command).await?))
}
