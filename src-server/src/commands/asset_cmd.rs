//! Attachment blobs

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use super::ApiError;
use crate::domain::DomainError;
use crate::repository::CardDetailOperations;
use crate::session::Actor;
use crate::storage::BlobError;
use crate::AppState;

/// `GET /assets/{*key}`: readable to anyone who can read the owning board
pub async fn get_asset(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let board_id = state
        .repos
        .cards
        .blob_board(&key)
        .await?
        .ok_or_else(|| DomainError::not_found("Attachment not found"))?;
    if !state.repos.boards.can_read(&board_id, &actor.id).await? {
        return Err(DomainError::NotAuthorized.into());
    }

    let bytes = match state.blobs.get(&key).await {
        Ok(bytes) => bytes,
        Err(BlobError::NotFound(_)) => {
            return Err(DomainError::not_found("Attachment not found").into())
        }
        Err(e) => {
            tracing::error!("failed to read blob {}: {}", key, e);
            return Err(DomainError::store(e.to_string()).into());
        }
    };

    let mime = mime_guess::from_path(&key).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.to_string())],
        bytes,
    )
        .into_response())
}
