//! Commands Layer
//!
//! HTTP handlers that bridge the browser to the mutator and repositories.
//! Every command answers `{ message, ok }`; the status code follows the
//! error kind.

mod asset_cmd;
mod board_cmd;
mod card_cmd;
mod invitation_cmd;
mod list_cmd;
mod move_cmd;

pub use asset_cmd::*;
pub use board_cmd::*;
pub use card_cmd::*;
pub use invitation_cmd::*;
pub use list_cmd::*;
pub use move_cmd::*;

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kanban_core::CommandResponse;
use serde::de::DeserializeOwned;

use crate::domain::DomainError;

/// A domain error on its way to the client
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotAuthorized => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(CommandResponse::failure(&self.0))).into_response()
    }
}

pub type ApiResult<T = CommandResponse> = Result<Json<T>, ApiError>;

/// JSON command body; anything unreadable is a plain validation failure
pub struct CommandBody<T>(pub T);

impl<S, T> FromRequest<S> for CommandBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(CommandBody(value)),
            Err(rejection) => {
                tracing::warn!("malformed command body: {}", rejection);
                Err(ApiError(DomainError::validation(DomainError::GENERIC_MESSAGE)))
            }
        }
    }
}
