//! Identity boundary
//!
//! An upstream authenticator sets `x-user-*` headers on every request. The
//! server trusts them and refreshes its copy of the user each time.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::commands::ApiError;
use crate::domain::{DomainError, User};
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The user issuing the current request
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = user_from_headers(&parts.headers).ok_or(DomainError::NotAuthorized)?;
        let user = state.repos.users.upsert(&user).await?;
        Ok(Actor(user))
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn user_from_headers(headers: &HeaderMap) -> Option<User> {
    Some(User {
        id: header(headers, USER_ID_HEADER)?,
        name: header(headers, USER_NAME_HEADER),
        email: header(headers, USER_EMAIL_HEADER),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_user_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(user_from_headers(&headers).is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static(" a@b.c "));
        let user = user_from_headers(&headers).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, None);
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_blank_id_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert!(user_from_headers(&headers).is_none());
    }
}
