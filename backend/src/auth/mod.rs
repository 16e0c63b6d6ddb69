use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use uuid::Uuid;

/// Set by the upstream auth proxy once the caller is authenticated.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

pub fn parse_user_id(raw: &str) -> Result<Uuid, (StatusCode, String)> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            format!("{USER_ID_HEADER} must be a UUID"),
        )
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(USER_ID_HEADER).ok_or((
            StatusCode::UNAUTHORIZED,
            format!("Missing {USER_ID_HEADER} header"),
        ))?;

        let raw = header.to_str().map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                format!("Invalid {USER_ID_HEADER} header"),
            )
        })?;

        let user_id = parse_user_id(raw)?;

        Ok(AuthUser { user_id })
    }
}
