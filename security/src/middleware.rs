// security/src/middleware.rs
// Bearer-token extraction for axum handlers.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::debug;
use serde_json::json;

use crate::{AuthError, AuthService, Claims};

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UserExists(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::PasswordHashError(_) | AuthError::JwtError(_) | AuthError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AuthError::Validation(e) => json!({
                "status": "error",
                "error": "Validation failed",
                "details": e.field_errors(),
            }),
            AuthError::PasswordHashError(_) | AuthError::JwtError(_) | AuthError::Storage(_) => {
                log::error!("Authentication failure: {}", self);
                json!({ "status": "error", "error": "Internal server error" })
            }
            _ => json!({ "status": "error", "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Returns the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Claims of a validated bearer token. Rejects with 401 before the handler
/// runs when the header is missing or the token does not verify.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl AuthenticatedUser {
    pub fn claims(&self) -> &Claims {
        &self.0
    }

    pub fn require(&self, auth: &AuthService, permission: &str) -> Result<(), AuthError> {
        auth.authorize(&self.0, permission)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = auth.jwt().validate(token)?;
        debug!("Authenticated {} ({}) for {}", claims.email, claims.role, parts.uri.path());
        Ok(AuthenticatedUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::roles::USERS_MANAGE;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer   abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Forbidden(USERS_MANAGE.to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AuthError::UserExists("a@b.co".into()).status_code(), StatusCode::CONFLICT);
    }
}
