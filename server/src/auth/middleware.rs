//! Bearer token extraction.
//!
//! The session credential is opaque: any non-empty bearer token is
//! accepted. Requests without one are let through only when no
//! `AUTH_SECRET` is configured.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::AppState;

/// Authenticated caller extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The bearer token, or `anonymous`
    pub token: String,
}

impl AuthUser {
    pub fn is_anonymous(&self) -> bool {
        self.token == ANONYMOUS
    }
}

const ANONYMOUS: &str = "anonymous";

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        authenticate(auth_header, state.config.auth_secret.is_some())
    }
}

fn authenticate(
    header: Option<&str>,
    auth_required: bool,
) -> Result<AuthUser, (StatusCode, &'static str)> {
    match header {
        Some(header) => {
            let token = header
                .strip_prefix("Bearer ")
                .ok_or((StatusCode::UNAUTHORIZED, "Invalid authorization header format"))?
                .trim();

            if token.is_empty() {
                return Err((StatusCode::UNAUTHORIZED, "Empty bearer token"));
            }

            Ok(AuthUser {
                token: token.to_string(),
            })
        }
        None if auth_required => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
        None => Ok(AuthUser {
            token: ANONYMOUS.to_string(),
        }),
    }
}
