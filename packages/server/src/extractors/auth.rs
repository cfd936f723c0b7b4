use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::EntityTrait;
use serde::Serialize;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::{jwt, redirect};

/// Cookie holding the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated user, taken from the `session` cookie or an
/// `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require login. Anonymous requests are
/// redirected to the login page with the current path as `next`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
}

/// Decode the session carried by a request, if any. Does not touch the
/// database.
pub fn session_user(headers: &HeaderMap, secret: &str) -> Option<AuthUser> {
    let bearer = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);
    let token = bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
    })?;

    let claims = jwt::verify(&token, secret).ok()?;
    Some(AuthUser {
        user_id: claims.uid,
        username: claims.sub,
    })
}

/// Rejection for [`AuthUser`].
pub enum AuthRejection {
    /// Not logged in: send the user to the login page.
    Login { next: String },
    Error(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Login { next } => redirect::found(&redirect::login_url(&next)),
            AuthRejection::Error(e) => e.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());

        let session = session_user(&parts.headers, &state.config.auth.jwt_secret)
            .ok_or_else(|| AuthRejection::Login { next: next.clone() })?;

        // The account may have been deleted after the token was issued.
        let exists = user::Entity::find_by_id(session.user_id)
            .one(&state.db)
            .await
            .map_err(|e| AuthRejection::Error(e.into()))?
            .is_some();
        if !exists {
            tracing::debug!(user_id = session.user_id, "Session refers to a missing user");
            return Err(AuthRejection::Login { next });
        }

        Ok(session)
    }
}
