use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::session::{self, IdentityContext, UserIdentity};
use crate::error::AppError;
use crate::state::AppState;

/// The caller's identity for this request, resolved once from the session
/// cookie. Never rejects: unknown or expired sessions are anonymous.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Token of a live session, if the caller has one.
    pub token: Option<String>,
    pub context: IdentityContext,
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = cookie_value(&parts.headers, &state.config.auth.cookie_name) else {
            return Ok(Identity::default());
        };

        let conn = state.db.get()?;
        Ok(match session::resolve(&conn, token)? {
            Some(context) => Identity {
                token: Some(token.to_string()),
                context,
            },
            None => Identity::default(),
        })
    }
}

/// Signed-in member. Anonymous callers are sent to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserIdentity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        identity
            .context
            .user
            .map(CurrentUser)
            .ok_or_else(|| Redirect::to("/login").into_response())
    }
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
