use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::credentials;
use crate::auth::session::{self, UserIdentity};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::Identity;
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub message: Option<String>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

// -- Cookie helpers --

pub(crate) fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// Reuse the caller's live session or start one. Returns the token and the
/// `Set-Cookie` value that keeps the browser on it.
pub(crate) fn begin_session(
    state: &AppState,
    conn: &Connection,
    identity: &Identity,
) -> AppResult<(String, String)> {
    let hours = state.config.auth.session_hours;
    let token = session::open_session(conn, identity.token.as_deref(), hours)?;
    let cookie = session_cookie(&state.config.auth.cookie_name, &token, hours);
    Ok((token, cookie))
}

/// 303 to `location`, setting `cookie` on the way.
pub(crate) fn see_other_with_cookie(location: &str, cookie: String) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, cookie),
        ],
        "",
    )
        .into_response()
}

/// bcrypt is deliberately slow; keep it off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

// -- Login --

pub async fn login_page() -> Html<LoginTemplate> {
    Html(LoginTemplate { error: None })
}

pub async fn login_submit(
    State(state): State<AppState>,
    identity: Identity,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    let pool = state.db.clone();
    let user: Option<User> = blocking(move || {
        let conn = pool.get()?;
        credentials::authenticate(&conn, &form.email, &form.password)
    })
    .await?;

    let Some(user) = user else {
        return Ok(Html(LoginTemplate {
            error: Some("Incorrect email or password.".to_string()),
        })
        .into_response());
    };

    let conn = state.db.get()?;
    let (token, cookie) = begin_session(&state, &conn, &identity)?;
    session::set_user(
        &conn,
        &token,
        &UserIdentity {
            id: user.id,
            email: user.email.clone(),
        },
    )?;
    tracing::info!("User {} logged in", user.id);

    Ok(see_other_with_cookie("/home", cookie))
}

// -- Signup --

pub async fn signup_page() -> Html<SignupTemplate> {
    Html(SignupTemplate { error: None })
}

pub async fn signup_submit(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    let pool = state.db.clone();
    let cost = state.config.auth.bcrypt_cost;
    let registered = blocking(move || {
        let conn = pool.get()?;
        credentials::register(&conn, &form.email, &form.password, cost)
    })
    .await;

    match registered {
        Ok(_) => Ok((StatusCode::SEE_OTHER, [(header::LOCATION, "/login")]).into_response()),
        Err(e @ (AppError::DuplicateEmail | AppError::BadRequest(_))) => {
            let error = match e {
                AppError::BadRequest(msg) => msg,
                other => other.to_string(),
            };
            Ok(Html(SignupTemplate { error: Some(error) }).into_response())
        }
        Err(e) => Err(e),
    }
}

// -- Logout --

pub async fn logout(State(state): State<AppState>, identity: Identity) -> AppResult<Response> {
    if let Some(token) = identity.token.as_deref() {
        let conn = state.db.get()?;
        if let Err(e) = session::delete_session(&conn, token) {
            tracing::warn!("Failed to delete session on logout: {}", e);
        }
    }

    Ok(see_other_with_cookie(
        "/login",
        clear_session_cookie(&state.config.auth.cookie_name),
    ))
}

// -- Forgot password --

pub async fn forgot_password_page() -> Html<ForgotPasswordTemplate> {
    Html(ForgotPasswordTemplate { message: None })
}

/// Reports whether a reset link "was sent". Nothing is delivered.
pub async fn forgot_password_submit(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> AppResult<Html<ForgotPasswordTemplate>> {
    let conn = state.db.get()?;
    let message = match credentials::find_user_by_email(&conn, &form.email)? {
        Some(_) => "A password reset link has been sent to your email!",
        None => "Email not found! Please try again.",
    };

    Ok(Html(ForgotPasswordTemplate {
        message: Some(message.to_string()),
    }))
}
