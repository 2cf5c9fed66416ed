use askama::Template;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::handlers::{begin_session, see_other_with_cookie};
use crate::auth::session::{self, ConsultantIdentity};
use crate::error::{AppError, AppResult};
use crate::extractors::Identity;
use crate::routes::forms::MultipartForm;
use crate::routes::home::Html;
use crate::routes::views::{ConsultantView, PostView};
use crate::social::{self, ConsultantDetails, PostDraft};
use crate::state::AppState;

const REGISTER_PATH: &str = "/consultant-register";
const DASHBOARD_PATH: &str = "/consultant_post";

#[derive(Template)]
#[template(path = "pages/consultant_register.html")]
pub struct ConsultantRegisterTemplate {
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/consultant_post.html")]
pub struct ConsultantDashboardTemplate {
    pub consultant: ConsultantView,
    pub posts: Vec<PostView>,
}

#[derive(Deserialize)]
pub struct DeletePostForm {
    pub post_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(REGISTER_PATH, get(register_page).post(register_submit))
        .route("/consultant_register", get(register_page).post(register_submit))
        .route(DASHBOARD_PATH, get(dashboard).post(create_post))
        .route("/edit_post", post(edit_post))
        .route("/delete_post", post(delete_post))
}

/// Consultant-scoped handlers answer `Unauthorized` by sending the caller
/// to registration.
fn or_register(result: AppResult<Response>) -> AppResult<Response> {
    match result {
        Err(AppError::Unauthorized) => Ok(Redirect::to(REGISTER_PATH).into_response()),
        other => other,
    }
}

fn parse_post_id(form: &MultipartForm) -> AppResult<i64> {
    form.require("post_id")?
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("post_id must be a number".into()))
}

// -- Registration --

pub async fn register_page() -> Html<ConsultantRegisterTemplate> {
    Html(ConsultantRegisterTemplate { message: None })
}

pub async fn register_submit(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let details = ConsultantDetails {
        name: form.text("name").unwrap_or_default().to_string(),
        email: form.text("email").unwrap_or_default().to_string(),
        specialization: form.text("specialization").unwrap_or_default().to_string(),
        bio: form.text("bio").map(String::from),
    };
    let picture = form.take_file("media");

    let conn = state.db.get()?;
    let consultant =
        match social::consultants::register_consultant(&conn, &state.media, &details, picture.as_ref()) {
            Ok(consultant) => consultant,
            Err(AppError::BadRequest(msg)) => {
                return Ok(Html(ConsultantRegisterTemplate {
                    message: Some(format!("Error: {}", msg)),
                })
                .into_response());
            }
            Err(e) => return Err(e),
        };

    let (token, cookie) = begin_session(&state, &conn, &identity)?;
    session::set_consultant(
        &conn,
        &token,
        &ConsultantIdentity {
            id: consultant.id,
            email: consultant.email.clone(),
        },
    )?;

    Ok(see_other_with_cookie(DASHBOARD_PATH, cookie))
}

// -- Dashboard --

pub async fn dashboard(State(state): State<AppState>, identity: Identity) -> AppResult<Response> {
    let Some(signed_in) = identity.context.consultant else {
        return Ok(Redirect::to(REGISTER_PATH).into_response());
    };

    let conn = state.db.get()?;
    let Some(consultant) = social::consultants::find_consultant(&conn, signed_in.id)? else {
        return Ok(Redirect::to(REGISTER_PATH).into_response());
    };
    let posts = social::consultants::consultant_posts(&conn, consultant.id)?;

    Ok(Html(ConsultantDashboardTemplate {
        consultant: ConsultantView::from(&consultant),
        posts: posts.iter().map(PostView::from).collect(),
    })
    .into_response())
}

// -- Post management --

pub async fn create_post(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let draft = PostDraft {
        content: form.require("content")?.to_string(),
        media: form.take_file("media"),
    };

    let conn = state.db.get()?;
    or_register(
        social::posts::create_post(&conn, &state.media, &identity.context, draft)
            .map(|_| Redirect::to(DASHBOARD_PATH).into_response()),
    )
}

pub async fn edit_post(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let post_id = parse_post_id(&form)?;
    let draft = PostDraft {
        content: form.require("new_bio")?.to_string(),
        media: form.take_file("new_media"),
    };

    let conn = state.db.get()?;
    or_register(
        social::posts::edit_post(&conn, &state.media, &identity.context, post_id, draft)
            .map(|_| Redirect::to(DASHBOARD_PATH).into_response()),
    )
}

pub async fn delete_post(
    State(state): State<AppState>,
    identity: Identity,
    Form(form): Form<DeletePostForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    or_register(
        social::posts::delete_post(&conn, &state.media, &identity.context, form.post_id)
            .map(|_| Redirect::to(DASHBOARD_PATH).into_response()),
    )
}
