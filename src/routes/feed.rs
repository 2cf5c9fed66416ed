use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::Identity;
use crate::routes::home::Html;
use crate::routes::views::{ConsultantView, FeedItemView, PostView};
use crate::social::{self, FeedQuery};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/consultants.html")]
pub struct FeedTemplate {
    pub items: Vec<FeedItemView>,
    pub q: String,
    pub specialization: String,
    pub signed_in: bool,
}

#[derive(Template)]
#[template(path = "pages/consultant_profile.html")]
pub struct ProfileTemplate {
    pub consultant: ConsultantView,
    pub posts: Vec<PostView>,
    pub follower_count: i64,
    pub signed_in: bool,
}

#[derive(Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment_text: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/consultants", get(feed_page))
        .route("/consultant/{id}", get(profile_page))
        .route("/consultant/{id}/follow", post(follow))
        .route("/post/{id}/like", post(like))
        .route("/post/{id}/comment", post(comment))
}

/// Send the caller back to the page they acted from.
fn redirect_back(headers: &HeaderMap) -> Redirect {
    let target = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("/consultants");
    Redirect::to(target)
}

pub async fn feed_page(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<FeedQuery>,
) -> AppResult<Html<FeedTemplate>> {
    let conn = state.db.get()?;
    let entries = social::feed::list_feed(&conn, &query)?;

    Ok(Html(FeedTemplate {
        items: entries.iter().map(FeedItemView::from).collect(),
        q: query.search.unwrap_or_default(),
        specialization: query.specialization.unwrap_or_default(),
        signed_in: identity.context.user.is_some(),
    }))
}

pub async fn profile_page(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> AppResult<Html<ProfileTemplate>> {
    let conn = state.db.get()?;
    let profile = social::consultants::consultant_profile(&conn, id)?;

    Ok(Html(ProfileTemplate {
        consultant: ConsultantView::from(&profile.consultant),
        posts: profile.posts.iter().map(PostView::from).collect(),
        follower_count: profile.follower_count,
        signed_in: identity.context.user.is_some(),
    }))
}

pub async fn like(
    State(state): State<AppState>,
    identity: Identity,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
) -> AppResult<Redirect> {
    let mut conn = state.db.get()?;
    let liked = social::relations::toggle_like(&mut conn, post_id, identity.context.user_id())?;
    tracing::debug!("Post {} liked={}", post_id, liked.liked);
    Ok(redirect_back(&headers))
}

pub async fn comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<CommentForm>,
) -> AppResult<Redirect> {
    let conn = state.db.get()?;
    social::relations::add_comment(
        &conn,
        post_id,
        identity.context.user_id(),
        &form.comment_text,
    )?;
    Ok(redirect_back(&headers))
}

pub async fn follow(
    State(state): State<AppState>,
    identity: Identity,
    Path(consultant_id): Path<i64>,
    headers: HeaderMap,
) -> AppResult<Redirect> {
    let mut conn = state.db.get()?;
    let following =
        social::relations::toggle_follow(&mut conn, consultant_id, identity.context.user_id())?;
    tracing::debug!("Consultant {} following={}", consultant_id, following.following);
    Ok(redirect_back(&headers))
}
