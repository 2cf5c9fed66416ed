pub mod auth;
pub mod consultant;
pub mod feed;
pub mod files;
pub mod forms;
pub mod home;
pub mod quiz;
pub mod views;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::media::PUBLIC_PREFIX;
use crate::state::AppState;

/// The full application: pages, actions and static content.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(home::index))
        .route("/home", get(home::home_page))
        .route("/assets/{*path}", get(files::asset))
        .route(&format!("{}/{{name}}", PUBLIC_PREFIX), get(files::upload))
        .merge(auth::router())
        .merge(consultant::router())
        .merge(feed::router())
        .merge(quiz::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
