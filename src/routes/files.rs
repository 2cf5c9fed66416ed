//! Static content: the embedded stylesheet and uploaded media.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

fn file_response(name: &str, body: Vec<u8>, cache_control: &'static str) -> Response {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        body,
    )
        .into_response()
}

pub async fn asset(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(file) => file_response(&path, file.data.to_vec(), "public, max-age=86400"),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Uploaded pictures and videos. References that are not plain file names
/// are rejected by the store as not found.
pub async fn upload(State(state): State<AppState>, Path(name): Path<String>) -> AppResult<Response> {
    Ok(match state.media.read(&name)? {
        Some(bytes) => file_response(&name, bytes, "public, max-age=3600"),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}
