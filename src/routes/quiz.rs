use askama::Template;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::ai::ImagePayload;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Identity};
use crate::media;
use crate::quiz::{self, QuizAnswers};
use crate::routes::forms::MultipartForm;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/health_quiz.html")]
pub struct HealthQuizTemplate {
    pub email: Option<String>,
    pub result: Option<QuizResult>,
}

/// What the member submitted, echoed back with the AI's answer.
pub struct QuizResult {
    pub answers: QuizAnswers,
    pub image_url: Option<String>,
    pub recommendations: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health_quiz", get(quiz_page).post(submit_quiz))
        .route("/upload_and_query", post(upload_and_query))
}

pub async fn quiz_page(identity: Identity) -> Html<HealthQuizTemplate> {
    Html(HealthQuizTemplate {
        email: identity.context.user.map(|u| u.email),
        result: None,
    })
}

pub async fn submit_quiz(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<Html<HealthQuizTemplate>> {
    let mut form = MultipartForm::read(multipart).await?;
    let answers = QuizAnswers::new(
        form.require("question_1")?,
        form.require("question_2")?,
        form.text("question_3"),
    );
    let image = form.take_file("image");

    let image_path = match &image {
        Some(upload) => Some(state.media.store_upload(upload)?),
        None => None,
    };

    {
        let conn = state.db.get()?;
        if let Err(e) = quiz::save_quiz(&conn, user.id, &answers, image_path.as_deref()) {
            if let Some(reference) = &image_path {
                state.media.release(reference);
            }
            return Err(e);
        }
    }

    let payload = image.map(|upload| ImagePayload {
        mime_type: upload.mime_type(),
        data: upload.data.to_vec(),
    });
    let recommendations = quiz::recommend(state.ai.as_ref(), &answers, payload).await;

    Ok(Html(HealthQuizTemplate {
        email: Some(user.email),
        result: Some(QuizResult {
            answers,
            image_url: image_path.as_deref().map(media::url_for),
            recommendations,
        }),
    }))
}

/// Free-form question about an image. The image is only kept for the
/// duration of the call.
pub async fn upload_and_query(State(state): State<AppState>, multipart: Multipart) -> Response {
    match query_image(&state, multipart).await {
        Ok(text) => Json(json!({
            "response": text,
            "model": state.ai.model(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("upload_and_query failed: {}", e);
            let detail = match e {
                AppError::Ai(inner) => inner.to_string(),
                other => other.to_string(),
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": format!("Error: {}", detail) })),
            )
                .into_response()
        }
    }
}

async fn query_image(state: &AppState, multipart: Multipart) -> AppResult<String> {
    let mut form = MultipartForm::read(multipart).await?;
    let prompt = form.require("query")?.to_string();
    let image = form
        .take_file("image")
        .ok_or_else(|| AppError::BadRequest("Missing field 'image'".into()))?;

    let reference = state.media.store_upload(&image)?;
    let payload = ImagePayload {
        mime_type: image.mime_type(),
        data: image.data.to_vec(),
    };
    let answer = state.ai.generate(&prompt, Some(payload)).await;
    state.media.release(&reference);

    Ok(answer?)
}
