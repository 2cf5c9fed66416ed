use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::extractors::Identity;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub email: Option<String>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Send consultants to their dashboard, members home, everyone else to login.
pub async fn index(identity: Identity) -> Redirect {
    let context = identity.context;
    if context.consultant.is_some() {
        Redirect::to("/consultant_post")
    } else if context.user.is_some() {
        Redirect::to("/home")
    } else {
        Redirect::to("/login")
    }
}

pub async fn home_page(identity: Identity) -> Html<HomeTemplate> {
    Html(HomeTemplate {
        email: identity.context.user.map(|u| u.email),
    })
}
