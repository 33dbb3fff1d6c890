use askama::Template;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "errors/error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: &'static str,
    pub message: &'static str,
}

pub fn error_page(status: StatusCode) -> Response {
    let (title, message) = match status {
        StatusCode::BAD_REQUEST => ("Bad request", "The request could not be understood."),
        StatusCode::NOT_FOUND => ("Page not found", "There is nothing at this address."),
        StatusCode::METHOD_NOT_ALLOWED => (
            "Method not allowed",
            "This page does not accept that kind of request.",
        ),
        _ => ("Something went wrong", "Please try again in a moment."),
    };
    let page = ErrorTemplate {
        status: status.as_u16(),
        title,
        message,
    };
    (status, Html(page)).into_response()
}

pub async fn bad_request() -> Response {
    error_page(StatusCode::BAD_REQUEST)
}

pub async fn not_found() -> Response {
    error_page(StatusCode::NOT_FOUND)
}

pub async fn method_not_allowed() -> Response {
    error_page(StatusCode::METHOD_NOT_ALLOWED)
}

pub async fn internal_error() -> Response {
    error_page(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/400", get(bad_request))
        .route("/404", get(not_found))
        .route("/405", get(method_not_allowed))
        .route("/500", get(internal_error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_page_keeps_status() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::METHOD_NOT_ALLOWED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert_eq!(error_page(status).status(), status);
        }
    }

    #[test]
    fn error_template_renders_code() {
        let body = ErrorTemplate {
            status: 404,
            title: "Page not found",
            message: "There is nothing at this address.",
        }
        .render()
        .unwrap();
        assert!(body.contains("404"));
        assert!(body.contains("Page not found"));
    }
}
