use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

use crate::routes::errors::error_page;

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

fn serve_embedded(path: &str) -> Response {
    match Assets::get(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                file.data.to_vec(),
            )
                .into_response()
        }
        None => error_page(StatusCode::NOT_FOUND),
    }
}

/// GET /assets/static/{*path}
pub async fn serve_static(Path(path): Path<String>) -> Response {
    serve_embedded(&format!("static/{}", path))
}

/// GET /assets/images/{*path}
pub async fn serve_image(Path(path): Path<String>) -> Response {
    serve_embedded(&format!("images/{}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_is_embedded() {
        let response = serve_embedded("static/style.css");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css"
        );
    }

    #[test]
    fn missing_asset_is_404() {
        assert_eq!(
            serve_embedded("static/nope.js").status(),
            StatusCode::NOT_FOUND
        );
    }
}
