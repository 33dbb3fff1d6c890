pub mod assets;
pub mod auth;
pub mod errors;
pub mod home;
pub mod posts;
pub mod profile;
pub mod votes;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The whole application: pages, form handlers, assets and error fallbacks.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.config.uploads_path());
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(home::index))
        .route("/assets/static/{*path}", get(assets::serve_static))
        .route("/assets/images/{*path}", get(assets::serve_image))
        .nest_service(posts::UPLOADS_URL_PREFIX, uploads)
        .merge(auth::router())
        .merge(posts::router())
        .merge(votes::router())
        .merge(profile::router())
        .merge(errors::router())
        .method_not_allowed_fallback(errors::method_not_allowed)
        .fallback(errors::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
