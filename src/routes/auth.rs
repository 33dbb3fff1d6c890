use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(handlers::auth_page))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/auth/google", get(handlers::google_login))
        .route("/auth/callback", get(handlers::google_callback))
        .route("/auth/github", get(handlers::github_login))
        .route("/auth/github/callback", get(handlers::github_callback))
}
