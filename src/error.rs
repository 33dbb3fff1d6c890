use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("OAuth provider error: {0}")]
    Upstream(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::NotFound => Redirect::to("/404").into_response(),
            AppError::Unauthorized => Redirect::to("/auth").into_response(),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()).into_response(),
            AppError::Upstream(_) | AppError::Http(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    "Authentication provider error".to_string(),
                )
                    .into_response()
            }
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Io(_)
            | AppError::Password(_)
            | AppError::Internal(_) => {
                tracing::error!("{}", self);
                Redirect::to("/500").into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
