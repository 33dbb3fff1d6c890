use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::session::{cookie_value, SessionStatus};
use crate::db::users::find_user_by_id;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub profile_color: String,
}

/// Extractor that requires a live session.
/// Missing, unknown or expired sessions are rejected with `Unauthorized`.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        let user_id = match state.sessions.validate_on(&conn, token)? {
            SessionStatus::Valid(user_id) => user_id,
            SessionStatus::Expired => {
                tracing::warn!("Rejected expired session");
                return Err(AppError::Unauthorized);
            }
            SessionStatus::NotFound => return Err(AppError::Unauthorized),
        };

        let user = find_user_by_id(&conn, user_id)?.ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            profile_color: user.profile_color,
        })
    }
}

/// Optional user extractor: `None` instead of a rejection when not signed in.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}
