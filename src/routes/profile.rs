use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::users::{is_valid_profile_color, update_profile_color};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProfileColorForm {
    #[serde(rename = "profileColor", default)]
    pub profile_color: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/profilePicture", post(set_profile_color))
}

/// POST /profilePicture
async fn set_profile_color(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ProfileColorForm>,
) -> AppResult<Response> {
    let color = form.profile_color.trim();
    if !is_valid_profile_color(color) {
        return Err(AppError::BadRequest("Unknown profile color".into()));
    }

    let conn = state.db.get()?;
    update_profile_color(&conn, user.id, color)?;

    Ok(Redirect::to("/").into_response())
}
