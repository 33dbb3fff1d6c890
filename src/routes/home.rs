use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::auth::session::cookie_value;
use crate::db::categories::list_categories;
use crate::db::feed::{fetch_category_feeds, fetch_posts, fetch_user_profile_by_session_token};
use crate::db::models::{Category, CategoryFeed, Post, UserProfile};
use crate::db::users::PROFILE_COLORS;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub profile: UserProfile,
    pub posts: Vec<Post>,
    pub category_feeds: Vec<CategoryFeed>,
    pub categories: Vec<Category>,
    pub colors: &'static [&'static str],
    pub signed_in: bool,
}

#[derive(Template)]
#[template(path = "pages/guest_home.html")]
pub struct GuestHomeTemplate {
    pub posts: Vec<Post>,
    pub category_feeds: Vec<CategoryFeed>,
    pub signed_in: bool,
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

/// GET / - the full feed, personalised when the session cookie is live.
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let conn = state.db.get()?;
    let posts = fetch_posts(&conn)?;
    let category_feeds = fetch_category_feeds(&conn)?;

    let token = cookie_value(&headers, &state.config.auth.cookie_name).unwrap_or_default();
    let profile = fetch_user_profile_by_session_token(&state.sessions, &conn, token)?;

    Ok(match profile {
        Some(profile) => Html(HomeTemplate {
            profile,
            posts,
            category_feeds,
            categories: list_categories(&conn)?,
            colors: PROFILE_COLORS,
            signed_in: true,
        })
        .into_response(),
        None => Html(GuestHomeTemplate {
            posts,
            category_feeds,
            signed_in: false,
        })
        .into_response(),
    })
}
