use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::oauth::{
    self, authorize_url, bridge_identity, clear_state_cookie, generate_state, state_cookie,
    OAuthProvider, STATE_COOKIE,
};
use crate::auth::session::{clear_session_cookie, cookie_value, session_cookie};
use crate::auth::validation::{login_within_bounds, validate_registration};
use crate::config::Config;
use crate::db::users::{email_exists, find_user_by_username, insert_user, username_exists};
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;

const INVALID_LOGIN: &str = "Invalid username or password";

// -- Templates --

#[derive(Template)]
#[template(path = "pages/auth.html")]
pub struct AuthTemplate {
    pub error: Option<String>,
    pub google_enabled: bool,
    pub github_enabled: bool,
}

impl AuthTemplate {
    fn new(config: &Config, error: Option<String>) -> Self {
        Self {
            error,
            google_enabled: config.oauth.google.is_enabled(),
            github_enabled: config.oauth.github.is_enabled(),
        }
    }
}

/// The auth page again, with an inline message and a 400 status.
fn rejected(config: &Config, message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(AuthTemplate::new(config, Some(message.into()))),
    )
        .into_response()
}

fn signed_in(state: &AppState, user_id: i64) -> AppResult<String> {
    let token = state.sessions.issue(user_id)?;
    Ok(session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.sessions.hours(),
    ))
}

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub secondpass: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

// -- Local accounts --

/// GET /auth - signed-in users are sent back to the feed.
pub async fn auth_page(State(state): State<AppState>, maybe_user: MaybeUser) -> Response {
    if maybe_user.0.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(AuthTemplate::new(&state.config, None)).into_response()
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let username = form.username.trim();
    let email = form.email.trim();

    if let Err(message) = validate_registration(username, email, &form.password, &form.secondpass)
    {
        return Ok(rejected(&state.config, message));
    }

    let conn = state.db.get()?;
    if username_exists(&conn, username)? {
        return Ok(rejected(&state.config, "Username already taken"));
    }
    if email_exists(&conn, email)? {
        return Ok(rejected(&state.config, "Email already taken"));
    }

    let hash = bcrypt::hash(&form.password, bcrypt::DEFAULT_COST)?;
    insert_user(&conn, email, username, Some(&hash))?;
    tracing::info!("Registered user {}", username);

    Ok(Redirect::to("/auth").into_response())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = form.username.trim();
    if !login_within_bounds(username, &form.password) {
        return Ok(rejected(&state.config, INVALID_LOGIN));
    }

    let user = {
        let conn = state.db.get()?;
        find_user_by_username(&conn, username)?
    };
    let Some(user) = user else {
        return Ok(rejected(&state.config, INVALID_LOGIN));
    };
    // Accounts created through OAuth have no local password.
    let Some(hash) = user.password_hash.as_deref() else {
        return Ok(rejected(&state.config, INVALID_LOGIN));
    };
    if !bcrypt::verify(&form.password, hash)? {
        tracing::warn!("Failed login for {}", username);
        return Ok(rejected(&state.config, INVALID_LOGIN));
    }

    let cookie = signed_in(&state, user.id)?;
    tracing::info!("User {} logged in", user.username);

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    let Some(token) = cookie_value(&headers, cookie_name) else {
        return Ok(Redirect::to("/auth").into_response());
    };

    state.sessions.revoke(token)?;

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(cookie_name))],
        Redirect::to("/auth"),
    )
        .into_response())
}

// -- OAuth --

async fn oauth_login(state: &AppState, provider: OAuthProvider) -> AppResult<Response> {
    let credentials = provider.credentials(&state.config);
    if !credentials.is_enabled() {
        return Err(AppError::NotFound);
    }

    let nonce = generate_state();
    let url = authorize_url(provider, credentials, &nonce)?;
    state.oauth_states.lock().await.insert(nonce.clone(), provider);

    Ok((
        [(header::SET_COOKIE, state_cookie(&nonce))],
        Redirect::temporary(&url),
    )
        .into_response())
}

async fn oauth_callback(
    state: &AppState,
    provider: OAuthProvider,
    headers: &HeaderMap,
    query: CallbackQuery,
) -> AppResult<Response> {
    let returned = query.state.as_deref().unwrap_or_default();
    let state_matches = match cookie_value(headers, STATE_COOKIE) {
        Some(expected) if !returned.is_empty() && expected == returned => {
            state.oauth_states.lock().await.take(returned, provider)
        }
        _ => false,
    };
    if !state_matches {
        tracing::warn!("Rejected {} callback with invalid state", provider.as_str());
        return Err(AppError::BadRequest("Invalid OAuth state".into()));
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Ok(Redirect::to("/auth").into_response());
    };

    let credentials = provider.credentials(&state.config);
    let access_token = oauth::exchange_code(&state.http, provider, credentials, &code).await?;
    let identity = oauth::fetch_identity(&state.http, provider, &access_token).await?;

    let user_id = {
        let conn = state.db.get()?;
        bridge_identity(&conn, &identity)?
    };
    let cookie = signed_in(state, user_id)?;
    tracing::info!("{} sign-in for {}", provider.as_str(), identity.email);

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, cookie),
            (header::SET_COOKIE, clear_state_cookie()),
        ]),
        Redirect::to("/"),
    )
        .into_response())
}

/// GET /auth/google
pub async fn google_login(State(state): State<AppState>) -> AppResult<Response> {
    oauth_login(&state, OAuthProvider::Google).await
}

/// GET /auth/callback
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Response> {
    oauth_callback(&state, OAuthProvider::Google, &headers, query).await
}

/// GET /auth/github
pub async fn github_login(State(state): State<AppState>) -> AppResult<Response> {
    oauth_login(&state, OAuthProvider::GitHub).await
}

/// GET /auth/github/callback
pub async fn github_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Response> {
    oauth_callback(&state, OAuthProvider::GitHub, &headers, query).await
}
