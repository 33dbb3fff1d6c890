//! Google and GitHub sign-in.
//!
//! The login route stores a random state nonce both in an `OAuthStateStore`
//! and in a short-lived cookie. The callback must present the same value in
//! its query string, and the nonce is consumed on first use.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::header;
use rusqlite::Connection;
use serde::Deserialize;
use url::Url;

use crate::config::{Config, ProviderConfig};
use crate::db::users::{find_user_by_email, insert_user, unique_username};
use crate::error::{AppError, AppResult};

pub const STATE_COOKIE: &str = "oauth_state";
const STATE_TTL: Duration = Duration::from_secs(300);
const GITHUB_EMAILS_URL: &str = "https://api.github.com/user/emails";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    GitHub,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::GitHub => "github",
        }
    }

    fn authorize_endpoint(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/auth",
            OAuthProvider::GitHub => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_endpoint(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::GitHub => "https://github.com/login/oauth/access_token",
        }
    }

    fn userinfo_endpoint(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://www.googleapis.com/oauth2/v2/userinfo",
            OAuthProvider::GitHub => "https://api.github.com/user",
        }
    }

    fn scope(self) -> &'static str {
        match self {
            OAuthProvider::Google => "email profile",
            OAuthProvider::GitHub => "user:email",
        }
    }

    pub fn credentials(self, config: &Config) -> &ProviderConfig {
        match self {
            OAuthProvider::Google => &config.oauth.google,
            OAuthProvider::GitHub => &config.oauth.github,
        }
    }
}

/// Pending sign-in attempts keyed by state nonce.
pub struct OAuthStateStore {
    pending: HashMap<String, (Instant, OAuthProvider)>,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    pub fn insert(&mut self, state: String, provider: OAuthProvider) {
        self.clear_stale();
        self.pending.insert(state, (Instant::now(), provider));
    }

    /// Consume `state`. True only if it was issued for `provider` and has not
    /// timed out.
    pub fn take(&mut self, state: &str, provider: OAuthProvider) -> bool {
        match self.pending.remove(state) {
            Some((issued, p)) => p == provider && issued.elapsed() < STATE_TTL,
            None => false,
        }
    }

    fn clear_stale(&mut self) {
        self.pending.retain(|_, (t, _)| t.elapsed() < STATE_TTL);
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Random 32-byte hex nonce.
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn state_cookie(state: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        STATE_COOKIE,
        state,
        STATE_TTL.as_secs()
    )
}

pub fn clear_state_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", STATE_COOKIE)
}

pub fn authorize_url(
    provider: OAuthProvider,
    credentials: &ProviderConfig,
    state: &str,
) -> AppResult<String> {
    let url = Url::parse_with_params(
        provider.authorize_endpoint(),
        &[
            ("client_id", credentials.client_id.as_str()),
            ("redirect_uri", credentials.redirect_url.as_str()),
            ("scope", provider.scope()),
            ("state", state),
            ("response_type", "code"),
        ],
    )
    .map_err(|e| AppError::Internal(format!("bad authorize url: {}", e)))?;
    Ok(url.into())
}

/// Who the provider says the user is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub email: String,
    pub display_name: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct GoogleUser {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

pub async fn exchange_code(
    http: &reqwest::Client,
    provider: OAuthProvider,
    credentials: &ProviderConfig,
    code: &str,
) -> AppResult<String> {
    let response = http
        .post(provider.token_endpoint())
        .header(header::ACCEPT, "application/json")
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", credentials.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "{} token exchange returned {}",
            provider.as_str(),
            response.status()
        )));
    }

    let token: TokenResponse = response.json().await?;
    match (token.access_token, token.error) {
        (Some(access_token), _) if !access_token.is_empty() => Ok(access_token),
        (_, Some(error)) => Err(AppError::Upstream(format!(
            "{} token exchange failed: {}",
            provider.as_str(),
            error
        ))),
        _ => Err(AppError::Upstream(format!(
            "{} token response had no access token",
            provider.as_str()
        ))),
    }
}

pub async fn fetch_identity(
    http: &reqwest::Client,
    provider: OAuthProvider,
    access_token: &str,
) -> AppResult<OAuthIdentity> {
    match provider {
        OAuthProvider::Google => {
            let user: GoogleUser = get_json(http, provider.userinfo_endpoint(), access_token).await?;
            let email = user
                .email
                .filter(|e| !e.is_empty())
                .ok_or_else(|| AppError::Upstream("google account has no email".into()))?;
            let display_name = user
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email_local_part(&email));
            Ok(OAuthIdentity {
                email,
                display_name,
            })
        }
        OAuthProvider::GitHub => {
            let user: GitHubUser = get_json(http, provider.userinfo_endpoint(), access_token).await?;
            let email = match user.email.filter(|e| !e.is_empty()) {
                Some(email) => email,
                None => {
                    let emails: Vec<GitHubEmail> =
                        get_json(http, GITHUB_EMAILS_URL, access_token).await?;
                    primary_verified_email(emails).ok_or_else(|| {
                        AppError::Upstream("github account has no verified primary email".into())
                    })?
                }
            };
            Ok(OAuthIdentity {
                email,
                display_name: user.login,
            })
        }
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    access_token: &str,
) -> AppResult<T> {
    let response = http
        .get(url)
        .bearer_auth(access_token)
        .header(header::ACCEPT, "application/json")
        .header(header::USER_AGENT, concat!("forum/", env!("CARGO_PKG_VERSION")))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "GET {} returned {}",
            url,
            response.status()
        )));
    }
    Ok(response.json().await?)
}

fn primary_verified_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Map a provider identity onto a local account, creating one on first
/// sign-in. Returns the user id.
pub fn bridge_identity(conn: &Connection, identity: &OAuthIdentity) -> AppResult<i64> {
    if let Some(user) = find_user_by_email(conn, &identity.email)? {
        return Ok(user.id);
    }

    let username = unique_username(conn, &identity.display_name)?;
    let user_id = insert_user(conn, &identity.email, &username, None)?;
    tracing::info!("Created account {} from OAuth sign-in", username);
    Ok(user_id)
}
