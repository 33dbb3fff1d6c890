use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::Mutex;

use crate::auth::oauth::OAuthStateStore;
use crate::auth::session::SessionStore;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub sessions: SessionStore,
    pub oauth_states: Arc<Mutex<OAuthStateStore>>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let sessions = SessionStore::new(db.clone(), config.auth.session_hours);
        Self {
            db,
            config,
            sessions,
            oauth_states: Arc::new(Mutex::new(OAuthStateStore::new())),
            http: reqwest::Client::new(),
        }
    }
}
