use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "forum", about = "A small server-rendered forum")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub oauth: OAuthConfig,
    pub tls: TlsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
    pub max_upload_mb: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub purge_interval_minutes: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct OAuthConfig {
    pub google: ProviderConfig,
    pub github: ProviderConfig,
}

/// Client credentials for one OAuth provider. An empty `client_id` disables it.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_upload_mb: 20,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_token".to_string(),
            session_hours: 1,
            purge_interval_minutes: 15,
        }
    }
}

impl ProviderConfig {
    pub fn is_enabled(&self) -> bool {
        !self.client_id.is_empty()
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.resolve_paths(&data_dir);

        Ok(config)
    }

    /// Provider secrets are kept out of the config file when supplied
    /// through the environment.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides = [
            ("FORUM_GOOGLE_CLIENT_ID", &mut self.oauth.google.client_id),
            ("FORUM_GOOGLE_CLIENT_SECRET", &mut self.oauth.google.client_secret),
            ("FORUM_GITHUB_CLIENT_ID", &mut self.oauth.github.client_id),
            ("FORUM_GITHUB_CLIENT_SECRET", &mut self.oauth.github.client_secret),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }

    /// Fill every unset path from the data directory.
    pub fn resolve_paths(&mut self, data_dir: &std::path::Path) {
        if self.database.path.is_none() {
            self.database.path = Some(data_dir.join("forum.db"));
        }
        if self.storage.path.is_none() {
            self.storage.path = Some(data_dir.join("uploads"));
        }
        if self.tls.cert_path.is_none() {
            self.tls.cert_path = Some(data_dir.join("tls").join("cert.pem"));
        }
        if self.tls.key_path.is_none() {
            self.tls.key_path = Some(data_dir.join("tls").join("key.pem"));
        }

        let scheme = if self.tls.enabled { "https" } else { "http" };
        let base = format!("{}://localhost:{}", scheme, self.server.port);
        if self.oauth.google.redirect_url.is_empty() {
            self.oauth.google.redirect_url = format!("{}/auth/callback", base);
        }
        if self.oauth.github.redirect_url.is_empty() {
            self.oauth.github.redirect_url = format!("{}/auth/github/callback", base);
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".forum")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("forum.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.storage.max_upload_mb * 1024 * 1024
    }

    /// Certificate and key locations used when `[tls].enabled` is set.
    pub fn tls_paths(&self) -> (PathBuf, PathBuf) {
        let cert = self
            .tls
            .cert_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("tls/cert.pem"));
        let key = self
            .tls
            .key_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("tls/key.pem"));
        (cert, key)
    }
}
