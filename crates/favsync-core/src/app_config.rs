use std::net::SocketAddr;
use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Profile whose favourites are synced; also the only identity tokens may claim.
    pub username: String,
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub auth_secret_word: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Origin prefixed to profile and film detail paths, without a trailing slash.
    pub site_origin: String,
    pub image_width: u32,
    pub image_height: u32,
    pub page_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub chrome_path: Option<PathBuf>,
    pub sync_deadline_secs: u64,
    /// Cron expression for the scheduled sync. `None` disables the job.
    pub sync_schedule: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Returns the store connection URI.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }

    /// Returns the token signing secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `FAVSYNC_JWT_SECRET` was not set.
    pub fn require_jwt_secret(&self) -> Result<&str, ConfigError> {
        self.jwt_secret
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("FAVSYNC_JWT_SECRET".to_string()))
    }

    /// Returns the shared secret word required to mint tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `FAVSYNC_AUTH_SECRET_WORD` was not set.
    pub fn require_auth_secret_word(&self) -> Result<&str, ConfigError> {
        self.auth_secret_word
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("FAVSYNC_AUTH_SECRET_WORD".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("username", &self.username)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[redacted]"))
            .field(
                "auth_secret_word",
                &self.auth_secret_word.as_ref().map(|_| "[redacted]"),
            )
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("site_origin", &self.site_origin)
            .field("image_width", &self.image_width)
            .field("image_height", &self.image_height)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("chrome_path", &self.chrome_path)
            .field("sync_deadline_secs", &self.sync_deadline_secs)
            .field("sync_schedule", &self.sync_schedule)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
