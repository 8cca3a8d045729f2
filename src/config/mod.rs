use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

/// Process configuration, read once at startup and passed to whatever needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: String,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; preferred over the discrete fields when set
    pub url: Option<String>,
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    /// `SKIP_DB=1` disables every connection attempt
    pub skip: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Raw `BCRYPT_COST` override; range checking happens in the hasher
    pub bcrypt_cost: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: "8080".to_string(),
            database: DatabaseConfig {
                url: None,
                host: "localhost".to_string(),
                port: "5432".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                name: "mydb".to_string(),
                ssl_mode: "disable".to_string(),
                skip: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: DEFAULT_JWT_EXPIRY_HOURS,
                bcrypt_cost: None,
            },
        }
    }
}

impl Config {
    /// Load `.env` (if present) and then read the process environment.
    /// Variables already set in the environment win over the file.
    pub fn load() -> Self {
        if dotenvy::dotenv().is_err() {
            tracing::info!("No .env file found, using system environment variables");
        }
        Self::from_env()
    }

    /// Like [`Config::load`], but fails when no database credentials are available.
    pub fn must_load() -> Result<Self, ConfigError> {
        Self::load().require_database()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(|key| lookup(key).filter(|v| !v.is_empty()))
    }

    fn with_overrides<F>(mut self, get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("PORT") {
            self.port = v;
        }

        // Database overrides
        self.database.url = get("DATABASE_URL");
        if let Some(v) = get("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = get("DB_PORT") {
            self.database.port = v;
        }
        if let Some(v) = get("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = get("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = get("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = get("DB_SSL_MODE") {
            self.database.ssl_mode = v;
        }
        self.database.skip = get("SKIP_DB").as_deref() == Some("1");

        // Security overrides
        if let Some(v) = get("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = get("JWT_EXPIRY_HOURS") {
            match v.trim().parse::<u64>().ok().filter(|h| ttl_from_hours(*h).is_some()) {
                Some(hours) => self.security.jwt_expiry_hours = hours,
                None => tracing::warn!(
                    "Ignoring invalid JWT_EXPIRY_HOURS '{}', using {}",
                    v,
                    self.security.jwt_expiry_hours
                ),
            }
        }
        self.security.bcrypt_cost = get("BCRYPT_COST").and_then(|v| v.trim().parse().ok());

        self
    }

    /// Fails when neither `DATABASE_URL` nor a database password is configured.
    /// Always passes when the database is skipped.
    pub fn require_database(self) -> Result<Self, ConfigError> {
        if !self.database.skip && self.database.url.is_none() && self.database.password.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL or database credentials"));
        }
        Ok(self)
    }

    /// Token lifetime. Zero or unrepresentable hour counts give the 24h default.
    pub fn jwt_ttl(&self) -> chrono::Duration {
        ttl_from_hours(self.security.jwt_expiry_hours)
            .unwrap_or_else(|| chrono::Duration::hours(DEFAULT_JWT_EXPIRY_HOURS as i64))
    }
}

const DEFAULT_JWT_EXPIRY_HOURS: u64 = 24;

fn ttl_from_hours(hours: u64) -> Option<chrono::Duration> {
    if hours == 0 {
        return None;
    }
    i64::try_from(hours).ok().and_then(chrono::Duration::try_hours)
}
