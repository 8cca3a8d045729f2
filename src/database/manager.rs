use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::{Config, DatabaseConfig};

/// Errors from connection setup and query helpers
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(sqlx::Error),

    #[error("failed to ping database: {0}")]
    Ping(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Pool size knobs applied to every pool opened here.
///
/// `max_idle` is a floor, not a cap: sqlx has no idle limit, so the pool
/// keeps at least `max_idle` connections open at all times
/// (`min_connections`). Idle connections above that floor are closed after
/// `idle_timeout`.
#[derive(Debug, Clone, Copy)]
pub struct PoolBounds {
    pub max_open: u32,
    pub max_idle: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolBounds {
    fn default() -> Self {
        Self {
            max_open: 25,
            max_idle: 5,
            max_lifetime: Duration::from_secs(5 * 60),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl PoolBounds {
    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_open)
            .min_connections(self.max_idle.min(self.max_open))
            .max_lifetime(self.max_lifetime)
            .idle_timeout(self.idle_timeout)
    }
}

/// Discrete connection fields, for local development or split configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub ssl_mode: String,
}

impl From<&DatabaseConfig> for PostgresConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            db_name: config.name.clone(),
            ssl_mode: config.ssl_mode.clone(),
        }
    }
}

impl PostgresConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, DatabaseError> {
        if self.host.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("host"));
        }
        if self.port.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("port"));
        }
        if self.user.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("user"));
        }
        if self.db_name.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("database name"));
        }

        let port: u16 = self
            .port
            .trim()
            .parse()
            .map_err(|_| DatabaseError::InvalidConfig(format!("invalid port '{}'", self.port)))?;

        let mut options = PgConnectOptions::new()
            .host(self.host.trim())
            .port(port)
            .username(&self.user)
            .database(&self.db_name);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        if !self.ssl_mode.trim().is_empty() {
            let mode = PgSslMode::from_str(self.ssl_mode.trim()).map_err(|_| {
                DatabaseError::InvalidConfig(format!("invalid sslmode '{}'", self.ssl_mode))
            })?;
            options = options.ssl_mode(mode);
        }
        Ok(options)
    }
}

/// Resolve a `postgres://` URL into connect options.
///
/// A `hostaddr` query parameter replaces the URL host (used to pin an IPv4
/// address). Without an explicit `sslmode` the connection requires TLS.
pub fn url_connect_options(database_url: &str) -> Result<PgConnectOptions, DatabaseError> {
    if database_url.trim().is_empty() {
        return Err(DatabaseError::ConfigMissing("database URL"));
    }

    let mut options =
        PgConnectOptions::from_str(database_url).map_err(DatabaseError::InvalidDatabaseUrl)?;

    if let Ok(parsed) = url::Url::parse(database_url) {
        let params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();

        if let Some(addr) = params.get("hostaddr").filter(|a| !a.is_empty()) {
            options = options.host(addr);
        }
        if !params.contains_key("sslmode") && !params.contains_key("ssl-mode") {
            options = options.ssl_mode(PgSslMode::Require);
        }
    }

    Ok(options)
}

/// Open a pool from discrete fields and verify it with a round-trip probe
pub async fn connect_postgres(config: &PostgresConfig) -> Result<PgPool, DatabaseError> {
    let pool = open_pool(config.connect_options()?, PoolBounds::default()).await?;
    info!("PostgreSQL connection established successfully");
    Ok(pool)
}

/// Open a pool from a connection URL (Supabase, Railway, Render, Heroku style)
pub async fn connect_postgres_url(database_url: &str) -> Result<PgPool, DatabaseError> {
    let pool = open_pool(url_connect_options(database_url)?, PoolBounds::default()).await?;
    info!("PostgreSQL connection established successfully (via URL)");
    Ok(pool)
}

/// Open a pool with explicit bounds. Fails if the liveness probe fails.
pub async fn open_pool(options: PgConnectOptions, bounds: PoolBounds) -> Result<PgPool, DatabaseError> {
    let pool = bounds.pool_options().connect_lazy_with(options);
    ping(&pool).await?;
    Ok(pool)
}

/// Pings the pool to ensure connectivity
pub async fn ping(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DatabaseError::Ping)?;
    Ok(())
}

/// Close the pool, waiting for checked-out connections to come back
pub async fn close(pool: PgPool) {
    pool.close().await;
    info!("Database connection closed");
}

fn skip_db_from_env() -> bool {
    std::env::var("SKIP_DB").as_deref() == Ok("1")
}

/// Connect using loaded configuration.
///
/// Returns `Ok(None)` when SKIP_DB is set. `DATABASE_URL` wins over the
/// discrete fields.
pub async fn init(config: &Config) -> Result<Option<PgPool>, DatabaseError> {
    if config.database.skip {
        info!("SKIP_DB=1 set, skipping DB connection");
        return Ok(None);
    }

    let pool = match config.database.url.as_deref() {
        Some(url) => connect_postgres_url(url).await?,
        None => connect_postgres(&PostgresConfig::from(&config.database)).await?,
    };
    Ok(Some(pool))
}

/// Connect from a URL, falling back to `SUPABASE_URL` then `DATABASE_URL`.
/// Respects SKIP_DB.
pub async fn init_from_url(database_url: Option<&str>) -> Result<Option<PgPool>, DatabaseError> {
    if skip_db_from_env() {
        info!("SKIP_DB=1 set, skipping DB initialization");
        return Ok(None);
    }

    let url = match database_url.filter(|u| !u.is_empty()) {
        Some(url) => url.to_string(),
        None => fallback_url(|key| std::env::var(key).ok())
            .ok_or(DatabaseError::ConfigMissing("database URL"))?,
    };

    connect_postgres_url(&url).await.map(Some)
}

fn fallback_url<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    ["SUPABASE_URL", "DATABASE_URL"].iter().find_map(|key| {
        let value = lookup(key).filter(|v| !v.is_empty())?;
        info!("Init: using {} from environment", key);
        Some(value)
    })
}
