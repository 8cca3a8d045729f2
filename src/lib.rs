//! Small helpers for building REST APIs on Axum and Postgres.
//!
//! - [`config`]: typed settings from the environment and an optional `.env`
//! - [`database`]: pool setup, SQL templates, pagination, transactions, migrations
//! - [`middleware`]: response envelopes, JWT authentication, role guard, CORS, request logging
//! - [`request`]: JSON binding with required-field checks, path and query helpers
//! - [`auth`]: JWT issuance/validation and bcrypt password hashing
//!
//! ```ignore
//! let config = Config::load();
//! let jwt = JwtConfig::new(&config.security.jwt_secret)?;
//!
//! let api = Router::new()
//!     .route("/profile", get(profile))
//!     .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware));
//! ```

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod middleware;
pub mod request;
pub mod validator;

pub use config::Config;
pub use error::ApiError;
pub use middleware::{ApiResponse, ApiResult};
