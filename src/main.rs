use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use tower::ServiceBuilder;
use tracing_subscriber::EnvFilter;

use api_utils::auth::{compare_password, generate_token, PasswordHasher};
use api_utils::database::{
    self, auto_migrate, build_insert_query, build_select_query, build_update_query,
    check_rows_affected, count_and_paginate, with_transaction, DatabaseError, Model, PageMeta,
    PageQuery, Pagination, TableSchema,
};
use api_utils::health::health_router;
use api_utils::middleware::{
    cors_layer, jwt_auth_middleware, log_requests, require_roles, AuthUser, JwtConfig, RoleGuard,
};
use api_utils::request::{id_from_path, validate_email, RequiredFields, Validated};
use api_utils::{ApiError, ApiResponse, ApiResult, Config};

const DEV_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Clone)]
struct AppState {
    db: Option<PgPool>,
    hasher: PasswordHasher,
    jwt_secret: String,
    jwt_ttl: chrono::Duration,
}

impl AppState {
    fn db(&self) -> Result<&PgPool, ApiError> {
        self.db
            .as_ref()
            .ok_or_else(|| ApiError::internal_server_error("database not configured"))
    }
}

#[derive(Debug, Serialize, FromRow)]
struct User {
    id: i64,
    email: String,
    name: String,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl Model for User {
    fn schema() -> TableSchema {
        TableSchema::new("users")
            .column("id", "BIGSERIAL PRIMARY KEY")
            .column("email", "TEXT NOT NULL UNIQUE")
            .column("password", "TEXT NOT NULL")
            .column("name", "TEXT NOT NULL")
            .column("role", "TEXT NOT NULL DEFAULT 'user'")
            .column("created_at", "TIMESTAMPTZ NOT NULL DEFAULT now()")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    name: String,
}

impl RequiredFields for RegisterRequest {
    const REQUIRED: &'static [&'static str] = &["email", "password", "name"];
}

#[derive(Debug, Serialize, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

impl RequiredFields for LoginRequest {
    const REQUIRED: &'static [&'static str] = &["email", "password"];
}

#[derive(Debug, Serialize, Deserialize)]
struct UpdateProfileRequest {
    name: String,
}

impl RequiredFields for UpdateProfileRequest {
    const REQUIRED: &'static [&'static str] = &["name"];
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::must_load()?;

    let db = database::init(&config).await.context("database initialization failed")?;
    if let Some(pool) = &db {
        auto_migrate(pool, &[User::schema()]).await?;
    }

    let jwt_secret = if config.security.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set, using the development secret");
        DEV_JWT_SECRET.to_string()
    } else {
        config.security.jwt_secret.clone()
    };

    let state = AppState {
        db: db.clone(),
        hasher: PasswordHasher::new(config.security.bcrypt_cost),
        jwt_ttl: config.jwt_ttl(),
        jwt_secret: jwt_secret.clone(),
    };

    let app = build_router(state, JwtConfig::new(jwt_secret)?).merge(health_router(db.clone())).layer(
        ServiceBuilder::new()
            .layer(from_fn(log_requests))
            .layer(cors_layer()),
    );

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = db {
        database::close(pool).await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn build_router(state: AppState, jwt: JwtConfig) -> Router {
    let admin = Router::new()
        .route("/stats", get(admin_stats))
        .route("/users/:id", delete(delete_user))
        .route_layer(from_fn_with_state(RoleGuard::new(["admin"]), require_roles));

    let api = Router::new()
        .route("/profile", get(profile).put(update_profile))
        .route("/users", get(list_users))
        .nest("/admin", admin)
        .route_layer(from_fn_with_state(jwt, jwt_auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .nest("/api", api)
        .with_state(state)
}

async fn register(
    State(state): State<AppState>,
    Validated(req): Validated<RegisterRequest>,
) -> ApiResult<serde_json::Value> {
    validate_email(&req.email)?;
    let pool = state.db()?;
    let password = state.hasher.hash(&req.password)?;

    let sql = build_insert_query("users", &["email", "password", "name"]);
    let user_id = with_transaction(pool, move |tx| {
        Box::pin(async move {
            let id: i64 = sqlx::query_scalar(&sql)
                .bind(req.email)
                .bind(password)
                .bind(req.name)
                .fetch_one(&mut **tx)
                .await?;
            Ok::<_, DatabaseError>(id)
        })
    })
    .await
    .map_err(|e| match e {
        DatabaseError::Sqlx(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            ApiError::with_status(StatusCode::CONFLICT, "email already registered")
        }
        other => other.into(),
    })?;

    Ok(ApiResponse::created("user created", json!({ "user_id": user_id })))
}

async fn login(
    State(state): State<AppState>,
    Validated(req): Validated<LoginRequest>,
) -> ApiResult<serde_json::Value> {
    let pool = state.db()?;

    let sql = build_select_query("users", &["id", "password", "role"], "email = $1");
    let row: Option<(i64, String, String)> = sqlx::query_as(&sql)
        .bind(&req.email)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from)?;

    let (user_id, _, role) = match row {
        Some(row) if compare_password(&row.1, &req.password) => row,
        _ => return Err(ApiError::unauthorized("invalid credentials")),
    };

    let token = generate_token(user_id, &req.email, &role, &state.jwt_secret, state.jwt_ttl)
        .map_err(|e| {
            tracing::error!("Token generation failed: {}", e);
            ApiError::internal_server_error("failed to generate token")
        })?;

    Ok(ApiResponse::success("login successful", json!({ "token": token })))
}

async fn profile(user: AuthUser) -> ApiResult<serde_json::Value> {
    Ok(ApiResponse::success(
        "profile retrieved",
        json!({ "user_id": user.user_id, "email": user.email, "role": user.role }),
    ))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Validated(req): Validated<UpdateProfileRequest>,
) -> ApiResult<serde_json::Value> {
    let pool = state.db()?;

    let result = sqlx::query(&build_update_query("users", &["name"]))
        .bind(&req.name)
        .bind(user.user_id)
        .execute(pool)
        .await
        .map_err(DatabaseError::from)?;
    check_rows_affected(&result)?;

    Ok(ApiResponse::success("profile updated", json!({ "name": req.name })))
}

async fn list_users(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<ApiResponse<Vec<User>, PageMeta>, ApiError> {
    let pool = state.db()?;

    let query = PageQuery::new("users", &["id", "email", "name", "role", "created_at"]).order_by("id");
    let page = count_and_paginate::<User>(pool, &query, Pagination::from_uri(&uri)).await?;
    let meta = page.meta();

    Ok(ApiResponse::paginated("users retrieved", page.records, meta))
}

async fn admin_stats(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let pool = state.db()?;

    let sql = build_select_query("users", &["COUNT(*)"], "");
    let total: i64 = sqlx::query_scalar(&sql)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::from)?;

    Ok(ApiResponse::success("stats retrieved", json!({ "users": total })))
}

async fn delete_user(State(state): State<AppState>, uri: Uri) -> Result<ApiResponse<()>, ApiError> {
    let id = id_from_path(&uri)?;
    let pool = state.db()?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(DatabaseError::from)?;
    check_rows_affected(&result)?;

    Ok(ApiResponse::no_content())
}
