use axum::{extract::State, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::database::ping;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// `ok`, `down`, or `skipped` when there is no pool
    pub db: &'static str,
    pub time: String,
}

pub async fn health_status(pool: Option<&PgPool>) -> HealthStatus {
    let db = match pool {
        Some(pool) => match ping(pool).await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!("Health check database probe failed: {}", e);
                "down"
            }
        },
        None => "skipped",
    };

    HealthStatus {
        status: "ok",
        db,
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

async fn health(State(pool): State<Option<PgPool>>) -> Json<HealthStatus> {
    Json(health_status(pool.as_ref()).await)
}

/// `GET /health`, always 200; the body reports database reachability
pub fn health_router(pool: Option<PgPool>) -> Router {
    Router::new().route("/health", get(health)).with_state(pool)
}
