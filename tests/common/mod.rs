#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use api_utils::middleware::{jwt_auth_middleware, require_roles, AuthUser, JwtConfig, RoleGuard};

pub const SECRET: &str = "test-secret";

/// Counts how many times the protected handler actually ran
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// `/me` echoes the authenticated user, `/admin` additionally requires role `admin`
pub fn protected_app(config: JwtConfig, hits: Hits) -> Router {
    let me_hits = hits.clone();
    let admin = Router::new()
        .route(
            "/admin",
            get(move |user: AuthUser| {
                hits.hit();
                async move { Json(json!({ "user_id": user.user_id, "role": user.role })) }
            }),
        )
        .route_layer(from_fn_with_state(RoleGuard::new(["admin"]), require_roles));

    Router::new()
        .route(
            "/me",
            get(move |user: AuthUser| {
                me_hits.hit();
                async move {
                    Json(json!({ "user_id": user.user_id, "email": user.email, "role": user.role }))
                }
            }),
        )
        .merge(admin)
        .route_layer(from_fn_with_state(config, jwt_auth_middleware))
}

pub fn get_request(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Drive one request through the router and decode the JSON body (`Null` when empty)
pub async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}
