use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;

/// Log method, path and peer on the way in; status and duration on the way out
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    tracing::info!("==> [{}] {} {}", method, path, peer);

    let response = next.run(request).await;

    tracing::info!(
        "<== [{}] {} {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}
