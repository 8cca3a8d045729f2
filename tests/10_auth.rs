mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;

use api_utils::auth::{generate_custom_token, generate_token};
use api_utils::middleware::JwtConfig;
use common::{get_request, protected_app, send, Hits, SECRET};

fn token(role: &str, ttl: Duration) -> String {
    generate_token(42, "ada@example.com", role, SECRET, ttl).unwrap()
}

#[tokio::test]
async fn missing_header_is_rejected_before_the_handler() -> Result<()> {
    let hits = Hits::default();
    let app = protected_app(JwtConfig::new(SECRET)?, hits.clone());

    let (status, body) = send(app, get_request("/me", None)).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "error": "missing authorization header" }));
    assert_eq!(hits.count(), 0);
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() -> Result<()> {
    let app = protected_app(JwtConfig::new(SECRET)?, Hits::default());
    let request = axum::http::Request::builder()
        .uri("/me")
        .header("Authorization", "Basic YWRhOnNlY3JldA==")
        .body(axum::body::Body::empty())?;

    let (status, body) = send(app, request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid authorization header format");
    Ok(())
}

#[tokio::test]
async fn valid_token_exposes_the_user() -> Result<()> {
    let hits = Hits::default();
    let app = protected_app(JwtConfig::new(SECRET)?, hits.clone());
    let token = token("user", Duration::hours(1));

    let (status, body) = send(app, get_request("/me", Some(&token))).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "user_id": 42, "email": "ada@example.com", "role": "user" }));
    assert_eq!(hits.count(), 1);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_reported_as_expired() -> Result<()> {
    let app = protected_app(JwtConfig::new(SECRET)?, Hits::default());
    let token = token("user", Duration::hours(-1));

    let (status, body) = send(app, get_request("/me", Some(&token))).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token expired");
    Ok(())
}

#[tokio::test]
async fn token_signed_with_another_secret_is_invalid() -> Result<()> {
    let hits = Hits::default();
    let app = protected_app(JwtConfig::new(SECRET)?, hits.clone());
    let forged = generate_token(42, "ada@example.com", "admin", "other-secret", Duration::hours(1))?;

    let (status, body) = send(app, get_request("/me", Some(&forged))).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid token");
    assert_eq!(hits.count(), 0);
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_invalid() -> Result<()> {
    let app = protected_app(JwtConfig::new(SECRET)?, Hits::default());

    let (status, body) = send(app, get_request("/me", Some("not.a.jwt"))).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid token");
    Ok(())
}

#[tokio::test]
async fn skipped_requests_reach_the_route_unauthenticated() -> Result<()> {
    let config = JwtConfig::new(SECRET)?.with_skipper(|req| req.uri().path() == "/me");
    let app = protected_app(config, Hits::default());

    // The middleware lets it through, the AuthUser extractor then refuses it
    let (status, body) = send(app, get_request("/me", None)).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");
    Ok(())
}

#[tokio::test]
async fn custom_tokens_carry_arbitrary_claims() -> Result<()> {
    let app = protected_app(JwtConfig::new(SECRET)?.custom_tokens(), Hits::default());
    let token = generate_custom_token(
        &json!({ "user_id": 7, "email": "grace@example.com", "role": "admin", "tenant": "acme" }),
        SECRET,
        Duration::minutes(5),
    )?;

    let (status, body) = send(app, get_request("/admin", Some(&token))).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "user_id": 7, "role": "admin" }));
    Ok(())
}

#[tokio::test]
async fn role_guard_forbids_other_roles() -> Result<()> {
    let hits = Hits::default();
    let app = protected_app(JwtConfig::new(SECRET)?, hits.clone());
    let token = token("user", Duration::hours(1));

    let (status, body) = send(app, get_request("/admin", Some(&token))).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "success": false, "error": "insufficient role" }));
    assert_eq!(hits.count(), 0);
    Ok(())
}

#[tokio::test]
async fn role_guard_admits_matching_role_in_any_case() -> Result<()> {
    let app = protected_app(JwtConfig::new(SECRET)?, Hits::default());
    let token = token("ADMIN", Duration::hours(1));

    let (status, body) = send(app, get_request("/admin", Some(&token))).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ADMIN");
    Ok(())
}

#[tokio::test]
async fn role_guard_without_auth_context_is_forbidden() -> Result<()> {
    // Skipping authentication leaves no role for the guard to match
    let config = JwtConfig::new(SECRET)?.with_skipper(|req| req.uri().path() == "/admin");
    let app = protected_app(config, Hits::default());

    let (status, _) = send(app, get_request("/admin", None)).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn token_with_only_exp_and_identity_is_accepted() -> Result<()> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = chrono::Utc::now().timestamp() as f64 + 3600.5;
    let token = encode(
        &Header::default(),
        &json!({ "user_id": 3, "email": "lin@example.com", "exp": exp }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )?;
    let app = protected_app(JwtConfig::new(SECRET)?, Hits::default());

    let (status, body) = send(app, get_request("/me", Some(&token))).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "user_id": 3, "email": "lin@example.com", "role": "" }));
    Ok(())
}
