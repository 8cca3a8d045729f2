use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::sync::Arc;

use crate::auth::{validate_custom_token, validate_token, JwtError, TokenClaims};
use crate::error::ApiError;

type Skipper = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// State for [`jwt_auth_middleware`]
#[derive(Clone)]
pub struct JwtConfig {
    secret: Arc<str>,
    custom_tokens: bool,
    skipper: Option<Skipper>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Result<Self, JwtError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        Ok(Self {
            secret: secret.into(),
            custom_tokens: false,
            skipper: None,
        })
    }

    /// Expect open-claim tokens instead of the fixed claim set
    pub fn custom_tokens(mut self) -> Self {
        self.custom_tokens = true;
        self
    }

    /// Requests for which `skip` returns true pass through unauthenticated
    pub fn with_skipper<F>(mut self, skip: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.skipper = Some(Arc::new(skip));
        self
    }

    fn validate(&self, token: &str) -> Result<TokenClaims, JwtError> {
        if self.custom_tokens {
            validate_custom_token(token, &self.secret).map(TokenClaims::Custom)
        } else {
            validate_token(token, &self.secret).map(TokenClaims::Standard)
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("custom_tokens", &self.custom_tokens)
            .field("skipper", &self.skipper.is_some())
            .finish()
    }
}

/// Authenticated principal, injected into request extensions by the JWT middleware
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub claims: TokenClaims,
}

impl AuthUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        let (user_id, email, role) = match &claims {
            TokenClaims::Standard(c) => (c.user_id, c.email.clone(), c.role.clone()),
            TokenClaims::Custom(c) => (c.get_i64("user_id"), c.get_string("email"), c.get_string("role")),
        };
        Self {
            user_id,
            email,
            role,
            claims,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(&parts.extensions)
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("authentication required"))
    }
}

pub fn current_user(extensions: &Extensions) -> Option<&AuthUser> {
    extensions.get::<AuthUser>()
}

/// Role of the authenticated user, or `""`
pub fn current_role(extensions: &Extensions) -> &str {
    current_user(extensions).map(|u| u.role.as_str()).unwrap_or("")
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(config): State<JwtConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(skip) = &config.skipper {
        if skip(&request) {
            return Ok(next.run(request).await);
        }
    }

    let token = extract_bearer_token(request.headers()).map_err(|msg| {
        tracing::debug!("Rejected {}: {}", request.uri().path(), msg);
        ApiError::unauthorized(msg)
    })?;

    let claims = config.validate(&token).map_err(|e| {
        tracing::debug!("Rejected {}: {}", request.uri().path(), e);
        match e {
            JwtError::ExpiredToken => ApiError::unauthorized("token expired"),
            _ => ApiError::unauthorized("invalid token"),
        }
    })?;

    request.extensions_mut().insert(AuthUser::from_claims(claims));

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, &'static str> {
    let auth_header = match headers.get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err("missing authorization header"),
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "invalid authorization header format")?;

    let mut parts = auth_str.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token.to_string()),
        _ => Err("invalid authorization header format"),
    }
}
