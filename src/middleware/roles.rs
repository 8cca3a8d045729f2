use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::sync::Arc;

use super::auth::current_role;
use crate::error::ApiError;

/// Case-insensitive allow-list of roles, used as state for [`require_roles`]
#[derive(Clone, Debug)]
pub struct RoleGuard {
    allowed: Arc<HashSet<String>>,
}

impl RoleGuard {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = roles
            .into_iter()
            .map(|r| r.as_ref().trim().to_lowercase())
            .filter(|r| !r.is_empty())
            .collect();
        Self {
            allowed: Arc::new(allowed),
        }
    }

    pub fn allows(&self, role: &str) -> bool {
        self.allowed.contains(&role.trim().to_lowercase())
    }
}

/// Let the request through only when the authenticated role is allowed.
/// Must run after the JWT middleware.
pub async fn require_roles(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = current_role(request.extensions());
    if !guard.allows(role) {
        tracing::warn!("Forbidden {}: role '{}' not allowed", request.uri().path(), role);
        return Err(ApiError::forbidden("insufficient role"));
    }
    Ok(next.run(request).await)
}
