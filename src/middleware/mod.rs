pub mod auth;
pub mod cors;
pub mod logging;
pub mod response;
pub mod roles;

pub use auth::{current_role, current_user, jwt_auth_middleware, AuthUser, JwtConfig};
pub use cors::cors_layer;
pub use logging::log_requests;
pub use response::{ApiResponse, ApiResult};
pub use roles::{require_roles, RoleGuard};
