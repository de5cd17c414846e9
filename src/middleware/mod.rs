pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin_middleware, TenantContext};
pub use response::{ApiResponse, ApiResult};
