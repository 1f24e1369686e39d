pub mod auth;
pub mod response;
pub mod validate_tenant;

pub use auth::{auth_gate_middleware, is_public_path, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use validate_tenant::{validate_tenant_middleware, TenantDegrees};
