// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None. The auth gate lets these paths through by glob
// (`/api/auth/**`), so handlers must validate all of their input.
pub mod auth;
