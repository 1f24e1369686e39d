// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here sits behind the auth gate, so handlers can rely on an
// `AuthUser` extension. Degree routes additionally get `TenantDegrees`.
pub mod audit; // Retraced viewer tokens
pub mod degree; // Degree catalogue CRUD and bulk import
