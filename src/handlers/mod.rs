// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (JWT auth + tenant store)
pub mod protected; // JWT authentication required (/api/*)
pub mod public; // No authentication required (/api/auth/*)
