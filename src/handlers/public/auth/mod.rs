// handlers/public/auth/mod.rs - Public authentication handlers
pub mod forgot_password; // POST /api/auth/forgot-password

pub use forgot_password::forgot_password_post;
