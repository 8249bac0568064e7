//! Authentication for admin routes
//!
//! Provides:
//! - JWT bearer token validation
//! - The identity capability (`current_user`, `is_admin`)
//! - The admin email allowlist

pub mod identity;
pub mod jwt;

pub use identity::{AdminAllowlist, Identity, IdentityResolver, User};
pub use jwt::{extract_token_from_header, Claims, JwtValidator};
