//! Bearer token validation
//!
//! Admin requests carry an HS256 JWT issued by the identity provider. Only
//! the subject and email are used; the email decides admin membership.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{Result, SiteError};

/// Minimum secret length accepted outside dev mode
pub const MIN_SECRET_LEN: usize = 32;

/// Payload of an identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-provider user id
    pub sub: String,
    #[serde(default)]
    pub email: String,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
}

impl JwtValidator {
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String) -> Result<Self> {
        if secret.is_empty() {
            return Err(SiteError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(SiteError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self { secret })
    }

    /// Validator for dev mode (fixed secret)
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
        }
    }

    /// Sign a token; used by dev tooling and tests
    pub fn issue(&self, sub: &str, email: &str, ttl_seconds: u64) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SiteError::Internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + ttl_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SiteError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let msg = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidToken => "Invalid token",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Token validation failed",
            };
            SiteError::Unauthorized(msg.into())
        })
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new("test-secret-that-is-at-least-32-characters-long".into()).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let validator = test_validator();
        let token = validator.issue("u1", "ada@example.org", 3600).unwrap();
        let claims = validator.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "ada@example.org");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtValidator::new_dev().issue("u1", "a@b.c", 3600).unwrap();
        assert!(matches!(
            test_validator().verify(&token),
            Err(SiteError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            JwtValidator::new("short".into()),
            Err(SiteError::Config(_))
        ));
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_token_from_header(Some("abc")), Some("abc"));
        assert_eq!(extract_token_from_header(Some("Basic a b")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
