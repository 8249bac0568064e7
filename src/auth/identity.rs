//! Who is calling, and whether they may administer the site

use serde::Serialize;
use std::collections::HashSet;

use super::jwt::{extract_token_from_header, JwtValidator};
use crate::types::{Result, SiteError};

/// Signed-in user as seen by the admin shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Identity capability handed to request handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub current_user: Option<User>,
    pub is_admin: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            current_user: None,
            is_admin: false,
        }
    }

    /// Identity used for every request in dev mode
    pub fn dev_admin() -> Self {
        Self {
            current_user: Some(User {
                id: "dev".into(),
                email: "dev@localhost".into(),
            }),
            is_admin: true,
        }
    }

    /// The admin user, or 401/403
    pub fn require_admin(&self) -> Result<&User> {
        match (&self.current_user, self.is_admin) {
            (Some(user), true) => Ok(user),
            (Some(user), false) => Err(SiteError::Forbidden(format!(
                "{} is not an administrator",
                user.email
            ))),
            (None, _) => Err(SiteError::Unauthorized("Sign-in required".into())),
        }
    }
}

/// Emails allowed to administer the site (case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Resolves request identities from bearer tokens
#[derive(Clone)]
pub struct IdentityResolver {
    jwt: JwtValidator,
    allowlist: AdminAllowlist,
    dev_mode: bool,
}

impl IdentityResolver {
    pub fn new(jwt: JwtValidator, allowlist: AdminAllowlist, dev_mode: bool) -> Self {
        Self {
            jwt,
            allowlist,
            dev_mode,
        }
    }

    pub fn jwt(&self) -> &JwtValidator {
        &self.jwt
    }

    /// Identity for an `Authorization` header value.
    ///
    /// A missing token is anonymous; a bad token is an error.
    pub fn resolve(&self, auth_header: Option<&str>) -> Result<Identity> {
        if self.dev_mode {
            return Ok(Identity::dev_admin());
        }
        let Some(token) = extract_token_from_header(auth_header) else {
            return Ok(Identity::anonymous());
        };
        let claims = self.jwt.verify(token)?;
        let is_admin = !claims.email.is_empty() && self.allowlist.contains(&claims.email);
        Ok(Identity {
            current_user: Some(User {
                id: claims.sub,
                email: claims.email,
            }),
            is_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(
            JwtValidator::new("test-secret-that-is-at-least-32-characters-long".into()).unwrap(),
            AdminAllowlist::parse("Admin@Example.org, second@example.org"),
            false,
        )
    }

    #[test]
    fn test_allowlisted_email_is_admin() {
        let resolver = resolver();
        let token = resolver.jwt().issue("u1", "admin@example.org", 60).unwrap();
        let identity = resolver.resolve(Some(&format!("Bearer {}", token))).unwrap();
        assert!(identity.is_admin);
        assert!(identity.require_admin().is_ok());
    }

    #[test]
    fn test_other_email_is_forbidden() {
        let resolver = resolver();
        let token = resolver.jwt().issue("u2", "visitor@example.org", 60).unwrap();
        let identity = resolver.resolve(Some(&format!("Bearer {}", token))).unwrap();
        assert!(!identity.is_admin);
        assert!(matches!(identity.require_admin(), Err(SiteError::Forbidden(_))));
    }

    #[test]
    fn test_missing_token_is_anonymous() {
        let identity = resolver().resolve(None).unwrap();
        assert_eq!(identity, Identity::anonymous());
        assert!(matches!(identity.require_admin(), Err(SiteError::Unauthorized(_))));
    }

    #[test]
    fn test_dev_mode_is_admin() {
        let resolver = IdentityResolver::new(JwtValidator::new_dev(), AdminAllowlist::default(), true);
        assert!(resolver.resolve(None).unwrap().is_admin);
    }
}
