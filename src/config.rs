//! Configuration for Lantern
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{jwt::MIN_SECRET_LEN, AdminAllowlist};

/// Lantern - content service for the public site and its admin editor
#[derive(Parser, Debug, Clone)]
#[command(name = "lantern")]
#[command(about = "Content service for a nonprofit's public site and admin editor")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (every request is an admin, in-memory store fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI (optional in dev mode)
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "lantern")]
    pub mongodb_db: String,

    /// Directory holding uploaded photo files
    #[arg(long, env = "OBJECTS_DIR", default_value = "./data/objects")]
    pub objects_dir: PathBuf,

    /// Public base URL of this service, used to build photo URLs
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:8080")]
    pub public_base_url: String,

    /// Secret shared with the identity provider for HS256 tokens
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Comma-separated emails allowed to use the admin interface
    #[arg(long, env = "ADMIN_EMAILS", default_value = "")]
    pub admin_emails: String,

    /// Seconds of inactivity before an edit session is discarded
    #[arg(long, env = "EDIT_SESSION_IDLE_SECS", default_value = "1800")]
    pub edit_session_idle_secs: u64,

    /// Maximum request body size in bytes (upload batches are base64 JSON)
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "52428800")]
    pub max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Args {
    /// Admin allowlist parsed from `ADMIN_EMAILS`
    pub fn admin_allowlist(&self) -> AdminAllowlist {
        AdminAllowlist::parse(&self.admin_emails)
    }

    pub fn edit_session_idle(&self) -> Duration {
        Duration::from_secs(self.edit_session_idle_secs)
    }

    /// Base URL under which stored objects are served
    pub fn objects_base_url(&self) -> String {
        format!("{}/objects", self.public_base_url.trim_end_matches('/'))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET must be at least {} characters",
                        MIN_SECRET_LEN
                    ))
                }
                Some(_) => {}
            }
            if self.admin_allowlist().is_empty() {
                return Err("ADMIN_EMAILS is required in production mode".to_string());
            }
            if self.mongodb_uri.is_none() {
                return Err("MONGODB_URI is required in production mode".to_string());
            }
        }

        if self.edit_session_idle_secs == 0 {
            return Err("EDIT_SESSION_IDLE_SECS must be greater than zero".to_string());
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err("LOG_FORMAT must be 'text' or 'json'".to_string());
        }

        Ok(())
    }
}
