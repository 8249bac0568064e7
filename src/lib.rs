//! Lantern - content service for a nonprofit's public site
//!
//! Serves the public pages (home, content pages, gallery) from a document
//! store and hosts the admin editor: buffered collection and page editing
//! inside edit sessions, plus gallery management with photo uploads.

pub mod auth;
pub mod config;
pub mod content;
pub mod editor;
pub mod objects;
pub mod render;
pub mod routes;
pub mod server;
pub mod sessions;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, SiteError};
