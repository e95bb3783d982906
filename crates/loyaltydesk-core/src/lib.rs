//! Loyalty Desk core - session and API layer for the loyalty program.
//!
//! `auth::SessionStore` owns who is logged in and mirrors it to a
//! `storage::KeyValueStore`. `api::ApiClient` wraps every HTTP call and ends
//! the session when the server rejects its token.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{Credentials, Role, Session, SessionStore};
pub use config::Config;
