//! Authentication module for managing the logged-in session.
//!
//! This module provides:
//! - `Session`, `Profile`, `Role`, `Credentials`: who is logged in and how
//! - `SessionStore`: login/logout/restore with durable mirroring
//!
//! Sessions survive restarts through the store's `KeyValueStore` and end on
//! logout or when the server rejects the token.

pub mod session;
pub mod store;

pub use session::{Credentials, Profile, Role, Session};
pub use store::{SessionStore, PROFILE_KEY, TOKEN_KEY};
