//! REST API client module for the loyalty program services.
//!
//! This module provides the `ApiClient` for tiers, tier configurations,
//! wallet branding, shop check-in and points. Requests run over a pluggable
//! `Transport`; `ReqwestTransport` is the HTTP implementation.
//!
//! The identity host issues the bearer tokens every other call carries.

pub mod checkin;
pub mod client;
pub mod error;
pub mod points;
pub mod shops;
pub mod tiers;
pub mod transport;
pub mod wallet;

pub use client::{ApiClient, Endpoints, UnauthorizedHook};
pub use error::ApiError;
pub use transport::{
    ApiRequest, ApiResponse, Credential, FormPart, RequestBody, ReqwestTransport, Transport,
};
