//! Client for the NeatCCTV vendor web API.
//!
//! This module provides the `ApiClient` for logging in, listing devices,
//! reading device status and resolving live-video addresses.
//!
//! The API authenticates with an opaque session token (`jsession`) returned
//! by the login endpoint and sent as a form field on every later request.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod transport;

pub use client::{ApiClient, DEFAULT_BASE_URL, DEFAULT_CHANNEL};
pub use error::ApiError;
pub use transport::{HttpTransport, ReqwestTransport};
