//! Client library for the NeatCCTV vehicle tracking and video API.
//!
//! - `api`: one-request-per-call vendor client and its error type
//! - `auth`: session state machine, persisted user identity, listeners
//! - `storage`: durable key-value slots for the token and identity
//! - `models`: normalized device and stream records
//! - `demo`: the fixed fleet served in demo mode
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod demo;
pub mod models;
pub mod storage;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, DEFAULT_BASE_URL, DEFAULT_CHANNEL};
pub use auth::{AuthEvent, AuthState, SessionManager, UserIdentity};
pub use config::Config;
