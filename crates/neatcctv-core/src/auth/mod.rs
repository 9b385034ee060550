//! Authentication and session state.
//!
//! This module provides:
//! - `SessionManager`: the login state machine built on `ApiClient`
//! - `UserIdentity`: the persisted record of who is logged in
//! - `ListenerRegistry`: observers notified on every state transition
//! - `CredentialStore`: remembered passwords in the OS keychain
//!
//! A stored session is only re-validated at `SessionManager::initialize`.

pub mod credentials;
pub mod identity;
pub mod listeners;
pub mod session;

pub use credentials::CredentialStore;
pub use identity::{UserIdentity, DEMO_PASSWORD, DEMO_USERNAME};
pub use listeners::{AuthEvent, ListenerId, ListenerRegistry};
pub use session::{AuthState, SessionManager};
