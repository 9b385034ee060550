//! Durable key-value storage for session state.
//!
//! The client persists two string slots: the vendor session token and the
//! serialized current-user identity. `KeyValueStore` abstracts where they
//! live:
//! - `MemoryStore`: process-local, used in tests and for throwaway sessions
//! - `FileStore`: a JSON file under the user's config directory
//! - `KeyringStore`: the OS keychain via `keyring`

pub mod file;
pub mod keychain;
pub mod memory;

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

use thiserror::Error;

/// Key under which the vendor session token is stored.
pub const TOKEN_KEY: &str = "neat_api_token";

/// Key under which the serialized `UserIdentity` is stored.
pub const CURRENT_USER_KEY: &str = "neat_current_user";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Single-writer, last-write-wins string slots.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
