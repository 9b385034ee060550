use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, StorageError, CURRENT_USER_KEY};

/// Username and password that enter demo mode instead of logging in.
pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo";

/// Token placeholder carried by the demo identity.
const DEMO_TOKEN: &str = "demo";

/// The logged-in user as remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub username: String,
    pub session_token: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub login_time: DateTime<Utc>,
    #[serde(default)]
    pub demo: bool,
}

impl UserIdentity {
    pub fn new(username: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            session_token: session_token.into(),
            login_time: Utc::now(),
            demo: false,
        }
    }

    /// Synthetic identity for demo mode. Not backed by a vendor session.
    pub fn demo() -> Self {
        Self {
            demo: true,
            ..Self::new(DEMO_USERNAME, DEMO_TOKEN)
        }
    }

    pub fn is_demo_credentials(username: &str, password: &str) -> bool {
        username == DEMO_USERNAME && password == DEMO_PASSWORD
    }

    /// Load the stored identity. An unparseable record is an error.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StorageError> {
        match store.get(CURRENT_USER_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(CURRENT_USER_KEY, &json)
    }

    pub fn clear(store: &dyn KeyValueStore) -> Result<(), StorageError> {
        store.remove(CURRENT_USER_KEY)
    }
}
