use anyhow::{Context, Result};
use keyring::Entry;

/// Keychain service for remembered vendor passwords. Kept apart from the
/// session slots so forgetting a password never touches the token.
const SERVICE_NAME: &str = "neatcctv-login";

/// Remembered vendor account passwords, one keychain entry per account.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(account: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, account)
            .with_context(|| format!("Failed to open keychain entry for {}", account))
    }

    /// Remember the password for `account`
    pub fn remember(account: &str, password: &str) -> Result<()> {
        Self::entry(account)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// Password previously remembered for `account`, if any
    pub fn recall(account: &str) -> Result<Option<String>> {
        match Self::entry(account)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read password from keychain"),
        }
    }

    /// Forget the remembered password. Forgetting an unknown account is fine.
    pub fn forget(account: &str) -> Result<()> {
        match Self::entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete password from keychain"),
        }
    }
}
