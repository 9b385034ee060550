use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::demo;
use crate::models::{Device, StreamAddress, StreamProtocol};
use crate::storage::KeyValueStore;

use super::{AuthEvent, ListenerId, ListenerRegistry, UserIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Uninitialized,
    Checking,
    Authenticated,
    Unauthenticated,
}

/// Login state for the one vendor session this process holds.
///
/// Owns the `ApiClient`. Device and stream calls go through here so that
/// demo mode can answer them locally.
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    listeners: Arc<ListenerRegistry>,
    state: AuthState,
    current_user: Option<UserIdentity>,
}

impl SessionManager {
    /// `store` should be the same backend the client persists its token to.
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            listeners: Arc::new(ListenerRegistry::new()),
            state: AuthState::Uninitialized,
            current_user: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn is_demo(&self) -> bool {
        self.is_logged_in() && self.current_user.as_ref().is_some_and(|u| u.demo)
    }

    /// Shared handle for listeners that need to (un)subscribe from inside a
    /// callback.
    pub fn listeners(&self) -> Arc<ListenerRegistry> {
        Arc::clone(&self.listeners)
    }

    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&AuthEvent<'_>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ===== Lifecycle =====

    /// Restore a stored session on startup.
    ///
    /// A stored vendor session is re-validated with one device listing;
    /// if the vendor refuses it, every trace of it is removed.
    pub async fn initialize(&mut self) -> bool {
        let stored = match UserIdentity::load(self.store.as_ref()) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Stored user is unreadable, discarding it");
                self.forget_user();
                None
            }
        };

        let Some(user) = stored else {
            debug!("No stored session");
            self.transition(AuthState::Unauthenticated);
            return false;
        };

        if user.demo {
            info!("Restored demo session");
            self.current_user = Some(user);
            self.transition(AuthState::Authenticated);
            return true;
        }

        if !self.api.is_authenticated() {
            debug!(username = %user.username, "Stored user has no session token");
            self.forget_user();
            self.transition(AuthState::Unauthenticated);
            return false;
        }

        self.current_user = Some(user);
        self.transition(AuthState::Checking);

        match self.api.get_user_vehicles().await {
            Ok(_) => {
                info!("Stored session is still valid");
                self.transition(AuthState::Authenticated);
                true
            }
            Err(e) => {
                info!(error = %e, "Stored session rejected, signing out");
                self.api.clear_session();
                self.forget_user();
                self.transition(AuthState::Unauthenticated);
                false
            }
        }
    }

    /// Log in, or enter demo mode for the demo credentials.
    ///
    /// On failure any previous session is cleared, the manager is left
    /// unauthenticated and the client's error is returned as-is.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<UserIdentity, ApiError> {
        let user = if UserIdentity::is_demo_credentials(username, password) {
            info!("Entering demo mode");
            UserIdentity::demo()
        } else {
            match self.api.login(username, password).await {
                Ok(outcome) => UserIdentity::new(username, outcome.token),
                Err(e) => {
                    warn!(username = username, error = %e, "Login failed");
                    // A failed login ends any previous session: token and
                    // identity go together.
                    self.api.clear_session();
                    self.forget_user();
                    if self.state != AuthState::Unauthenticated {
                        self.transition(AuthState::Unauthenticated);
                    }
                    return Err(e);
                }
            }
        };

        if let Err(e) = user.save(self.store.as_ref()) {
            warn!(error = %e, "Failed to persist current user");
        }
        self.current_user = Some(user.clone());
        self.transition(AuthState::Authenticated);
        Ok(user)
    }

    /// Log out. Always succeeds locally, even if the vendor call fails.
    pub async fn logout(&mut self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Vendor logout failed");
        }
        self.forget_user();
        info!("Logged out");
        self.transition(AuthState::Unauthenticated);
    }

    /// The logged-in user, reloaded from storage if only the flag survived.
    pub fn current_user(&mut self) -> Option<&UserIdentity> {
        if self.current_user.is_none() && self.is_logged_in() {
            match UserIdentity::load(self.store.as_ref()) {
                Ok(user) => self.current_user = user,
                Err(e) => warn!(error = %e, "Failed to reload stored user"),
            }
        }
        self.current_user.as_ref()
    }

    // ===== Data (demo-aware) =====

    pub async fn vehicles(&mut self) -> Result<Vec<Device>, ApiError> {
        if self.is_demo() {
            return Ok(demo::vehicles());
        }
        let result = self.api.get_user_vehicles().await;
        self.check(result)
    }

    pub async fn device_list(&mut self) -> Result<Vec<Device>, ApiError> {
        if self.is_demo() {
            return Ok(demo::vehicles());
        }
        let result = self.api.get_device_list().await;
        self.check(result)
    }

    pub async fn device_online_status(&mut self, device_id: &str) -> Result<Vec<Value>, ApiError> {
        if self.is_demo() {
            return demo::online_status(device_id);
        }
        let result = self.api.get_device_online_status(device_id).await;
        self.check(result)
    }

    pub async fn device_gps_status(&mut self, device_id: &str) -> Result<Vec<Value>, ApiError> {
        if self.is_demo() {
            return demo::gps_status(device_id);
        }
        let result = self.api.get_device_gps_status(device_id).await;
        self.check(result)
    }

    pub async fn device_track(
        &mut self,
        device_id: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<Value>, ApiError> {
        if self.is_demo() {
            return demo::track(device_id, start_time, end_time);
        }
        let result = self.api.get_device_track(device_id, start_time, end_time).await;
        self.check(result)
    }

    pub async fn latest_position(&mut self, device_id: &str) -> Result<Value, ApiError> {
        if self.is_demo() {
            return demo::latest_position(device_id);
        }
        let result = self.api.get_vehicle_latest_position(device_id).await;
        self.check(result)
    }

    pub async fn hls_live_address(&mut self, device_id: &str, channel: u32) -> Result<StreamAddress, ApiError> {
        if self.is_demo() {
            return demo::live_address(StreamProtocol::Hls, device_id, channel);
        }
        let result = self.api.get_hls_live_address(device_id, channel).await;
        self.check(result)
    }

    pub async fn rtsp_live_address(&mut self, device_id: &str, channel: u32) -> Result<StreamAddress, ApiError> {
        if self.is_demo() {
            return demo::live_address(StreamProtocol::Rtsp, device_id, channel);
        }
        let result = self.api.get_rtsp_live_address(device_id, channel).await;
        self.check(result)
    }

    // ===== Internals =====

    /// Drop to unauthenticated if `result` shows the session is gone.
    fn check<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ref e) = result {
            if self.api.handle_api_error(e) && self.is_logged_in() {
                self.forget_user();
                self.transition(AuthState::Unauthenticated);
            }
        }
        result
    }

    fn forget_user(&mut self) {
        self.current_user = None;
        if let Err(e) = UserIdentity::clear(self.store.as_ref()) {
            warn!(error = %e, "Failed to remove stored user");
        }
    }

    fn transition(&mut self, state: AuthState) {
        debug!(from = ?self.state, to = ?state, "Session state change");
        self.state = state;
        let user = if state == AuthState::Authenticated {
            self.current_user.as_ref()
        } else {
            None
        };
        self.listeners.notify(&AuthEvent { state, user });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::storage::{MemoryStore, CURRENT_USER_KEY, TOKEN_KEY};
    use crate::testing::MockTransport;

    struct Harness {
        mock: Arc<MockTransport>,
        store: Arc<MemoryStore>,
        events: Arc<Mutex<Vec<(AuthState, Option<String>)>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                mock: MockTransport::new(),
                store: Arc::new(MemoryStore::new()),
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn manager(&self) -> SessionManager {
            let api = ApiClient::with_transport(
                "http://vendor.test/808gps/open",
                self.mock.clone(),
                self.store.clone(),
            );
            let manager = SessionManager::new(api, self.store.clone());
            let events = self.events.clone();
            manager.subscribe(move |e| {
                events
                    .lock()
                    .unwrap()
                    .push((e.state, e.user.map(|u| u.username.clone())));
            });
            manager
        }

        fn store_session(&self, token: &str) {
            self.store.set(TOKEN_KEY, token).unwrap();
            UserIdentity::new("alice", token).save(self.store.as_ref()).unwrap();
        }

        fn states(&self) -> Vec<AuthState> {
            self.events.lock().unwrap().iter().map(|(s, _)| *s).collect()
        }
    }

    #[tokio::test]
    async fn test_login_success() {
        let h = Harness::new();
        h.mock.respond(json!({"result": 0, "jsession": "abc123"}));
        let mut manager = h.manager();

        let user = manager.login("alice", "secret").await.unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.session_token, "abc123");
        assert!(!user.demo);
        assert!(manager.is_logged_in());
        assert_eq!(UserIdentity::load(h.store.as_ref()).unwrap(), Some(user));
        assert_eq!(
            h.events.lock().unwrap().last().cloned(),
            Some((AuthState::Authenticated, Some("alice".to_string())))
        );
    }

    #[tokio::test]
    async fn test_login_rejected_stays_unauthenticated() {
        let h = Harness::new();
        h.mock.respond(json!({"result": 1, "desc": "bad password"}));
        let mut manager = h.manager();

        let err = manager.login("alice", "wrong").await.unwrap_err();

        assert_eq!(err, ApiError::VendorRejected("bad password".to_string()));
        assert_eq!(err.to_string(), "bad password");
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert_eq!(manager.current_user(), None);
        assert_eq!(h.store.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_relogin_clears_previous_session() {
        let h = Harness::new();
        h.mock.respond(json!({"result": 0, "jsession": "abc123"}));
        h.mock.respond(json!({"result": 1, "desc": "bad password"}));
        let mut manager = h.manager();
        manager.login("alice", "secret").await.unwrap();

        assert!(manager.login("bob", "wrong").await.is_err());

        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert_eq!(h.store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(h.store.get(CURRENT_USER_KEY).unwrap(), None);
        assert_eq!(manager.api().token(), None);

        assert_eq!(manager.vehicles().await.unwrap_err(), ApiError::Unauthenticated);
        assert_eq!(h.mock.request_count(), 2);
        assert!(!manager.initialize().await);
    }

    #[tokio::test]
    async fn test_demo_login_uses_no_network() {
        let h = Harness::new();
        let mut manager = h.manager();

        let user = manager.login("demo", "demo").await.unwrap();

        assert!(user.demo);
        assert!(manager.is_demo());
        assert_eq!(h.mock.request_count(), 0);

        let vehicles = manager.vehicles().await.unwrap();
        assert_eq!(vehicles.len(), 5);
        let stream = manager.hls_live_address("Tracker-001", 1).await.unwrap();
        assert!(stream.stream_url.ends_with(".m3u8"));
        manager.rtsp_live_address("Tracker-002", 2).await.unwrap();
        manager.device_online_status("Tracker-001").await.unwrap();
        manager.device_gps_status("Tracker-001").await.unwrap();
        manager.latest_position("Tracker-001").await.unwrap();
        manager
            .device_track("Tracker-001", "2024-01-01 00:00:00", "2024-01-01 01:00:00")
            .await
            .unwrap();
        assert_eq!(h.mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_state_even_when_network_fails() {
        let h = Harness::new();
        h.mock.respond(json!({"result": 0, "jsession": "abc123"}));
        h.mock.fail(ApiError::NetworkFailure("connection refused".to_string()));
        let mut manager = h.manager();
        manager.login("alice", "secret").await.unwrap();

        manager.logout().await;

        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert_eq!(manager.current_user(), None);
        assert_eq!(h.store.get(CURRENT_USER_KEY).unwrap(), None);
        assert_eq!(h.store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(h.mock.requests()[1].endpoint(), "StandardApiAction_logout.action");
    }

    #[tokio::test]
    async fn test_initialize_without_stored_user() {
        let h = Harness::new();
        let mut manager = h.manager();
        assert_eq!(manager.state(), AuthState::Uninitialized);

        assert!(!manager.initialize().await);
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert_eq!(h.mock.request_count(), 0);
        assert_eq!(h.states(), vec![AuthState::Unauthenticated]);
    }

    #[tokio::test]
    async fn test_initialize_revalidates_stored_session() {
        let h = Harness::new();
        h.store_session("abc123");
        h.mock.respond(json!({"result": 0, "deviceInfo": []}));
        let mut manager = h.manager();

        assert!(manager.initialize().await);

        assert_eq!(manager.state(), AuthState::Authenticated);
        assert_eq!(manager.current_user().map(|u| u.username.as_str()), Some("alice"));
        assert_eq!(h.mock.request_count(), 1);
        assert_eq!(h.mock.requests()[0].param("jsession"), Some("abc123"));
        assert_eq!(h.states(), vec![AuthState::Checking, AuthState::Authenticated]);
    }

    #[tokio::test]
    async fn test_initialize_with_rejected_token_erases_session() {
        let h = Harness::new();
        h.store_session("expired");
        h.mock.respond(json!({"result": 5, "desc": "Session does not exist"}));
        let mut manager = h.manager();

        assert!(!manager.initialize().await);

        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert_eq!(h.store.get(CURRENT_USER_KEY).unwrap(), None);
        assert_eq!(h.store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(manager.current_user(), None);
        assert_eq!(h.states(), vec![AuthState::Checking, AuthState::Unauthenticated]);
    }

    #[tokio::test]
    async fn test_initialize_with_user_but_no_token() {
        let h = Harness::new();
        UserIdentity::new("alice", "abc123").save(h.store.as_ref()).unwrap();
        let mut manager = h.manager();

        assert!(!manager.initialize().await);
        assert_eq!(h.mock.request_count(), 0);
        assert_eq!(h.store.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_initialize_discards_corrupt_user() {
        let h = Harness::new();
        h.store.set(CURRENT_USER_KEY, "{broken").unwrap();
        h.store.set(TOKEN_KEY, "abc123").unwrap();
        let mut manager = h.manager();

        assert!(!manager.initialize().await);
        assert_eq!(h.store.get(CURRENT_USER_KEY).unwrap(), None);
        assert_eq!(h.mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_restores_demo_without_network() {
        let h = Harness::new();
        UserIdentity::demo().save(h.store.as_ref()).unwrap();
        let mut manager = h.manager();

        assert!(manager.initialize().await);
        assert!(manager.is_demo());
        assert_eq!(h.mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_session_error_downgrades_manager() {
        let h = Harness::new();
        h.mock.respond(json!({"result": 0, "jsession": "abc123"}));
        h.mock.respond(json!({"result": 5, "desc": "session timeout"}));
        let mut manager = h.manager();
        manager.login("alice", "secret").await.unwrap();

        let err = manager.hls_live_address("900001", 1).await.unwrap_err();

        assert!(err.is_session_error());
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert_eq!(h.store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(h.store.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_errors_keep_session() {
        let h = Harness::new();
        h.mock.respond(json!({"result": 0, "jsession": "abc123"}));
        h.mock.fail(ApiError::NetworkFailure("timed out".to_string()));
        let mut manager = h.manager();
        manager.login("alice", "secret").await.unwrap();

        assert!(manager.vehicles().await.is_err());
        assert!(manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_current_user_rehydrates_from_storage() {
        let h = Harness::new();
        h.mock.respond(json!({"result": 0, "jsession": "abc123"}));
        let mut manager = h.manager();
        manager.login("alice", "secret").await.unwrap();

        manager.current_user = None;
        assert_eq!(manager.current_user().map(|u| u.session_token.as_str()), Some("abc123"));
    }
}
