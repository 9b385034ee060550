//! API client for the NeatCCTV vendor web API.
//!
//! Each public method is exactly one form-encoded POST. The vendor answers
//! HTTP 200 with a JSON body whose numeric `result` is `0` on success; any
//! other value is a rejection described by the optional `desc` field.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{
    normalize_devices, Device, LoginOutcome, StreamAddress, StreamProtocol, DEVICE_LIST_FIELDS,
};
use crate::storage::{KeyValueStore, TOKEN_KEY};

use super::endpoints;
use super::transport::{HttpTransport, ReqwestTransport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Vendor API base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "https://neatcctv.co.uk/808gps/open";

/// Camera channel requested when the caller does not pick one
pub const DEFAULT_CHANNEL: u32 = 1;

/// Vendor result code for success
const RESULT_OK: i64 = 0;

pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn KeyValueStore>,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client using the reqwest transport with default settings
    pub fn new(base_url: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(None)?;
        Ok(Self::with_transport(base_url, Arc::new(transport), store))
    }

    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            transport,
            store,
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The in-memory session token, if one has been loaded or issued.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    // ===== Session =====

    /// Exchange credentials for a vendor session token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::MissingCredentials);
        }

        let form = [
            ("account", username.to_string()),
            ("password", password.to_string()),
        ];
        let raw = self.call(endpoints::LOGIN, &form, "Login failed").await?;

        let token = raw
            .get("jsession")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidResponse("Login response has no jsession".to_string()))?;

        self.token = Some(token.clone());
        self.persist_token(&token);
        info!(username = username, "Vendor login succeeded");

        Ok(LoginOutcome { token, raw })
    }

    /// End the vendor session.
    ///
    /// Local token state is cleared whatever the vendor says; a failed
    /// request is still reported to the caller afterwards.
    pub async fn logout(&mut self) -> Result<(), ApiError> {
        if !self.is_authenticated() {
            return Ok(());
        }
        let token = self.token.clone().unwrap_or_default();

        let result = self
            .call(endpoints::LOGOUT, &[("jsession", token)], "Logout failed")
            .await;

        self.clear_session();
        if let Err(ref e) = result {
            warn!(error = %e, "Vendor logout failed, local session cleared anyway");
        }
        result.map(|_| ())
    }

    /// True if a token is held in memory or can be loaded from storage.
    /// Never touches the network.
    pub fn is_authenticated(&mut self) -> bool {
        if self.token.is_none() {
            match self.store.get(TOKEN_KEY) {
                Ok(Some(token)) if !token.is_empty() => {
                    debug!("Loaded session token from storage");
                    self.token = Some(token);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to read stored session token"),
            }
        }
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Drop the token from memory and storage without contacting the vendor.
    pub fn clear_session(&mut self) {
        self.token = None;
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove stored session token");
        }
    }

    /// Clear the session if `err` means it is no longer usable.
    /// Returns true when the caller has to log in again.
    pub fn handle_api_error(&mut self, err: &ApiError) -> bool {
        if err.is_session_error() {
            info!(error = %err, "Session no longer valid, clearing token");
            self.clear_session();
            true
        } else {
            false
        }
    }

    // ===== Devices =====

    /// Fetch the account's devices, normalized from whichever list field
    /// the vendor populated.
    pub async fn get_user_vehicles(&mut self) -> Result<Vec<Device>, ApiError> {
        let token = self.require_token()?;
        let payload = self
            .call(endpoints::DEVICE_INFO, &[("jsession", token)], "Failed to fetch devices")
            .await?;
        let devices = normalize_devices(&payload, &DEVICE_LIST_FIELDS)?;
        debug!(count = devices.len(), "Fetched vehicles");
        Ok(devices)
    }

    /// Fallback device listing via the device-number endpoint.
    pub async fn get_device_list(&mut self) -> Result<Vec<Device>, ApiError> {
        let token = self.require_token()?;
        let payload = self
            .call(endpoints::DEVICE_IDNO, &[("jsession", token)], "Failed to fetch device list")
            .await?;
        normalize_devices(&payload, &["list"])
    }

    pub async fn get_device_online_status(&mut self, device_id: &str) -> Result<Vec<Value>, ApiError> {
        let token = self.require_token()?;
        let form = [("jsession", token), ("devIdno", device_id.to_string())];
        let payload = self
            .call(endpoints::DEVICE_ONLINE, &form, "Failed to fetch device status")
            .await?;
        take_list(payload)
    }

    pub async fn get_device_gps_status(&mut self, device_id: &str) -> Result<Vec<Value>, ApiError> {
        let token = self.require_token()?;
        let form = [("jsession", token), ("devIdno", device_id.to_string())];
        let payload = self
            .call(endpoints::DEVICE_GPS_STATUS, &form, "Failed to fetch GPS data")
            .await?;
        take_list(payload)
    }

    /// Track points between `start_time` and `end_time`, passed through in
    /// the vendor's own time format.
    pub async fn get_device_track(
        &mut self,
        device_id: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let token = self.require_token()?;
        let form = [
            ("jsession", token),
            ("devIdno", device_id.to_string()),
            ("startTime", start_time.to_string()),
            ("endTime", end_time.to_string()),
        ];
        let payload = self
            .call(endpoints::DEVICE_TRACK, &form, "Failed to fetch device track")
            .await?;
        take_list(payload)
    }

    /// Latest position report. The whole vendor payload is returned.
    pub async fn get_vehicle_latest_position(&mut self, device_id: &str) -> Result<Value, ApiError> {
        let token = self.require_token()?;
        let form = [("jsession", token), ("devIdno", device_id.to_string())];
        self.call(endpoints::LATEST_POSITION, &form, "Failed to fetch latest position")
            .await
    }

    // ===== Video =====

    pub async fn get_hls_live_address(
        &mut self,
        device_id: &str,
        channel: u32,
    ) -> Result<StreamAddress, ApiError> {
        self.live_address(StreamProtocol::Hls, device_id, channel).await
    }

    pub async fn get_rtsp_live_address(
        &mut self,
        device_id: &str,
        channel: u32,
    ) -> Result<StreamAddress, ApiError> {
        self.live_address(StreamProtocol::Rtsp, device_id, channel).await
    }

    async fn live_address(
        &mut self,
        protocol: StreamProtocol,
        device_id: &str,
        channel: u32,
    ) -> Result<StreamAddress, ApiError> {
        let token = self.require_token()?;
        let (endpoint, default_error) = match protocol {
            StreamProtocol::Hls => (endpoints::HLS_LIVE_ADDRESS, "Failed to get video stream"),
            StreamProtocol::Rtsp => (endpoints::RTSP_LIVE_ADDRESS, "Failed to get RTSP stream"),
        };
        let form = [
            ("jsession", token),
            ("devIdno", device_id.to_string()),
            ("channelNum", channel.to_string()),
        ];
        let payload = self.call(endpoint, &form, default_error).await?;

        let stream_url = payload
            .get(protocol.url_field())
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::InvalidResponse(format!("{} response has no {}", protocol, protocol.url_field()))
            })?;

        Ok(StreamAddress {
            protocol,
            stream_url,
            stream_info: payload,
        })
    }

    // ===== Plumbing =====

    fn require_token(&mut self) -> Result<String, ApiError> {
        if !self.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }
        self.token.clone().ok_or(ApiError::Unauthenticated)
    }

    fn persist_token(&self, token: &str) {
        if let Err(e) = self.store.set(TOKEN_KEY, token) {
            warn!(error = %e, "Failed to persist session token");
        }
    }

    /// Issue one request and turn a vendor rejection into `VendorRejected`.
    async fn call(
        &self,
        endpoint: &str,
        form: &[(&'static str, String)],
        default_error: &str,
    ) -> Result<Value, ApiError> {
        let url = endpoints::url(&self.base_url, endpoint);
        debug!(endpoint = endpoint, "Sending vendor request");
        let payload = self.transport.post_form(&url, form).await?;
        check_result(payload, default_error)
    }
}

/// Check the vendor `result` code, passing the description through verbatim.
fn check_result(payload: Value, default_error: &str) -> Result<Value, ApiError> {
    let code = payload
        .get("result")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::InvalidResponse("Response has no result code".to_string()))?;

    if code == RESULT_OK {
        return Ok(payload);
    }

    let desc = payload
        .get("desc")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .unwrap_or(default_error);
    debug!(code = code, desc = desc, "Vendor rejected request");
    Err(ApiError::VendorRejected(desc.to_string()))
}

/// The `list` field of a success payload; absent or null reads as empty.
fn take_list(mut payload: Value) -> Result<Vec<Value>, ApiError> {
    match payload.get_mut("list").map(Value::take) {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ApiError::InvalidResponse(format!("list is not an array: {}", other))),
    }
}
