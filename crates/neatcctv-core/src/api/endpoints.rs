//! Vendor endpoint table. Every call is a form-encoded POST to
//! `<base_url>/<suffix>`.

pub const LOGIN: &str = "StandardApiAction_login.action";
pub const LOGOUT: &str = "StandardApiAction_logout.action";
pub const DEVICE_INFO: &str = "StandardApiAction_getDeviceInfo.action";
pub const DEVICE_IDNO: &str = "StandardApiAction_getDeviceIdno.action";
pub const DEVICE_ONLINE: &str = "StandardApiAction_deviceOnline.action";
pub const DEVICE_GPS_STATUS: &str = "StandardApiAction_deviceGpsStatus.action";
pub const HLS_LIVE_ADDRESS: &str = "StandardApiAction_getHlsLiveAddress.action";
pub const RTSP_LIVE_ADDRESS: &str = "StandardApiAction_getRtspLiveAddress.action";
pub const DEVICE_TRACK: &str = "StandardApiAction_deviceTrack.action";
pub const LATEST_POSITION: &str = "StandardApiAction_getDeviceLatestPosition.action";

/// Join a base URL and endpoint suffix, tolerating a trailing slash on the base.
pub fn url(base_url: &str, suffix: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), suffix)
}
