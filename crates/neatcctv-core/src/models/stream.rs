use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Live-video protocols the vendor can resolve an address for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    Hls,
    Rtsp,
}

impl StreamProtocol {
    /// Field of the vendor payload carrying the URL.
    pub fn url_field(&self) -> &'static str {
        match self {
            StreamProtocol::Hls => "hlsUrl",
            StreamProtocol::Rtsp => "rtspUrl",
        }
    }
}

impl fmt::Display for StreamProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamProtocol::Hls => write!(f, "HLS"),
            StreamProtocol::Rtsp => write!(f, "RTSP"),
        }
    }
}

/// A time-limited live stream URL and the payload it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StreamAddress {
    pub protocol: StreamProtocol,
    pub stream_url: String,
    #[cfg_attr(feature = "ts", ts(type = "unknown"))]
    pub stream_info: Value,
}

/// Result of a vendor login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub token: String,
    pub raw: Value,
}
