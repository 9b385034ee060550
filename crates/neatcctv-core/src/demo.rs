//! Fabricated fleet served while the session is in demo mode.
//!
//! Nothing here touches the network. Data is fixed so screens and tests
//! see the same fleet every time.

use serde_json::{json, Map, Value};

use crate::api::ApiError;
use crate::models::{Device, DeviceStatus, StreamAddress, StreamProtocol};

struct DemoVehicle {
    device_id: &'static str,
    alias: &'static str,
    status: DeviceStatus,
    lat: f64,
    lng: f64,
    speed: u32,
}

static FLEET: [DemoVehicle; 5] = [
    DemoVehicle {
        device_id: "Tracker-001",
        alias: "Vehicle 001",
        status: DeviceStatus::Online,
        lat: 37.7749,
        lng: -122.4194,
        speed: 52,
    },
    DemoVehicle {
        device_id: "Tracker-002",
        alias: "Vehicle 002",
        status: DeviceStatus::Online,
        lat: 37.7849,
        lng: -122.4094,
        speed: 38,
    },
    DemoVehicle {
        device_id: "Tracker-003",
        alias: "Vehicle 003",
        status: DeviceStatus::Offline,
        lat: 37.7649,
        lng: -122.4294,
        speed: 0,
    },
    DemoVehicle {
        device_id: "Tracker-004",
        alias: "Vehicle 004",
        status: DeviceStatus::Online,
        lat: 37.7949,
        lng: -122.3994,
        speed: 65,
    },
    DemoVehicle {
        device_id: "Tracker-005",
        alias: "Vehicle 005",
        status: DeviceStatus::Warning,
        lat: 37.7549,
        lng: -122.4394,
        speed: 42,
    },
];

fn find(device_id: &str) -> Result<(usize, &'static DemoVehicle), ApiError> {
    FLEET
        .iter()
        .enumerate()
        .find(|(_, v)| v.device_id == device_id)
        .ok_or_else(|| ApiError::VendorRejected(format!("Unknown demo device {}", device_id)))
}

fn online_flag(status: DeviceStatus) -> u8 {
    match status {
        DeviceStatus::Offline | DeviceStatus::Unknown => 0,
        DeviceStatus::Online | DeviceStatus::Warning => 1,
    }
}

fn position(vehicle: &DemoVehicle) -> Value {
    json!({
        "devIdno": vehicle.device_id,
        "lat": vehicle.lat,
        "lng": vehicle.lng,
        "speed": vehicle.speed,
    })
}

pub fn vehicles() -> Vec<Device> {
    FLEET
        .iter()
        .map(|v| {
            let mut raw = Map::new();
            raw.insert("idno".to_string(), json!(v.device_id));
            raw.insert("alias".to_string(), json!(v.alias));
            raw.insert("status".to_string(), json!(v.status.as_str()));
            Device {
                id: Some(v.device_id.to_string()),
                alias: Some(v.alias.to_string()),
                status: v.status,
                raw: Value::Object(raw),
            }
        })
        .collect()
}

pub fn online_status(device_id: &str) -> Result<Vec<Value>, ApiError> {
    let (_, vehicle) = find(device_id)?;
    Ok(vec![json!({
        "did": vehicle.device_id,
        "vid": vehicle.alias,
        "online": online_flag(vehicle.status),
    })])
}

pub fn gps_status(device_id: &str) -> Result<Vec<Value>, ApiError> {
    let (_, vehicle) = find(device_id)?;
    Ok(vec![position(vehicle)])
}

/// Two-point track: the vehicle's fixed position at both ends of the window.
pub fn track(device_id: &str, start_time: &str, end_time: &str) -> Result<Vec<Value>, ApiError> {
    let (_, vehicle) = find(device_id)?;
    Ok([start_time, end_time]
        .iter()
        .map(|time| {
            let mut point = position(vehicle);
            point["gpsTime"] = json!(time);
            point
        })
        .collect())
}

pub fn latest_position(device_id: &str) -> Result<Value, ApiError> {
    let (_, vehicle) = find(device_id)?;
    let mut payload = position(vehicle);
    payload["result"] = json!(0);
    Ok(payload)
}

pub fn live_address(
    protocol: StreamProtocol,
    device_id: &str,
    channel: u32,
) -> Result<StreamAddress, ApiError> {
    let (index, vehicle) = find(device_id)?;
    if vehicle.status == DeviceStatus::Offline {
        return Err(ApiError::VendorRejected(format!("{} is offline", vehicle.alias)));
    }

    let stream_url = match protocol {
        StreamProtocol::Hls => format!("http://sample-stream-url-{}/live/{}.m3u8", index + 1, channel),
        StreamProtocol::Rtsp => format!("rtsp://sample-stream-url-{}/{}", index + 1, channel),
    };
    let mut stream_info = json!({
        "result": 0,
        "devIdno": vehicle.device_id,
        "channelNum": channel,
    });
    stream_info[protocol.url_field()] = json!(stream_url);

    Ok(StreamAddress {
        protocol,
        stream_url,
        stream_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_listing() {
        let devices = vehicles();
        assert_eq!(devices.len(), 5);
        assert_eq!(devices[0].id.as_deref(), Some("Tracker-001"));
        assert_eq!(devices[2].status, DeviceStatus::Offline);
        assert_eq!(devices[4].display_name(), "Vehicle 005");
    }

    #[test]
    fn test_listing_round_trips_through_normalization() {
        let device = &vehicles()[4];
        let renormalized = Device::from_vendor(device.raw.clone());
        assert_eq!(&renormalized, device);
    }

    #[test]
    fn test_live_address() {
        let hls = live_address(StreamProtocol::Hls, "Tracker-002", 1).unwrap();
        assert_eq!(hls.stream_url, "http://sample-stream-url-2/live/1.m3u8");
        assert_eq!(hls.stream_info["hlsUrl"], hls.stream_url.as_str());

        let rtsp = live_address(StreamProtocol::Rtsp, "Tracker-004", 3).unwrap();
        assert_eq!(rtsp.stream_url, "rtsp://sample-stream-url-4/3");
    }

    #[test]
    fn test_offline_and_unknown_devices() {
        assert!(live_address(StreamProtocol::Hls, "Tracker-003", 1).is_err());
        assert!(online_status("Tracker-999").is_err());
        assert_eq!(online_status("Tracker-003").unwrap()[0]["online"], 0);
    }

    #[test]
    fn test_track_spans_window() {
        let points = track("Tracker-001", "2024-01-01 08:00:00", "2024-01-01 09:00:00").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1]["gpsTime"], "2024-01-01 09:00:00");
        assert_eq!(latest_position("Tracker-001").unwrap()["lat"], 37.7749);
    }
}
