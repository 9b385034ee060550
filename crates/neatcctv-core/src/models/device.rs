use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::ApiError;

/// Fields that may carry the device array, in priority order.
pub const DEVICE_LIST_FIELDS: [&str; 3] = ["deviceInfo", "devices", "list"];

const ID_FIELDS: [&str; 4] = ["idno", "devIdno", "id", "did"];
const ALIAS_FIELDS: [&str; 4] = ["alias", "vehiIdno", "nm", "name"];
const STATUS_FIELDS: [&str; 2] = ["status", "online"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Warning,
    Unknown,
}

impl DeviceStatus {
    fn from_vendor(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(1) => DeviceStatus::Online,
                Some(0) => DeviceStatus::Offline,
                _ => DeviceStatus::Unknown,
            },
            Value::Bool(true) => DeviceStatus::Online,
            Value::Bool(false) => DeviceStatus::Offline,
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "online" | "1" => DeviceStatus::Online,
                "offline" | "0" => DeviceStatus::Offline,
                "warning" => DeviceStatus::Warning,
                _ => DeviceStatus::Unknown,
            },
            _ => DeviceStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Warning => "warning",
            DeviceStatus::Unknown => "unknown",
        }
    }
}

/// A device/vehicle as listed by the vendor.
///
/// The vendor entry is kept untouched in `raw`; `id`, `alias` and `status`
/// are read from whichever of the known field names is present. Some
/// accounts list bare device numbers instead of objects; those become the
/// `id` with no alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Device {
    pub id: Option<String>,
    pub alias: Option<String>,
    pub status: DeviceStatus,
    #[cfg_attr(feature = "ts", ts(type = "unknown"))]
    pub raw: Value,
}

impl Device {
    pub fn from_vendor(raw: Value) -> Self {
        let (id, alias, status) = match &raw {
            Value::Object(map) => (
                first_present(map, &ID_FIELDS).and_then(scalar_to_string),
                first_present(map, &ALIAS_FIELDS).and_then(scalar_to_string),
                first_present(map, &STATUS_FIELDS)
                    .map(DeviceStatus::from_vendor)
                    .unwrap_or(DeviceStatus::Unknown),
            ),
            other => (scalar_to_string(other), None, DeviceStatus::Unknown),
        };

        Self { id, alias, status, raw }
    }

    /// Alias if the vendor supplied one, otherwise the identifier.
    pub fn display_name(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("Unknown device")
    }
}

/// Pull the device array out of a vendor payload and normalize each entry.
///
/// The first of `fields` that is present and not `null` wins, even when it
/// is an empty array. No candidate at all yields an empty list.
pub fn normalize_devices(payload: &Value, fields: &[&str]) -> Result<Vec<Device>, ApiError> {
    let Some(list) = fields
        .iter()
        .filter_map(|field| payload.get(*field))
        .find(|value| !value.is_null())
    else {
        return Ok(vec![]);
    };

    match list {
        Value::Array(items) => Ok(items.iter().cloned().map(Device::from_vendor).collect()),
        other => Err(ApiError::InvalidResponse(format!(
            "Device list is not an array: {}",
            other
        ))),
    }
}

fn first_present<'a>(map: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| map.get(*field))
        .find(|value| !value.is_null())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_only_payload_is_preserved_in_order() {
        let payload = json!({
            "result": 0,
            "list": [
                {"devIdno": "900001", "vehiIdno": "Van 1", "online": 1},
                {"devIdno": "900002", "vehiIdno": "Van 2", "online": 0},
                {"devIdno": 900003}
            ]
        });

        let devices = normalize_devices(&payload, &DEVICE_LIST_FIELDS).unwrap();
        let expected: Vec<Value> = payload["list"].as_array().unwrap().clone();

        assert_eq!(devices.len(), 3);
        for (device, original) in devices.iter().zip(expected.iter()) {
            assert_eq!(&device.raw, original);
        }
        assert_eq!(devices[0].id.as_deref(), Some("900001"));
        assert_eq!(devices[0].alias.as_deref(), Some("Van 1"));
        assert_eq!(devices[0].status, DeviceStatus::Online);
        assert_eq!(devices[1].status, DeviceStatus::Offline);
        assert_eq!(devices[2].id.as_deref(), Some("900003"));
        assert_eq!(devices[2].status, DeviceStatus::Unknown);
    }

    #[test]
    fn test_field_priority() {
        let payload = json!({
            "deviceInfo": [{"idno": "A"}],
            "devices": [{"idno": "B"}],
            "list": [{"idno": "C"}]
        });
        let devices = normalize_devices(&payload, &DEVICE_LIST_FIELDS).unwrap();
        assert_eq!(devices[0].id.as_deref(), Some("A"));

        let payload = json!({ "devices": [{"idno": "B"}], "list": [{"idno": "C"}] });
        let devices = normalize_devices(&payload, &DEVICE_LIST_FIELDS).unwrap();
        assert_eq!(devices[0].id.as_deref(), Some("B"));
    }

    #[test]
    fn test_null_falls_through_but_empty_array_wins() {
        let payload = json!({ "deviceInfo": null, "list": [{"idno": "C"}] });
        let devices = normalize_devices(&payload, &DEVICE_LIST_FIELDS).unwrap();
        assert_eq!(devices.len(), 1);

        let payload = json!({ "deviceInfo": [], "list": [{"idno": "C"}] });
        let devices = normalize_devices(&payload, &DEVICE_LIST_FIELDS).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_missing_list_is_empty() {
        let devices = normalize_devices(&json!({"result": 0}), &DEVICE_LIST_FIELDS).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_non_array_list_is_invalid() {
        let err = normalize_devices(&json!({"list": {"idno": "A"}}), &DEVICE_LIST_FIELDS)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_scalar_entries_are_kept() {
        let payload = json!({
            "result": 0,
            "list": ["900001", 900002, {"idno": "A", "nm": "Bus"}, null]
        });

        let devices = normalize_devices(&payload, &DEVICE_LIST_FIELDS).unwrap();

        assert_eq!(devices.len(), 4);
        assert_eq!(devices[0].id.as_deref(), Some("900001"));
        assert_eq!(devices[0].raw, json!("900001"));
        assert_eq!(devices[0].display_name(), "900001");
        assert_eq!(devices[1].id.as_deref(), Some("900002"));
        assert_eq!(devices[1].status, DeviceStatus::Unknown);
        assert_eq!(devices[2].display_name(), "Bus");
        assert_eq!(devices[3].id, None);
        assert_eq!(devices[3].raw, Value::Null);
        assert_eq!(devices[3].display_name(), "Unknown device");
    }

    #[test]
    fn test_status_strings() {
        let device = Device::from_vendor(json!({"idno": "T1", "status": "warning"}));
        assert_eq!(device.status, DeviceStatus::Warning);
        assert_eq!(device.display_name(), "T1");
    }
}
