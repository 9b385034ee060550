//! Records exchanged with the vendor API.
//!
//! - `Device`, `DeviceStatus`: normalized device/vehicle listing entries
//! - `StreamAddress`, `StreamProtocol`: resolved live-video URLs
//! - `LoginOutcome`: token and raw payload from a successful login

pub mod device;
pub mod stream;

pub use device::{normalize_devices, Device, DeviceStatus, DEVICE_LIST_FIELDS};
pub use stream::{LoginOutcome, StreamAddress, StreamProtocol};
