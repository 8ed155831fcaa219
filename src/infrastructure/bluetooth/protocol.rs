//! ESP32 trigger protocol
//!
//! The firmware exposes one service with one writable characteristic. Writing
//! a single byte (ASCII `'1'` by default) with response pulses the GPIO pin.

use crate::domain::ble::LookupError;
use crate::domain::settings::BleSettings;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// ESP32 GPIO service UUID (the common HM-10 style `FFE0` service)
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000ffe0_0000_1000_8000_00805f9b34fb);

/// Writable trigger characteristic UUID (`FFE1`)
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x0000ffe1_0000_1000_8000_00805f9b34fb);

#[derive(Debug, Error)]
pub enum BleError {
    #[error("No Bluetooth adapter found")]
    NoAdapter,
    #[error("Device {0} is no longer available")]
    UnknownPeripheral(String),
    #[error("Invalid UUID {value:?}: {source}")]
    InvalidUuid {
        value: String,
        #[source]
        source: uuid::Error,
    },
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Btleplug(#[from] btleplug::Error),
}

pub fn parse_uuid(value: &str) -> Result<Uuid, BleError> {
    Uuid::parse_str(value.trim()).map_err(|source| BleError::InvalidUuid {
        value: value.to_string(),
        source,
    })
}

/// Validated BLE settings, as used by the Bluetooth service.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub scan_timeout: Duration,
    pub payload: u8,
    /// Name of the pin in user-facing messages, e.g. "GPIO 27".
    pub label: String,
    pub auto_scan: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            service_uuid: SERVICE_UUID,
            characteristic_uuid: CHARACTERISTIC_UUID,
            scan_timeout: Duration::from_secs(10),
            payload: b'1',
            label: "GPIO 27".to_string(),
            auto_scan: true,
        }
    }
}

impl TriggerConfig {
    pub fn from_settings(settings: &BleSettings) -> Result<Self, BleError> {
        Ok(Self {
            service_uuid: parse_uuid(&settings.service_uuid)?,
            characteristic_uuid: parse_uuid(&settings.characteristic_uuid)?,
            scan_timeout: Duration::from_secs(settings.scan_timeout_secs.max(1)),
            payload: settings.trigger_payload,
            label: settings.trigger_label.clone(),
            auto_scan: settings.auto_scan,
        })
    }
}
