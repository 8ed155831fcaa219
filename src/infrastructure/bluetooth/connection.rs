//! BLE Connection Module
//!
//! Connects to a peripheral, discovers its GATT table and performs the
//! trigger write.

use crate::domain::ble::{ConnectedPeripheral, GattService, LookupError, WriteTarget};
use crate::infrastructure::bluetooth::protocol::BleError;
use btleplug::api::{Peripheral as _, Service, WriteType};
use btleplug::platform::Peripheral;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Connects (if needed) and discovers every service and characteristic.
pub async fn connect(peripheral: &Peripheral) -> Result<ConnectedPeripheral, BleError> {
    let id = peripheral.id().to_string();
    info!("Connecting to Bluetooth device {}", id);

    if !peripheral.is_connected().await? {
        peripheral.connect().await?;
    }

    if let Err(e) = peripheral.discover_services().await {
        warn!("Service discovery failed on {}: {}", id, e);
        if let Err(e) = peripheral.disconnect().await {
            debug!("Disconnect after failed discovery on {} failed: {}", id, e);
        }
        return Err(e.into());
    }

    let name = peripheral
        .properties()
        .await?
        .and_then(|props| props.local_name);
    let services = gatt_table(&peripheral.services());
    info!(
        id = %id,
        name = ?name,
        services = services.len(),
        "Device connected"
    );

    Ok(ConnectedPeripheral { id, name, services })
}

fn gatt_table(services: &BTreeSet<Service>) -> Vec<GattService> {
    services
        .iter()
        .map(|service| GattService {
            uuid: service.uuid,
            characteristics: service.characteristics.iter().map(|c| c.uuid).collect(),
        })
        .collect()
}

pub async fn write(
    peripheral: &Peripheral,
    target: WriteTarget,
    payload: &[u8],
) -> Result<(), BleError> {
    let characteristic = peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == target.characteristic && c.service_uuid == target.service)
        .ok_or(LookupError::CharacteristicNotFound(target.characteristic))?;

    peripheral
        .write(&characteristic, payload, WriteType::WithResponse)
        .await?;
    info!("Wrote {:02X?} to {}", payload, target.characteristic);
    Ok(())
}

pub async fn disconnect(peripheral: &Peripheral) -> Result<(), BleError> {
    peripheral.disconnect().await?;
    info!("Disconnected from device {}", peripheral.id());
    Ok(())
}
