//! BLE Scanner Module
//!
//! Turns raw `btleplug` adapter events into [`BackendEvent`]s and remembers
//! every peripheral it reports so a later connect can find it by identifier.

use crate::domain::ble::{AdapterState, DiscoveredPeripheral};
use crate::infrastructure::bluetooth::backend::BackendEvent;
use btleplug::api::{Central, CentralEvent, CentralState, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral, PeripheralId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};
use uuid::Uuid;

/// Peripherals seen so far, keyed by their string identifier.
pub type PeripheralCache = Arc<Mutex<HashMap<String, Peripheral>>>;

/// Only peripherals advertising `service` are reported by the stack.
pub fn scan_filter(service: Uuid) -> ScanFilter {
    ScanFilter {
        services: vec![service],
    }
}

pub fn adapter_state(state: CentralState) -> AdapterState {
    match state {
        CentralState::PoweredOn => AdapterState::PoweredOn,
        CentralState::PoweredOff => AdapterState::PoweredOff,
        _ => AdapterState::Unknown,
    }
}

pub async fn translate(
    adapter: &Adapter,
    cache: &PeripheralCache,
    event: CentralEvent,
) -> Option<BackendEvent> {
    match event {
        CentralEvent::StateUpdate(state) => Some(BackendEvent::AdapterState(adapter_state(state))),
        CentralEvent::DeviceDiscovered(id)
        | CentralEvent::DeviceUpdated(id)
        | CentralEvent::ServicesAdvertisement { id, .. }
        | CentralEvent::ServiceDataAdvertisement { id, .. } => {
            discovered(adapter, cache, &id).await.map(BackendEvent::Discovered)
        }
        CentralEvent::DeviceDisconnected(id) => Some(BackendEvent::Disconnected(id.to_string())),
        other => {
            trace!("Ignoring adapter event {:?}", other);
            None
        }
    }
}

async fn discovered(
    adapter: &Adapter,
    cache: &PeripheralCache,
    id: &PeripheralId,
) -> Option<DiscoveredPeripheral> {
    let peripheral = adapter.peripheral(id).await.ok()?;
    let props = peripheral.properties().await.ok().flatten()?;

    let mut services = props.services;
    for uuid in props.service_data.keys() {
        if !services.contains(uuid) {
            services.push(*uuid);
        }
    }

    let id = id.to_string();
    debug!(
        id = %id,
        name = ?props.local_name,
        rssi = ?props.rssi,
        "Found device"
    );

    if let Ok(mut cache) = cache.lock() {
        cache.insert(id.clone(), peripheral);
    }

    Some(DiscoveredPeripheral {
        id,
        name: props.local_name,
        services,
        rssi: props.rssi,
    })
}
