//! BLE orchestration state
//!
//! Pure bookkeeping for the scan → connect → trigger lifecycle. The Bluetooth
//! service performs the actual I/O; before each operation it asks this state
//! whether the operation may start, and afterwards records how it ended.
//!
//! ```text
//! idle ──scan──▶ scanning ──timeout──▶ idle
//!                   │
//!                connect
//!                   ▼
//!              connecting ──ok──▶ connected ──trigger──▶ triggering
//!                   │                 ▲  │                    │
//!                 error               │  └──disconnect──▶ idle │
//!                   ▼                 └────────done───────────┘
//!                 idle
//! ```

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Power state of the local Bluetooth adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterState {
    #[default]
    Unknown,
    PoweredOn,
    PoweredOff,
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AdapterState::Unknown => "Unknown",
            AdapterState::PoweredOn => "PoweredOn",
            AdapterState::PoweredOff => "PoweredOff",
        };
        f.write_str(text)
    }
}

/// A peripheral seen during the current scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeripheral {
    pub id: String,
    pub name: Option<String>,
    pub services: Vec<Uuid>,
    pub rssi: Option<i16>,
}

impl DiscoveredPeripheral {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }

    pub fn advertises(&self, service: &Uuid) -> bool {
        self.services.contains(service)
    }
}

/// One GATT service and the characteristics discovered under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedPeripheral {
    pub id: String,
    pub name: Option<String>,
    pub services: Vec<GattService>,
}

impl ConnectedPeripheral {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Finds the characteristic to write, service first.
    pub fn locate(&self, service: Uuid, characteristic: Uuid) -> Result<WriteTarget, LookupError> {
        let found = self
            .services
            .iter()
            .find(|s| s.uuid == service)
            .ok_or(LookupError::ServiceNotFound(service))?;

        if !found.characteristics.contains(&characteristic) {
            return Err(LookupError::CharacteristicNotFound(characteristic));
        }

        Ok(WriteTarget {
            service,
            characteristic,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTarget {
    pub service: Uuid,
    pub characteristic: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Service with UUID {0} not found.")]
    ServiceNotFound(Uuid),
    #[error("Characteristic with UUID {0} not found.")]
    CharacteristicNotFound(Uuid),
}

/// Why an operation was refused without being attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Already scanning!")]
    AlreadyScanning,
    #[error("Please enable Bluetooth.")]
    AdapterNotReady(AdapterState),
    #[error("Disconnect from the current device before scanning.")]
    PeripheralBusy,
    #[error("A connection attempt is already in progress.")]
    ConnectInFlight,
    #[error("Already connected to {0}.")]
    AlreadyConnected(String),
    #[error("No device connected. Please connect to an ESP32 first!")]
    NotConnected,
    #[error("A trigger is already in progress.")]
    TriggerInFlight,
}

impl Rejection {
    /// In-flight refusals are only logged; the buttons are disabled anyway.
    pub fn notifies_user(&self) -> bool {
        !matches!(self, Rejection::ConnectInFlight | Rejection::TriggerInFlight)
    }
}

/// What a change of adapter power means for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterChange {
    Unchanged,
    PoweredOn { may_scan: bool },
    PoweredOff { dropped: Option<ConnectedPeripheral> },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleState {
    pub adapter: AdapterState,
    pub scanning: bool,
    pub discovered: Vec<DiscoveredPeripheral>,
    /// Identifier of the peripheral a connect is in flight for.
    pub connecting: Option<String>,
    pub connected: Option<ConnectedPeripheral>,
    pub triggering: bool,
    /// Human readable status line shown on the dashboard.
    pub status: String,
}

impl Default for BleState {
    fn default() -> Self {
        Self {
            adapter: AdapterState::Unknown,
            scanning: false,
            discovered: Vec::new(),
            connecting: None,
            connected: None,
            triggering: false,
            status: "Initializing Bluetooth...".to_string(),
        }
    }
}

impl BleState {
    pub fn begin_scan(&mut self) -> Result<(), Rejection> {
        if self.scanning {
            return Err(Rejection::AlreadyScanning);
        }
        if self.adapter != AdapterState::PoweredOn {
            self.status = "Bluetooth is off.".to_string();
            return Err(Rejection::AdapterNotReady(self.adapter));
        }
        if self.connected.is_some() || self.connecting.is_some() {
            return Err(Rejection::PeripheralBusy);
        }

        self.discovered.clear();
        self.scanning = true;
        self.status = "Scanning for ESP32 devices...".to_string();
        Ok(())
    }

    /// Records an advertisement. Returns true when a new entry was added.
    pub fn record_discovery(&mut self, peripheral: DiscoveredPeripheral, service: &Uuid) -> bool {
        if !self.scanning || !peripheral.advertises(service) {
            return false;
        }

        if let Some(existing) = self.discovered.iter_mut().find(|d| d.id == peripheral.id) {
            existing.rssi = peripheral.rssi.or(existing.rssi);
            if existing.name.is_none() {
                existing.name = peripheral.name;
            }
            return false;
        }

        self.discovered.push(peripheral);
        true
    }

    /// Ends the scan window. Returns false if no scan was running.
    pub fn finish_scan(&mut self, status: impl Into<String>) -> bool {
        if !self.scanning {
            return false;
        }
        self.scanning = false;
        self.status = status.into();
        true
    }

    pub fn scan_failed(&mut self, reason: &str) {
        self.scanning = false;
        self.status = format!("Scan Error: {reason}");
    }

    /// Marks a connect as in flight. Returns whether a scan must be stopped first.
    pub fn begin_connect(&mut self, id: &str) -> Result<bool, Rejection> {
        if self.connecting.is_some() {
            return Err(Rejection::ConnectInFlight);
        }
        if let Some(connected) = &self.connected {
            return Err(Rejection::AlreadyConnected(
                connected.display_name().to_string(),
            ));
        }

        let stop_scan = std::mem::take(&mut self.scanning);
        let label = self
            .discovered
            .iter()
            .find(|d| d.id == id)
            .and_then(|d| d.name.clone())
            .unwrap_or_else(|| id.to_string());

        self.connecting = Some(id.to_string());
        self.status = format!("Connecting to {label}...");
        Ok(stop_scan)
    }

    pub fn finish_connect(&mut self, outcome: Result<ConnectedPeripheral, String>) {
        self.connecting = None;
        match outcome {
            Ok(peripheral) => {
                self.status = format!("Connected to {}", peripheral.display_name());
                self.connected = Some(peripheral);
            }
            Err(reason) => {
                self.status = format!("Connection Failed: {reason}");
                self.connected = None;
            }
        }
    }

    /// Identifier of the connected peripheral, for a disconnect request.
    pub fn begin_disconnect(&mut self) -> Option<String> {
        let connected = self.connected.as_ref()?;
        let id = connected.id.clone();
        self.status = format!("Disconnecting from {}...", connected.display_name());
        Some(id)
    }

    pub fn finish_disconnect(&mut self, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => {
                self.connected = None;
                self.status = "Disconnected. Ready to scan.".to_string();
            }
            Err(reason) => {
                self.status = format!("Disconnection Failed: {reason}");
            }
        }
    }

    /// The link to `id` dropped without being asked to. Returns true if it was ours.
    pub fn peripheral_lost(&mut self, id: &str) -> bool {
        match &self.connected {
            Some(connected) if connected.id == id => {
                self.connected = None;
                self.status = "Disconnected. Ready to scan.".to_string();
                true
            }
            _ => false,
        }
    }

    pub fn begin_trigger(&mut self, label: &str) -> Result<ConnectedPeripheral, Rejection> {
        let connected = self.connected.clone().ok_or(Rejection::NotConnected)?;
        if self.triggering {
            return Err(Rejection::TriggerInFlight);
        }

        self.triggering = true;
        self.status = format!("Triggering {label} on {}...", connected.display_name());
        Ok(connected)
    }

    pub fn finish_trigger(&mut self, label: &str, target: &str, outcome: Result<(), String>) {
        self.triggering = false;
        self.status = match outcome {
            Ok(()) => format!("{label} triggered successfully on {target}!"),
            Err(reason) => format!("Error triggering {label}: {reason}"),
        };
    }

    /// Clears the busy flag without touching the status line.
    pub fn abandon_trigger(&mut self) {
        self.triggering = false;
    }

    pub fn apply_adapter_state(&mut self, state: AdapterState) -> AdapterChange {
        if self.adapter == state {
            return AdapterChange::Unchanged;
        }
        self.adapter = state;

        match state {
            AdapterState::PoweredOn => {
                self.status = "Bluetooth ON. Ready to scan.".to_string();
                AdapterChange::PoweredOn {
                    may_scan: !self.scanning
                        && self.connected.is_none()
                        && self.connecting.is_none(),
                }
            }
            AdapterState::PoweredOff => {
                self.scanning = false;
                self.discovered.clear();
                self.status = format!("Bluetooth: {state}");
                AdapterChange::PoweredOff {
                    dropped: self.connected.take(),
                }
            }
            AdapterState::Unknown => {
                self.status = format!("Bluetooth: {state}");
                AdapterChange::Other
            }
        }
    }
}
