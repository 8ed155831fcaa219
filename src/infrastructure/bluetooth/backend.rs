use crate::domain::ble::{AdapterState, ConnectedPeripheral, DiscoveredPeripheral, WriteTarget};
use crate::infrastructure::bluetooth::protocol::BleError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

/// Something the radio stack reported on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    AdapterState(AdapterState),
    Discovered(DiscoveredPeripheral),
    Disconnected(String),
}

/// The vendor BLE stack as seen by the Bluetooth service.
///
/// Peripherals are addressed by the opaque identifier reported in
/// [`BackendEvent::Discovered`].
#[async_trait]
pub trait BleBackend: Send + Sync {
    async fn adapter_state(&self) -> Result<AdapterState, BleError>;

    /// Stream of adapter, discovery and disconnect events.
    async fn events(&self) -> Result<BoxStream<'static, BackendEvent>, BleError>;

    async fn start_scan(&self, service: Uuid) -> Result<(), BleError>;

    async fn stop_scan(&self) -> Result<(), BleError>;

    /// Connects and eagerly discovers every service and characteristic.
    async fn connect(&self, id: &str) -> Result<ConnectedPeripheral, BleError>;

    async fn disconnect(&self, id: &str) -> Result<(), BleError>;

    /// Write-with-response; resolves once the peripheral acknowledged.
    async fn write(&self, id: &str, target: WriteTarget, payload: &[u8]) -> Result<(), BleError>;
}
