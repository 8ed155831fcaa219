//! `btleplug` implementation of [`BleBackend`].

use crate::domain::ble::{AdapterState, ConnectedPeripheral, WriteTarget};
use crate::infrastructure::bluetooth::backend::{BackendEvent, BleBackend};
use crate::infrastructure::bluetooth::protocol::BleError;
use crate::infrastructure::bluetooth::{connection, scanner};
use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

pub struct BtleplugBackend {
    adapter: Adapter,
    peripherals: scanner::PeripheralCache,
}

impl BtleplugBackend {
    /// Opens the first Bluetooth adapter on the system.
    pub async fn new() -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BleError::NoAdapter)?;

        match adapter.adapter_info().await {
            Ok(adapter_info) => info!("BLE manager initialized on {}", adapter_info),
            Err(e) => debug!("Could not read adapter info: {}", e),
        }

        Ok(Self {
            adapter,
            peripherals: Default::default(),
        })
    }

    async fn peripheral(&self, id: &str) -> Result<Peripheral, BleError> {
        let cached = self
            .peripherals
            .lock()
            .ok()
            .and_then(|cache| cache.get(id).cloned());
        if let Some(peripheral) = cached {
            return Ok(peripheral);
        }

        let peripheral = self
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.id().to_string() == id)
            .ok_or_else(|| BleError::UnknownPeripheral(id.to_string()))?;

        if let Ok(mut cache) = self.peripherals.lock() {
            cache.insert(id.to_string(), peripheral.clone());
        }
        Ok(peripheral)
    }
}

#[async_trait]
impl BleBackend for BtleplugBackend {
    async fn adapter_state(&self) -> Result<AdapterState, BleError> {
        let state = self.adapter.adapter_state().await?;
        Ok(scanner::adapter_state(state))
    }

    async fn events(&self) -> Result<BoxStream<'static, BackendEvent>, BleError> {
        let adapter = self.adapter.clone();
        let cache = self.peripherals.clone();
        let events = self.adapter.events().await?;

        Ok(events
            .filter_map(move |event| {
                let adapter = adapter.clone();
                let cache = cache.clone();
                async move { scanner::translate(&adapter, &cache, event).await }
            })
            .boxed())
    }

    async fn start_scan(&self, service: Uuid) -> Result<(), BleError> {
        self.adapter.start_scan(scanner::scan_filter(service)).await?;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&self, id: &str) -> Result<ConnectedPeripheral, BleError> {
        let peripheral = self.peripheral(id).await?;
        connection::connect(&peripheral).await
    }

    async fn disconnect(&self, id: &str) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        connection::disconnect(&peripheral).await
    }

    async fn write(&self, id: &str, target: WriteTarget, payload: &[u8]) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        connection::write(&peripheral, target, payload).await
    }
}
