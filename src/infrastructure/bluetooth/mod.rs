//! Bluetooth Module
//!
//! Provides the BLE link to the ESP32 trigger board.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │   (scan window, connect/trigger guards, adapter power)   │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │ Arc<dyn BleBackend>
//!                       ▼
//!               ┌────────────────┐
//!               │ BtleplugBackend │
//!               └───────┬────────┘
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌───────────────┐          ┌────────────────┐
//! │    Scanner    │          │   Connection   │
//! │ - event map   │          │ - GATT discover│
//! │ - scan filter │          │ - write        │
//! └───────────────┘          └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Firmware UUIDs, trigger configuration and the error type
//! - [`backend`] - The radio stack seam used by the service
//! - [`platform`] - `btleplug` implementation of the seam
//! - [`scanner`] - Adapter event translation and discovery
//! - [`connection`] - Device connection, GATT discovery and writes
//! - [`service`] - Main service coordinator

pub mod backend;
pub mod connection;
pub mod platform;
pub mod protocol;
pub mod scanner;
pub mod service;

use crate::domain::ble::BleState;
use crate::domain::models::{AppEvent, BluetoothCommand, StatusMessage};
use platform::BtleplugBackend;
use protocol::TriggerConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

// Re-export main service for convenience
pub use service::BluetoothService;

/// Handle to the Bluetooth worker thread.
pub struct BluetoothWorker {
    commands: mpsc::UnboundedSender<BluetoothCommand>,
    thread: std::thread::JoinHandle<()>,
}

impl BluetoothWorker {
    /// Returns false once the worker has stopped.
    pub fn send(&self, command: BluetoothCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Stops the worker and waits for its teardown to finish.
    pub fn join(self) {
        drop(self.commands);
        if self.thread.join().is_err() {
            error!("Bluetooth worker panicked");
        }
    }
}

/// Starts the Bluetooth worker on its own thread.
///
/// The backend is opened on the worker thread. Dropping the handle stops the
/// worker, which stops any scan and disconnects first.
pub fn spawn_worker(
    config: TriggerConfig,
    events: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<BluetoothWorker> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let thread = std::thread::Builder::new()
        .name("bluetooth".to_string())
        .spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for bluetooth");

            rt.block_on(async move {
                match BtleplugBackend::new().await {
                    Ok(backend) => {
                        BluetoothService::new(Arc::new(backend), config, events)
                            .run(cmd_rx)
                            .await
                    }
                    Err(e) => {
                        error!("Failed to initialize Bluetooth: {}", e);
                        let state = BleState {
                            status: format!("Bluetooth unavailable: {e}"),
                            ..BleState::default()
                        };
                        let _ = events.send(AppEvent::Ble(state));
                        let _ = events.send(AppEvent::Alert(StatusMessage::error(format!(
                            "Bluetooth Error: {e}"
                        ))));
                    }
                }
            });
        })?;

    Ok(BluetoothWorker {
        commands: cmd_tx,
        thread,
    })
}
