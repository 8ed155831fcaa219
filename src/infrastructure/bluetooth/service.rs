//! Bluetooth Service Module
//!
//! Coordinates scanning, connecting and triggering for the ESP32. One task
//! multiplexes UI commands, backend events, in-flight operations and the scan
//! deadline, so requests that would overlap are refused instead of queued.

use crate::domain::ble::{AdapterChange, AdapterState, BleState, ConnectedPeripheral, Rejection};
use crate::domain::models::{AppEvent, BluetoothCommand, StatusMessage};
use crate::infrastructure::bluetooth::backend::{BackendEvent, BleBackend};
use crate::infrastructure::bluetooth::protocol::{BleError, TriggerConfig};
use futures::future::BoxFuture;
use futures::stream::{self, FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// An operation that finished while the service kept serving requests.
enum Completion {
    Connected {
        id: String,
        result: Result<ConnectedPeripheral, BleError>,
    },
    Triggered {
        target: String,
        result: Result<(), BleError>,
    },
}

pub struct BluetoothService {
    backend: Arc<dyn BleBackend>,
    config: TriggerConfig,
    state: BleState,
    scan_deadline: Option<Instant>,
    pending: FuturesUnordered<BoxFuture<'static, Completion>>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl BluetoothService {
    pub fn new(
        backend: Arc<dyn BleBackend>,
        config: TriggerConfig,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            backend,
            config,
            state: BleState::default(),
            scan_deadline: None,
            pending: FuturesUnordered::new(),
            events,
        }
    }

    /// Serves commands until the UI drops its sender, then tears down.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<BluetoothCommand>) {
        // Subscribe before querying so no power transition slips between the two.
        let radio = match self.backend.events().await {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to subscribe to adapter events: {}", e);
                stream::pending().boxed()
            }
        };
        let mut radio = radio.fuse();

        match self.backend.adapter_state().await {
            Ok(state) => self.apply_adapter_state(state).await,
            Err(e) => warn!("Could not query adapter state: {}", e),
        }
        if self.state.adapter != AdapterState::PoweredOn {
            self.state.status = format!(
                "Bluetooth: {}. Waiting to power on for scan.",
                self.state.adapter
            );
        }
        self.publish();

        loop {
            let deadline = self.scan_deadline;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.command(command).await,
                    None => break,
                },
                Some(event) = radio.next() => self.handle_backend_event(event).await,
                Some(done) = self.pending.next(), if !self.pending.is_empty() => {
                    self.complete(done).await
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.finish_scan().await
                }
            }
        }

        self.shutdown().await;
    }

    async fn command(&mut self, command: BluetoothCommand) {
        debug!("Bluetooth command: {:?}", command);
        match command {
            BluetoothCommand::StartScan => self.start_scan().await,
            BluetoothCommand::Connect(id) => self.connect(id).await,
            BluetoothCommand::Disconnect => self.disconnect().await,
            BluetoothCommand::Trigger => self.trigger(),
        }
    }

    async fn start_scan(&mut self) {
        if let Err(rejection) = self.state.begin_scan() {
            self.reject(rejection);
            self.publish();
            return;
        }
        self.publish();

        match self.backend.start_scan(self.config.service_uuid).await {
            Ok(()) => {
                info!(
                    "Scanning for {} for {:?}",
                    self.config.service_uuid, self.config.scan_timeout
                );
                self.scan_deadline = Some(Instant::now() + self.config.scan_timeout);
            }
            Err(e) => {
                error!("Scan error: {}", e);
                self.state.scan_failed(&e.to_string());
                self.alert(StatusMessage::error(format!("Bluetooth Scan Error: {e}")));
            }
        }
        self.publish();
    }

    async fn finish_scan(&mut self) {
        self.scan_deadline = None;
        if let Err(e) = self.backend.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }
        if self.state.finish_scan("Scan finished.") {
            info!("Scan finished with {} device(s)", self.state.discovered.len());
            self.publish();
        }
    }

    async fn connect(&mut self, id: String) {
        let stop_scan = match self.state.begin_connect(&id) {
            Ok(stop_scan) => stop_scan,
            Err(rejection) => return self.reject(rejection),
        };

        if stop_scan {
            self.scan_deadline = None;
            if let Err(e) = self.backend.stop_scan().await {
                warn!("Failed to stop scan before connecting: {}", e);
            }
        }
        self.publish();

        let backend = self.backend.clone();
        self.pending.push(
            async move {
                let result = backend.connect(&id).await;
                Completion::Connected { id, result }
            }
            .boxed(),
        );
    }

    async fn disconnect(&mut self) {
        let Some(id) = self.state.begin_disconnect() else {
            debug!("Disconnect requested with no device connected");
            return;
        };
        self.publish();

        let result = self.backend.disconnect(&id).await.map_err(|e| e.to_string());
        match &result {
            Ok(()) => self.alert(StatusMessage::info("Device disconnected.")),
            Err(reason) => {
                error!("Disconnection error: {}", reason);
                self.alert(StatusMessage::error(format!("Disconnection Failed: {reason}")));
            }
        }
        self.state.finish_disconnect(result);
        self.publish();
    }

    fn trigger(&mut self) {
        let peripheral = match self.state.begin_trigger(&self.config.label) {
            Ok(peripheral) => peripheral,
            Err(rejection) => return self.reject(rejection),
        };
        self.publish();

        let backend = self.backend.clone();
        let (service, characteristic) = (self.config.service_uuid, self.config.characteristic_uuid);
        let payload = self.config.payload;
        self.pending.push(
            async move {
                let result =
                    write_trigger(backend, &peripheral, service, characteristic, payload).await;
                Completion::Triggered {
                    target: peripheral.display_name().to_string(),
                    result,
                }
            }
            .boxed(),
        );
    }

    async fn complete(&mut self, done: Completion) {
        match done {
            Completion::Connected { id, result } => match result {
                Ok(peripheral) if self.state.adapter == AdapterState::PoweredOff => {
                    warn!("Connected to {} after the adapter powered off", id);
                    if let Err(e) = self.backend.disconnect(&peripheral.id).await {
                        debug!("Disconnect after power-off failed: {}", e);
                    }
                    self.state.finish_connect(Err("Bluetooth is off.".to_string()));
                    self.alert(StatusMessage::error("Connection Failed: Bluetooth is off."));
                }
                Ok(peripheral) => {
                    self.alert(StatusMessage::success(format!(
                        "Connected to {}",
                        peripheral.display_name()
                    )));
                    self.state.finish_connect(Ok(peripheral));
                }
                Err(e) => {
                    error!("Connection error for {}: {}", id, e);
                    self.alert(StatusMessage::error(format!("Connection Failed: {e}")));
                    self.state.finish_connect(Err(e.to_string()));
                }
            },
            Completion::Triggered { target, result }
                if self.state.adapter == AdapterState::PoweredOff =>
            {
                // The power-off notice already replaced whatever this write reports.
                debug!("Trigger on {} finished after power-off: {:?}", target, result);
                self.state.abandon_trigger();
            }
            Completion::Triggered { target, result } => {
                let label = self.config.label.clone();
                match &result {
                    Ok(()) => self.alert(StatusMessage::success(format!(
                        "{label} triggered successfully!"
                    ))),
                    Err(e) => {
                        error!("Error triggering {}: {}", label, e);
                        self.alert(StatusMessage::error(format!("Error triggering {label}: {e}")));
                    }
                }
                self.state
                    .finish_trigger(&label, &target, result.map_err(|e| e.to_string()));
            }
        }
        self.publish();
    }

    async fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::AdapterState(state) => self.apply_adapter_state(state).await,
            BackendEvent::Discovered(peripheral) => {
                let label = format!("{} ({})", peripheral.display_name(), peripheral.id);
                if self
                    .state
                    .record_discovery(peripheral, &self.config.service_uuid)
                {
                    debug!("Adding device: {}", label);
                    self.publish();
                }
            }
            BackendEvent::Disconnected(id) => {
                if self.state.peripheral_lost(&id) {
                    info!("Device {} disconnected", id);
                    self.alert(StatusMessage::info("Device disconnected."));
                    self.publish();
                }
            }
        }
    }

    async fn apply_adapter_state(&mut self, state: AdapterState) {
        match self.state.apply_adapter_state(state) {
            AdapterChange::Unchanged => return,
            AdapterChange::PoweredOn { may_scan } => {
                info!("Bluetooth adapter powered on");
                self.publish();
                if may_scan && self.config.auto_scan {
                    self.start_scan().await;
                    return;
                }
            }
            AdapterChange::PoweredOff { dropped } => {
                warn!("Bluetooth adapter powered off");
                self.scan_deadline = None;
                if let Some(peripheral) = dropped {
                    info!("Dropping connection to {}", peripheral.display_name());
                    if let Err(e) = self.backend.disconnect(&peripheral.id).await {
                        debug!("Disconnect after power-off failed: {}", e);
                    }
                }
                self.alert(StatusMessage::warning(
                    "Bluetooth is OFF. Please turn it ON to connect devices.",
                ));
            }
            AdapterChange::Other => debug!("Bluetooth adapter state: {}", state),
        }
        self.publish();
    }

    /// Best-effort: stop the scan and drop the link.
    async fn shutdown(&mut self) {
        if self.state.scanning {
            if let Err(e) = self.backend.stop_scan().await {
                warn!("Failed to stop scan on shutdown: {}", e);
            }
            self.state.finish_scan("Scan stopped.");
        }
        if let Some(peripheral) = self.state.connected.take() {
            if let Err(e) = self.backend.disconnect(&peripheral.id).await {
                warn!("Failed to disconnect {} on shutdown: {}", peripheral.id, e);
            }
        }
        info!("Bluetooth worker stopped");
    }

    fn reject(&self, rejection: Rejection) {
        if rejection.notifies_user() {
            info!("Request refused: {}", rejection);
            self.alert(StatusMessage::warning(rejection.to_string()));
        } else {
            debug!("Request refused: {}", rejection);
        }
    }

    fn alert(&self, message: StatusMessage) {
        let _ = self.events.send(AppEvent::Alert(message));
    }

    fn publish(&self) {
        let _ = self.events.send(AppEvent::Ble(self.state.clone()));
    }
}

async fn write_trigger(
    backend: Arc<dyn BleBackend>,
    peripheral: &ConnectedPeripheral,
    service: Uuid,
    characteristic: Uuid,
    payload: u8,
) -> Result<(), BleError> {
    let target = peripheral.locate(service, characteristic)?;
    backend.write(&peripheral.id, target, &[payload]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ble::{DiscoveredPeripheral, GattService, WriteTarget};
    use crate::domain::models::MessageSeverity;
    use crate::infrastructure::bluetooth::protocol::{CHARACTERISTIC_UUID, SERVICE_UUID};
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::task::JoinHandle;

    struct FakeBackend {
        adapter: AdapterState,
        gatt: Vec<GattService>,
        fail_connect: bool,
        connect_gate: Option<Arc<Notify>>,
        write_gate: Option<Arc<Notify>>,
        radio: Mutex<Option<mpsc::UnboundedReceiver<BackendEvent>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn powered(adapter: AdapterState) -> Self {
            Self {
                adapter,
                gatt: vec![GattService {
                    uuid: SERVICE_UUID,
                    characteristics: vec![CHARACTERISTIC_UUID],
                }],
                fail_connect: false,
                connect_gate: None,
                write_gate: None,
                radio: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls().iter().filter(|c| *c == call).count()
        }
    }

    #[async_trait]
    impl BleBackend for FakeBackend {
        async fn adapter_state(&self) -> Result<AdapterState, BleError> {
            Ok(self.adapter)
        }

        async fn events(&self) -> Result<BoxStream<'static, BackendEvent>, BleError> {
            let rx = self.radio.lock().unwrap().take();
            Ok(match rx {
                Some(rx) => {
                    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|e| (e, rx)) })
                        .boxed()
                }
                None => stream::pending().boxed(),
            })
        }

        async fn start_scan(&self, service: Uuid) -> Result<(), BleError> {
            assert_eq!(service, SERVICE_UUID);
            self.record("start_scan".to_string());
            Ok(())
        }

        async fn stop_scan(&self) -> Result<(), BleError> {
            self.record("stop_scan".to_string());
            Ok(())
        }

        async fn connect(&self, id: &str) -> Result<ConnectedPeripheral, BleError> {
            self.record(format!("connect:{id}"));
            if let Some(gate) = &self.connect_gate {
                gate.notified().await;
            }
            if self.fail_connect {
                return Err(BleError::UnknownPeripheral(id.to_string()));
            }
            Ok(ConnectedPeripheral {
                id: id.to_string(),
                name: Some(format!("ESP32-{id}")),
                services: self.gatt.clone(),
            })
        }

        async fn disconnect(&self, id: &str) -> Result<(), BleError> {
            self.record(format!("disconnect:{id}"));
            Ok(())
        }

        async fn write(
            &self,
            id: &str,
            target: WriteTarget,
            payload: &[u8],
        ) -> Result<(), BleError> {
            assert_eq!(target.characteristic, CHARACTERISTIC_UUID);
            self.record(format!("write:{id}:{payload:?}"));
            if let Some(gate) = &self.write_gate {
                gate.notified().await;
            }
            Ok(())
        }
    }

    struct Harness {
        commands: mpsc::UnboundedSender<BluetoothCommand>,
        radio: mpsc::UnboundedSender<BackendEvent>,
        app: mpsc::UnboundedReceiver<AppEvent>,
        backend: Arc<FakeBackend>,
        worker: JoinHandle<()>,
        state: BleState,
        alerts: Vec<StatusMessage>,
    }

    impl Harness {
        async fn start(backend: FakeBackend) -> Self {
            let (radio_tx, radio_rx) = mpsc::unbounded_channel();
            *backend.radio.lock().unwrap() = Some(radio_rx);
            let backend = Arc::new(backend);

            let (app_tx, app) = mpsc::unbounded_channel();
            let (commands, cmd_rx) = mpsc::unbounded_channel();
            let service = BluetoothService::new(backend.clone(), TriggerConfig::default(), app_tx);
            let worker = tokio::spawn(service.run(cmd_rx));

            let mut harness = Self {
                commands,
                radio: radio_tx,
                app,
                backend,
                worker,
                state: BleState::default(),
                alerts: Vec::new(),
            };
            harness.settle().await;
            harness
        }

        /// Lets the worker run until it blocks, then collects what it published.
        async fn settle(&mut self) {
            tokio::time::sleep(Duration::from_millis(1)).await;
            while let Ok(event) = self.app.try_recv() {
                match event {
                    AppEvent::Ble(state) => self.state = state,
                    AppEvent::Alert(alert) => self.alerts.push(alert),
                    AppEvent::Auth(_) => {}
                }
            }
        }

        async fn send(&mut self, command: BluetoothCommand) {
            self.commands.send(command).unwrap();
            self.settle().await;
        }

        async fn emit(&mut self, event: BackendEvent) {
            self.radio.send(event).unwrap();
            self.settle().await;
        }

        fn last_alert(&self) -> &str {
            self.alerts.last().map(|a| a.message.as_str()).unwrap_or("")
        }
    }

    fn esp32(id: &str) -> DiscoveredPeripheral {
        DiscoveredPeripheral {
            id: id.to_string(),
            name: Some(format!("ESP32-{id}")),
            services: vec![SERVICE_UUID],
            rssi: Some(-55),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn powered_adapter_starts_a_scan_that_ends_after_ten_seconds() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOn)).await;
        assert!(h.state.scanning);
        assert_eq!(h.state.status, "Scanning for ESP32 devices...");
        assert_eq!(h.backend.count("start_scan"), 1);

        tokio::time::sleep(Duration::from_secs(9)).await;
        h.settle().await;
        assert!(h.state.scanning);

        tokio::time::sleep(Duration::from_secs(1)).await;
        h.settle().await;
        assert!(!h.state.scanning);
        assert_eq!(h.state.status, "Scan finished.");
        assert_eq!(h.backend.count("stop_scan"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn discoveries_are_filtered_and_deduplicated() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOn)).await;

        h.emit(BackendEvent::Discovered(esp32("aa"))).await;
        h.emit(BackendEvent::Discovered(esp32("aa"))).await;
        let mut speaker = esp32("bb");
        speaker.services = vec![Uuid::from_u128(0x180d)];
        h.emit(BackendEvent::Discovered(speaker)).await;

        assert_eq!(h.state.discovered.len(), 1);
        assert_eq!(h.state.discovered[0].id, "aa");
    }

    #[tokio::test(start_paused = true)]
    async fn second_scan_is_rejected_not_restarted() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOn)).await;
        h.send(BluetoothCommand::StartScan).await;

        assert_eq!(h.last_alert(), "Already scanning!");
        assert_eq!(h.backend.count("start_scan"), 1);
        assert!(h.state.scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn scanning_with_adapter_off_asks_to_enable_bluetooth() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOff)).await;
        assert_eq!(
            h.last_alert(),
            "Bluetooth is OFF. Please turn it ON to connect devices."
        );

        h.send(BluetoothCommand::StartScan).await;
        assert_eq!(h.last_alert(), "Please enable Bluetooth.");
        assert_eq!(h.state.status, "Bluetooth is off.");
        assert_eq!(h.backend.count("start_scan"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn power_on_event_starts_a_scan() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::Unknown)).await;
        assert_eq!(
            h.state.status,
            "Bluetooth: Unknown. Waiting to power on for scan."
        );
        assert!(!h.state.scanning);

        h.emit(BackendEvent::AdapterState(AdapterState::PoweredOn)).await;
        assert!(h.state.scanning);
        assert_eq!(h.backend.count("start_scan"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_connect_is_rejected_while_one_is_pending() {
        let gate = Arc::new(Notify::new());
        let mut backend = FakeBackend::powered(AdapterState::PoweredOn);
        backend.connect_gate = Some(gate.clone());
        let mut h = Harness::start(backend).await;
        h.emit(BackendEvent::Discovered(esp32("aa"))).await;

        h.send(BluetoothCommand::Connect("aa".to_string())).await;
        assert!(!h.state.scanning);
        assert_eq!(h.state.connecting.as_deref(), Some("aa"));
        assert_eq!(h.state.status, "Connecting to ESP32-aa...");

        let alerts = h.alerts.len();
        h.send(BluetoothCommand::Connect("bb".to_string())).await;
        assert_eq!(h.alerts.len(), alerts);
        assert_eq!(h.backend.count("connect:bb"), 0);

        gate.notify_one();
        h.settle().await;
        assert!(h.state.connecting.is_none());
        assert_eq!(h.state.connected.as_ref().map(|c| c.id.as_str()), Some("aa"));
        assert_eq!(h.last_alert(), "Connected to ESP32-aa");
        assert_eq!(h.backend.count("stop_scan"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_resets_and_reports() {
        let mut backend = FakeBackend::powered(AdapterState::PoweredOn);
        backend.fail_connect = true;
        let mut h = Harness::start(backend).await;

        h.send(BluetoothCommand::Connect("aa".to_string())).await;
        assert!(h.state.connected.is_none());
        assert!(h.state.connecting.is_none());
        assert_eq!(
            h.last_alert(),
            "Connection Failed: Device aa is no longer available"
        );
        assert_eq!(h.alerts.last().unwrap().severity, MessageSeverity::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_writes_one_byte_and_rejects_overlap() {
        let gate = Arc::new(Notify::new());
        let mut backend = FakeBackend::powered(AdapterState::PoweredOn);
        backend.write_gate = Some(gate.clone());
        let mut h = Harness::start(backend).await;
        h.send(BluetoothCommand::Connect("aa".to_string())).await;

        h.send(BluetoothCommand::Trigger).await;
        assert!(h.state.triggering);
        h.send(BluetoothCommand::Trigger).await;
        assert_eq!(h.backend.count("write:aa:[49]"), 1);

        gate.notify_one();
        h.settle().await;
        assert!(!h.state.triggering);
        assert_eq!(h.last_alert(), "GPIO 27 triggered successfully!");
        assert_eq!(h.state.status, "GPIO 27 triggered successfully on ESP32-aa!");
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_without_connection_alerts() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOn)).await;
        h.send(BluetoothCommand::Trigger).await;

        assert_eq!(
            h.last_alert(),
            "No device connected. Please connect to an ESP32 first!"
        );
        assert!(!h.state.triggering);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_characteristic_fails_and_clears_busy_flag() {
        let mut backend = FakeBackend::powered(AdapterState::PoweredOn);
        backend.gatt[0].characteristics.clear();
        let mut h = Harness::start(backend).await;
        h.send(BluetoothCommand::Connect("aa".to_string())).await;

        h.send(BluetoothCommand::Trigger).await;
        assert!(!h.state.triggering);
        assert_eq!(
            h.last_alert(),
            "Error triggering GPIO 27: Characteristic with UUID \
             0000ffe1-0000-1000-8000-00805f9b34fb not found."
        );
        assert!(!h.backend.calls().iter().any(|c| c.starts_with("write:")));
    }

    #[tokio::test(start_paused = true)]
    async fn adapter_off_while_connected_drops_the_device() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOn)).await;
        h.send(BluetoothCommand::Connect("aa".to_string())).await;
        assert!(h.state.connected.is_some());

        h.emit(BackendEvent::AdapterState(AdapterState::PoweredOff)).await;
        assert!(h.state.connected.is_none());
        assert!(h.state.discovered.is_empty());
        assert_eq!(
            h.last_alert(),
            "Bluetooth is OFF. Please turn it ON to connect devices."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_finishing_after_power_off_keeps_the_power_off_notice() {
        let gate = Arc::new(Notify::new());
        let mut backend = FakeBackend::powered(AdapterState::PoweredOn);
        backend.write_gate = Some(gate.clone());
        let mut h = Harness::start(backend).await;
        h.send(BluetoothCommand::Connect("aa".to_string())).await;
        h.send(BluetoothCommand::Trigger).await;
        assert!(h.state.triggering);

        h.emit(BackendEvent::AdapterState(AdapterState::PoweredOff)).await;
        let alerts = h.alerts.len();

        gate.notify_one();
        h.settle().await;
        assert!(!h.state.triggering);
        assert_eq!(h.alerts.len(), alerts);
        assert_eq!(
            h.last_alert(),
            "Bluetooth is OFF. Please turn it ON to connect devices."
        );
        assert_eq!(h.state.status, "Bluetooth: PoweredOff");
    }

    #[tokio::test(start_paused = true)]
    async fn connect_finishing_after_power_off_is_torn_down() {
        let gate = Arc::new(Notify::new());
        let mut backend = FakeBackend::powered(AdapterState::PoweredOn);
        backend.connect_gate = Some(gate.clone());
        let mut h = Harness::start(backend).await;
        h.send(BluetoothCommand::Connect("aa".to_string())).await;

        h.emit(BackendEvent::AdapterState(AdapterState::PoweredOff)).await;
        gate.notify_one();
        h.settle().await;

        assert!(h.state.connected.is_none());
        assert!(h.state.connecting.is_none());
        assert_eq!(h.backend.count("disconnect:aa"), 1);
        assert_eq!(h.last_alert(), "Connection Failed: Bluetooth is off.");
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_and_link_loss_both_clear_the_device() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOn)).await;
        h.send(BluetoothCommand::Connect("aa".to_string())).await;

        h.send(BluetoothCommand::Disconnect).await;
        assert!(h.state.connected.is_none());
        assert_eq!(h.state.status, "Disconnected. Ready to scan.");
        assert_eq!(h.last_alert(), "Device disconnected.");

        // The stack echoes our own disconnect; it must not alert twice.
        let alerts = h.alerts.len();
        h.emit(BackendEvent::Disconnected("aa".to_string())).await;
        assert_eq!(h.alerts.len(), alerts);

        h.send(BluetoothCommand::Connect("aa".to_string())).await;
        h.emit(BackendEvent::Disconnected("aa".to_string())).await;
        assert!(h.state.connected.is_none());
        assert_eq!(h.last_alert(), "Device disconnected.");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_sender_disconnects() {
        let mut h = Harness::start(FakeBackend::powered(AdapterState::PoweredOn)).await;
        h.send(BluetoothCommand::Connect("aa".to_string())).await;

        let Harness {
            commands,
            worker,
            backend,
            ..
        } = h;
        drop(commands);
        worker.await.unwrap();

        assert_eq!(backend.calls().last().map(String::as_str), Some("disconnect:aa"));
    }
}
