use crate::domain::ble::BleState;
use crate::domain::models::{AppEvent, AuthCommand, AuthEvent, BluetoothCommand, StatusMessage};
use crate::domain::session::Session;
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::protocol::TriggerConfig;
use crate::infrastructure::bluetooth::{self, BluetoothWorker};
use crate::infrastructure::logging::{init_logger, LoggingGuard};
use crate::infrastructure::{auth, storage};
use crate::presentation::{alert, screens, theme};
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// What the screens render. Updated only from worker events.
#[derive(Debug, Default)]
pub(crate) struct ViewState {
    pub session: Option<Session>,
    pub is_loading_auth: bool,
    pub is_signing_in: bool,
    pub is_signing_out: bool,
    pub ble: BleState,
    pub alert: Option<StatusMessage>,
}

impl ViewState {
    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Ble(state) => self.ble = state,
            // Newest replaces oldest.
            AppEvent::Alert(message) => self.alert = Some(message),
            AppEvent::Auth(event) => match event {
                AuthEvent::Restored(session) => {
                    self.session = session;
                    self.is_loading_auth = false;
                }
                AuthEvent::SignedIn(session) => {
                    self.session = Some(session);
                    self.is_signing_in = false;
                }
                AuthEvent::SignInFailed => self.is_signing_in = false,
                AuthEvent::SignedOut => {
                    self.session = None;
                    self.is_signing_out = false;
                    self.ble = BleState::default();
                }
                AuthEvent::SignOutFailed => self.is_signing_out = false,
            },
        }
    }

    /// The dashboard, and with it the Bluetooth worker, only exists for a signed-in user.
    pub fn wants_bluetooth(&self) -> bool {
        !self.is_loading_auth && self.session.is_some()
    }
}

pub struct RemoteApp {
    // Services
    pub(crate) settings: SettingsService,
    pub(crate) auth_tx: Option<mpsc::UnboundedSender<AuthCommand>>,
    pub(crate) bluetooth: Option<BluetoothWorker>,
    bluetooth_failed: bool,

    // Events from the workers
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,

    // State
    pub(crate) view: ViewState,
    pub(crate) trigger_label: String,

    // UI Options
    pub(crate) is_dark_mode: bool,

    // Logging guard
    _logging_guard: Option<LoggingGuard>,
}

impl RemoteApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = SettingsService::new().expect("Failed to load settings");
        let is_dark_mode = settings.get().dark_mode;

        theme::configure_neubrutalism(&cc.egui_ctx, is_dark_mode);
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let logging_guard = init_logger(&settings.get().log_settings)
            .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
            .ok();

        info!("Starting ESP32 Remote");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut view = ViewState::default();

        let auth_tx = match Self::start_auth(&settings, events_tx.clone()) {
            Ok(auth_tx) => {
                view.is_loading_auth = auth_tx.send(AuthCommand::Restore).is_ok();
                Some(auth_tx)
            }
            Err(e) => {
                error!("Failed to start auth worker: {:#}", e);
                view.alert = Some(StatusMessage::error(format!("Authentication Error: {e}")));
                None
            }
        };

        let trigger_label = settings.get().ble.trigger_label.clone();

        Self {
            settings,
            auth_tx,
            bluetooth: None,
            bluetooth_failed: false,
            events_tx,
            events_rx,
            view,
            trigger_label,
            is_dark_mode,
            _logging_guard: logging_guard,
        }
    }

    fn start_auth(
        settings: &SettingsService,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> anyhow::Result<mpsc::UnboundedSender<AuthCommand>> {
        let storage_path = SettingsService::config_dir()?.join(storage::STORE_FILE_NAME);
        auth::spawn_worker(settings.get().oauth.clone(), storage_path, events)
    }

    pub(crate) fn sign_in(&mut self) {
        if self.view.is_signing_in {
            return;
        }
        if self.send_auth(AuthCommand::SignIn) {
            self.view.is_signing_in = true;
        }
    }

    pub(crate) fn sign_out(&mut self) {
        if self.view.is_signing_out {
            return;
        }
        if self.send_auth(AuthCommand::SignOut) {
            self.view.is_signing_out = true;
        }
    }

    fn send_auth(&mut self, command: AuthCommand) -> bool {
        let sent = self
            .auth_tx
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok());
        if !sent {
            error!("Auth worker is not running, dropping {:?}", command);
            self.view.alert = Some(StatusMessage::error(
                "Authentication Error: sign-in service is not running",
            ));
        }
        sent
    }

    pub(crate) fn send_ble(&mut self, command: BluetoothCommand) {
        match &self.bluetooth {
            Some(worker) if worker.send(command.clone()) => {}
            _ => warn!("Bluetooth worker is not running, dropping {:?}", command),
        }
    }

    /// Starts the Bluetooth worker with the dashboard and stops it with sign-out.
    fn sync_bluetooth_worker(&mut self) {
        if !self.view.wants_bluetooth() {
            if self.bluetooth.take().is_some() {
                info!("Dashboard closed, stopping Bluetooth worker");
            }
            self.bluetooth_failed = false;
            return;
        }
        if self.bluetooth.is_some() || self.bluetooth_failed {
            return;
        }

        let started = TriggerConfig::from_settings(&self.settings.get().ble)
            .map_err(anyhow::Error::from)
            .and_then(|config| bluetooth::spawn_worker(config, self.events_tx.clone()));

        match started {
            Ok(worker) => {
                self.view.ble = BleState::default();
                self.bluetooth = Some(worker);
            }
            Err(e) => {
                error!("Failed to start Bluetooth worker: {:#}", e);
                self.bluetooth_failed = true;
                self.view.ble.status = format!("Bluetooth unavailable: {e}");
                self.view.alert = Some(StatusMessage::error(format!("Bluetooth Error: {e}")));
            }
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.is_dark_mode = !self.is_dark_mode;
        theme::configure_neubrutalism(ctx, self.is_dark_mode);
        if let Err(e) = self.settings.set_dark_mode(self.is_dark_mode) {
            warn!("Failed to save theme preference: {}", e);
        }
    }
}

impl eframe::App for RemoteApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.view.apply(event);
        }
        self.sync_bluetooth_worker();

        // Workers cannot wake the UI thread; poll for their events.
        ctx.request_repaint_after(Duration::from_millis(100));

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label(egui::RichText::new("ESP32 Remote").strong());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode {
                        "☀ Light"
                    } else {
                        "🌙 Dark"
                    };
                    if ui.button(switch_icon).clicked() {
                        self.toggle_theme(ctx);
                    }
                });
            });
        });

        let modal_open = self.view.alert.is_some();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.set_max_width(520.0);
                        ui.add_space(20.0);

                        if self.view.is_loading_auth {
                            screens::loading::render(ui);
                        } else if self.view.session.is_none() {
                            screens::login::render(self, ui);
                        } else {
                            screens::dashboard::render(self, ui);
                        }

                        ui.add_space(50.0);
                    });
                });
            });
        });

        alert::show(ctx, &mut self.view.alert);
    }
}

impl Drop for RemoteApp {
    fn drop(&mut self) {
        // Give the worker the chance to stop scanning and disconnect before exit.
        if let Some(worker) = self.bluetooth.take() {
            worker.join();
        }
    }
}
