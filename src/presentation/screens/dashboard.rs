use crate::domain::ble::{BleState, ConnectedPeripheral, DiscoveredPeripheral};
use crate::domain::models::BluetoothCommand;
use crate::presentation::app::RemoteApp;
use crate::presentation::components::Components;
use crate::presentation::theme::BrutalistPalette;
use eframe::egui;

pub fn render(app: &mut RemoteApp, ui: &mut egui::Ui) {
    ui_header(app, ui);
    ui.add_space(15.0);

    ui_devices_panel(app, ui);
}

fn ui_header(app: &mut RemoteApp, ui: &mut egui::Ui) {
    let Some(session) = app.view.session.clone() else {
        return;
    };

    ui.horizontal(|ui| {
        if let Some(photo_url) = session.photo_url.as_deref() {
            ui.add(
                egui::Image::new(photo_url)
                    .fit_to_exact_size(egui::vec2(44.0, 44.0))
                    .rounding(22.0),
            );
        }
        ui.add(
            egui::Label::new(
                egui::RichText::new(format!("Welcome, {}!", session.display_name()))
                    .size(20.0)
                    .strong(),
            )
            .truncate(),
        );

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let sign_out = egui::Button::new("⎋ Sign Out");
            if ui.add_enabled(!app.view.is_signing_out, sign_out).clicked() {
                app.sign_out();
            }
        });
    });

    if session.is_degraded() {
        Components::caption(ui, "Signed in without profile details.");
    }
}

fn ui_devices_panel(app: &mut RemoteApp, ui: &mut egui::Ui) {
    let state = app.view.ble.clone();
    let palette = BrutalistPalette::current(ui);

    Components::brutalist_card(ui, "Bluetooth Devices", |ui| {
        Components::status_banner(ui, &state.status, palette.accent_cyan, egui::Color32::BLACK);
        ui.add_space(10.0);

        match &state.connected {
            None => ui_scan_results(app, ui, &state, &palette),
            Some(connected) => ui_connected(app, ui, &state, connected, &palette),
        }
    });
}

fn ui_scan_results(
    app: &mut RemoteApp,
    ui: &mut egui::Ui,
    state: &BleState,
    palette: &BrutalistPalette,
) {
    let scan = Components::action_button(
        ui,
        "Scan for ESP32 Devices",
        "Scanning...",
        state.scanning,
        palette.accent_blue,
    );
    if scan.clicked() {
        app.send_ble(BluetoothCommand::StartScan);
    }

    ui.add_space(10.0);
    Components::sub_heading(ui, "Found Devices:");

    if state.discovered.is_empty() {
        let hint = if state.scanning {
            "Searching..."
        } else {
            "No devices found. Tap Scan to retry."
        };
        Components::caption(ui, hint);
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("scan_results")
        .max_height(260.0)
        .show(ui, |ui| {
            for device in &state.discovered {
                if device_row(ui, device, state) {
                    app.send_ble(BluetoothCommand::Connect(device.id.clone()));
                }
            }
        });
}

/// Returns true when the row was clicked while it was enabled.
fn device_row(ui: &mut egui::Ui, device: &DiscoveredPeripheral, state: &BleState) -> bool {
    let enabled = state.connecting.is_none();
    let is_target = state.connecting.as_deref() == Some(device.id.as_str());

    ui.add_enabled_ui(enabled, |ui| {
        let frame = egui::Frame::none()
            .stroke(ui.style().visuals.widgets.inactive.bg_stroke)
            .fill(ui.style().visuals.widgets.inactive.bg_fill)
            .inner_margin(egui::Margin::symmetric(12.0, 8.0))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.label(egui::RichText::new(device.display_name()).strong());
                        Components::caption(ui, &device.id);
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if is_target {
                            ui.spinner();
                        } else if let Some(rssi) = device.rssi {
                            Components::caption(ui, &format!("{rssi} dBm"));
                        }
                    });
                });
            });

        let response = frame.response.interact(egui::Sense::click());
        enabled && response.clicked()
    })
    .inner
}

fn ui_connected(
    app: &mut RemoteApp,
    ui: &mut egui::Ui,
    state: &BleState,
    connected: &ConnectedPeripheral,
    palette: &BrutalistPalette,
) {
    ui.label(
        egui::RichText::new(format!("Connected to: {}", connected.display_name()))
            .size(17.0)
            .strong(),
    );
    ui.add_space(10.0);

    let trigger_text = format!("⚡ TRIGGER {}", app.trigger_label.to_uppercase());
    let trigger = Components::action_button(
        ui,
        &trigger_text,
        "Triggering...",
        state.triggering,
        palette.accent_red,
    );
    if trigger.clicked() {
        app.send_ble(BluetoothCommand::Trigger);
    }

    ui.add_space(6.0);
    let disconnect = egui::Button::new("Disconnect").min_size(egui::vec2(ui.available_width(), 36.0));
    if ui.add(disconnect).clicked() {
        app.send_ble(BluetoothCommand::Disconnect);
    }
}
