use crate::presentation::app::RemoteApp;
use crate::presentation::components::Components;
use crate::presentation::theme::BrutalistPalette;
use eframe::egui;

pub fn render(app: &mut RemoteApp, ui: &mut egui::Ui) {
    let palette = BrutalistPalette::current(ui);

    ui.add_space(60.0);
    Components::heading(ui, "Connect with ESP32");
    Components::caption(ui, "Unlock the power of your IoT devices.");
    ui.add_space(30.0);

    Components::brutalist_card(ui, "Sign in", |ui| {
        let sign_in = Components::action_button(
            ui,
            "Sign in with Google",
            "Sign in with Google",
            app.view.is_signing_in,
            palette.accent_blue,
        );
        if sign_in.clicked() {
            app.sign_in();
        }
        if app.view.is_signing_in {
            Components::caption(ui, "Finish signing in in your browser.");
        }
    });

    ui.add_space(20.0);
    Components::caption(ui, "Only authorized users can control devices.");
}
