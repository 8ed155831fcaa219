//! Modal alert
//!
//! A single message at a time; a newer message replaces the one on screen.
//! The caller disables everything else while [`show`] has a message.

use crate::domain::models::StatusMessage;
use crate::presentation::components::Components;
use crate::presentation::theme::BrutalistPalette;
use eframe::egui;

pub fn show(ctx: &egui::Context, alert: &mut Option<StatusMessage>) {
    let Some(message) = alert.as_ref() else {
        return;
    };

    // Dim the rest of the window behind the dialog.
    let screen = ctx.screen_rect();
    egui::Area::new(egui::Id::new("alert_backdrop"))
        .order(egui::Order::Middle)
        .fixed_pos(screen.min)
        .interactable(true)
        .show(ctx, |ui| {
            ui.painter()
                .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(120));
            ui.allocate_rect(screen, egui::Sense::click());
        });

    let mut dismissed = false;
    egui::Window::new("alert")
        .title_bar(false)
        .collapsible(false)
        .resizable(false)
        .order(egui::Order::Foreground)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .fixed_size(egui::vec2(320.0, 0.0))
        .show(ctx, |ui| {
            let palette = BrutalistPalette::current(ui);
            ui.vertical_centered(|ui| {
                Components::status_banner(
                    ui,
                    &message.message,
                    palette.severity(message.severity),
                    egui::Color32::BLACK,
                );
                ui.add_space(12.0);
                let ok = egui::Button::new(egui::RichText::new("OK").strong())
                    .min_size(egui::vec2(120.0, 36.0));
                if ui.add(ok).clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    dismissed = true;
                }
            });
        });

    if dismissed {
        *alert = None;
    }
}
