use crate::presentation::theme::BrutalistPalette;
use eframe::egui;

pub struct Components;

impl Components {
    pub fn heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).heading().strong());
    }

    pub fn sub_heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).size(17.0).strong());
    }

    pub fn brutalist_card<R>(
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let bg = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(15.0))
            .stroke(stroke)
            .fill(bg)
            .shadow(egui::Shadow {
                offset: egui::vec2(6.0, 6.0),
                blur: 0.0,
                spread: 0.0,
                color: stroke.color,
            })
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(title).strong().size(18.0));
                    ui.add_space(8.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    pub fn status_banner(
        ui: &mut egui::Ui,
        text: &str,
        bg_color: egui::Color32,
        text_color: egui::Color32,
    ) {
        egui::Frame::none()
            .fill(bg_color)
            .stroke(ui.style().visuals.widgets.noninteractive.bg_stroke)
            .inner_margin(egui::Margin::symmetric(10.0, 8.0))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(text)
                            .color(text_color)
                            .size(15.0)
                            .strong(),
                    )
                    .wrap(),
                );
            });
    }

    /// Full-width filled button. While `busy` it is disabled and shows a
    /// spinner next to `busy_text`.
    pub fn action_button(
        ui: &mut egui::Ui,
        text: &str,
        busy_text: &str,
        busy: bool,
        fill: egui::Color32,
    ) -> egui::Response {
        let label = if busy { busy_text } else { text };
        let button = egui::Button::new(
            egui::RichText::new(label)
                .strong()
                .color(egui::Color32::BLACK),
        )
        .fill(fill)
        .min_size(egui::vec2(ui.available_width(), 44.0));

        let response = ui.add_enabled(!busy, button);
        if busy {
            let center = response.rect.left_center() + egui::vec2(24.0, 0.0);
            let rect = egui::Rect::from_center_size(center, egui::vec2(18.0, 18.0));
            ui.put(rect, egui::Spinner::new().size(18.0));
        }
        response
    }

    /// Secondary text under headings and in footers.
    pub fn caption(ui: &mut egui::Ui, text: &str) {
        let palette = BrutalistPalette::current(ui);
        ui.label(egui::RichText::new(text).color(palette.muted).small());
    }
}
