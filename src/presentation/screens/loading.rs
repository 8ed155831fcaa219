use eframe::egui;

pub fn render(ui: &mut egui::Ui) {
    ui.add_space(120.0);
    ui.add(egui::Spinner::new().size(36.0));
    ui.add_space(10.0);
    ui.label(egui::RichText::new("Loading...").size(18.0));
}
