mod domain;
mod infrastructure;
mod presentation;

use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 720.0])
            .with_min_inner_size([360.0, 480.0])
            .with_title("ESP32 Remote"),
        ..Default::default()
    };

    eframe::run_native(
        "ESP32 Remote",
        options,
        Box::new(|cc| Ok(Box::new(presentation::RemoteApp::new(cc)))),
    )
}
