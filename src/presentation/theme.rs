use crate::domain::models::MessageSeverity;
use eframe::egui;

pub struct BrutalistPalette {
    pub bg: egui::Color32,
    pub card: egui::Color32,
    pub fg: egui::Color32,
    pub muted: egui::Color32,
    pub stroke: egui::Color32,
    pub accent_yellow: egui::Color32,
    pub accent_green: egui::Color32,
    pub accent_cyan: egui::Color32,
    pub accent_red: egui::Color32,
    pub accent_blue: egui::Color32,
}

impl BrutalistPalette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: egui::Color32::from_rgb(25, 25, 25),
                card: egui::Color32::from_gray(35),
                fg: egui::Color32::WHITE,
                muted: egui::Color32::from_gray(170),
                stroke: egui::Color32::WHITE,
                accent_yellow: egui::Color32::from_rgb(255, 200, 0),
                accent_green: egui::Color32::from_rgb(0, 255, 127),
                accent_cyan: egui::Color32::from_rgb(0, 255, 255),
                accent_red: egui::Color32::from_rgb(255, 80, 80),
                accent_blue: egui::Color32::from_rgb(80, 140, 255),
            }
        } else {
            Self {
                bg: egui::Color32::from_rgb(245, 245, 245),
                card: egui::Color32::WHITE,
                fg: egui::Color32::BLACK,
                muted: egui::Color32::from_gray(90),
                stroke: egui::Color32::BLACK,
                accent_yellow: egui::Color32::from_rgb(255, 220, 0),
                accent_green: egui::Color32::from_rgb(0, 255, 100),
                accent_cyan: egui::Color32::from_rgb(0, 200, 255),
                accent_red: egui::Color32::from_rgb(255, 50, 50),
                accent_blue: egui::Color32::from_rgb(0, 122, 255),
            }
        }
    }

    pub fn current(ui: &egui::Ui) -> Self {
        Self::new(ui.visuals().dark_mode)
    }

    /// Banner fill for a message of the given severity.
    pub fn severity(&self, severity: MessageSeverity) -> egui::Color32 {
        match severity {
            MessageSeverity::Info => self.accent_cyan,
            MessageSeverity::Success => self.accent_green,
            MessageSeverity::Warning => self.accent_yellow,
            MessageSeverity::Error => self.accent_red,
        }
    }
}

pub fn configure_neubrutalism(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = BrutalistPalette::new(is_dark);

    style.visuals = if is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };

    // Typography
    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 26.0,
                egui::TextStyle::Body => 15.0,
                egui::TextStyle::Button => 16.0,
                egui::TextStyle::Small => 12.0,
                _ => font_id.size,
            };
        });

    // Spacing
    style.spacing.item_spacing = egui::vec2(12.0, 10.0);
    style.spacing.button_padding = egui::vec2(16.0, 10.0);
    style.spacing.interact_size.y = 36.0;

    // Visuals
    let widgets = &mut style.visuals.widgets;
    widgets.noninteractive.bg_stroke = egui::Stroke::new(2.0, palette.stroke);
    widgets.noninteractive.rounding = egui::Rounding::ZERO;
    widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    widgets.noninteractive.bg_fill = palette.card;

    widgets.inactive.bg_stroke = egui::Stroke::new(2.0, palette.stroke);
    widgets.inactive.rounding = egui::Rounding::ZERO;
    widgets.inactive.bg_fill = palette.card;
    widgets.inactive.weak_bg_fill = palette.card;
    widgets.inactive.fg_stroke = egui::Stroke::new(1.0, palette.fg);

    widgets.hovered.bg_stroke = egui::Stroke::new(2.5, palette.stroke);
    widgets.hovered.rounding = egui::Rounding::ZERO;
    widgets.hovered.bg_fill = palette.accent_yellow;
    widgets.hovered.weak_bg_fill = palette.accent_yellow;
    widgets.hovered.fg_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
    widgets.hovered.expansion = 2.0;

    widgets.active.bg_stroke = egui::Stroke::new(3.0, palette.stroke);
    widgets.active.rounding = egui::Rounding::ZERO;
    widgets.active.bg_fill = palette.accent_green;
    widgets.active.weak_bg_fill = palette.accent_green;
    widgets.active.fg_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);

    style.visuals.selection.stroke = egui::Stroke::new(1.0, palette.stroke);
    style.visuals.selection.bg_fill = palette.accent_cyan;

    // The alert window casts the hard offset shadow.
    style.visuals.window_rounding = egui::Rounding::ZERO;
    style.visuals.window_stroke = egui::Stroke::new(3.0, palette.stroke);
    style.visuals.window_shadow = egui::Shadow {
        offset: egui::vec2(8.0, 8.0),
        blur: 0.0,
        spread: 0.0,
        color: palette.stroke,
    };
    style.visuals.window_fill = palette.card;

    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
