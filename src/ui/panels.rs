use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Left side panel – series toggles
// ---------------------------------------------------------------------------

/// Render the left panel with one checkbox per series.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ui.heading("Series");
    ui.separator();

    let entries: Vec<(String, Color32, bool)> = state
        .figure
        .series()
        .iter()
        .enumerate()
        .map(|(idx, series)| {
            let c = series.style.color;
            let label = series
                .label
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| format!("series {}", idx + 1));
            (label, Color32::from_rgb(c.red, c.green, c.blue), series.visible)
        })
        .collect();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    (0..entries.len()).for_each(|idx| state.set_visible(idx, true));
                }
                if ui.small_button("None").clicked() {
                    (0..entries.len()).for_each(|idx| state.set_visible(idx, false));
                }
            });

            for (idx, (label, color, visible)) in entries.iter().enumerate() {
                let mut checked = *visible;
                let text = RichText::new(format!("■ {label}")).color(*color);
                if ui.checkbox(&mut checked, text).changed() {
                    state.set_visible(idx, checked);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Save as…").clicked() {
                save_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        let total = state.figure.series_count();
        if total > 0 {
            let shown = state.figure.series().iter().filter(|s| s.visible).count();
            ui.label(format!("{total} series, {shown} shown"));
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn save_file_dialog(state: &mut ViewerState) {
    let file = rfd::FileDialog::new()
        .set_title("Save plot")
        .set_file_name("plot.png")
        .add_filter("PNG image", &["png"])
        .add_filter("SVG image", &["svg"])
        .add_filter("JPEG image", &["jpg", "jpeg"])
        .save_file();

    if let Some(path) = file {
        state.save_to(&path);
    }
}
