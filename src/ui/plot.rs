use eframe::egui::{self, load::SizedTexture, ColorImage, TextureOptions, Ui};

use crate::plot::render;
use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Figure view (central panel)
// ---------------------------------------------------------------------------

/// Show the figure scaled to the panel, drawing it again after a resize
/// or a change of visible series.
pub fn figure_view(ui: &mut Ui, state: &mut ViewerState) {
    let available = ui.available_size();
    let ppp = ui.ctx().pixels_per_point();
    let size = [
        (available.x * ppp).round().max(1.0) as usize,
        (available.y * ppp).round().max(1.0) as usize,
    ];

    if state.needs_render(size) {
        match render::render_rgb(&state.figure, (size[0] as u32, size[1] as u32)) {
            Ok(rgb) => {
                let image = ColorImage::from_rgb(size, &rgb);
                state.texture = Some(ui.ctx().load_texture("figure", image, TextureOptions::LINEAR));
            }
            Err(e) => {
                log::error!("Failed to draw plot: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
        state.rendered_size = Some(size);
        state.dirty = false;
    }

    match &state.texture {
        Some(texture) => {
            ui.add(egui::Image::new(SizedTexture::new(texture.id(), available)));
        }
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Nothing to show");
            });
        }
    }
}
