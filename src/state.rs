use std::path::Path;

use eframe::egui::TextureHandle;

use crate::plot::{render, Figure};

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// Everything the plot window shows, independent of rendering.
pub struct ViewerState {
    pub figure: Figure,

    /// Last rendering of the figure.
    pub texture: Option<TextureHandle>,

    /// Pixel size `texture` was rendered at.
    pub rendered_size: Option<[usize; 2]>,

    /// Set when the figure changed since the last rendering.
    pub dirty: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl ViewerState {
    pub fn new(figure: Figure) -> Self {
        Self {
            figure,
            texture: None,
            rendered_size: None,
            dirty: true,
            status_message: None,
        }
    }

    /// Whether the figure must be drawn again for a view of `size` pixels.
    pub fn needs_render(&self, size: [usize; 2]) -> bool {
        self.dirty || self.rendered_size != Some(size)
    }

    /// Show or hide one series.
    pub fn set_visible(&mut self, index: usize, visible: bool) {
        self.figure.set_visible(index, visible);
        self.dirty = true;
    }

    /// Save the figure as currently shown (hidden series stay hidden).
    pub fn save_to(&mut self, path: &Path) {
        match render::save(&self.figure, path) {
            Ok(()) => {
                log::info!("saved plot to {}", path.display());
                self.status_message = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to save plot: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
