use eframe::egui;

use crate::plot::Figure;
use crate::state::ViewerState;
use crate::ui::{panels, plot};

/// Room around the figure for the menu bar and the series panel.
const CHROME: [f32; 2] = [200.0, 30.0];

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ViewerApp {
    pub state: ViewerState,
}

impl ViewerApp {
    pub fn new(figure: Figure) -> Self {
        Self {
            state: ViewerState::new(figure),
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: series toggles ----
        if self.state.figure.series_count() > 0 {
            egui::SidePanel::left("series_panel")
                .default_width(CHROME[0])
                .resizable(true)
                .show(ctx, |ui| {
                    panels::side_panel(ui, &mut self.state);
                });
        }

        // ---- Central panel: the figure ----
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                plot::figure_view(ui, &mut self.state);
            });
    }
}

/// Open a window showing the figure; returns when it is closed.
pub fn show(figure: Figure) -> anyhow::Result<()> {
    let (width, height) = figure.layout.size;
    let title = figure.title.clone().unwrap_or_else(|| "qplot".to_string());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width as f32 + CHROME[0], height as f32 + CHROME[1]])
            .with_min_inner_size([320.0, 240.0]),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(ViewerApp::new(figure)))),
    )
    .map_err(|e| anyhow::anyhow!("plot window failed: {e}"))
}
