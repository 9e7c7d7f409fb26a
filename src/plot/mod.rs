//! Plotting engine behind `qplot`.
//!
//! ```text
//!   input files ──► table ──► figure ──► render ──► PNG / SVG / viewer
//!                 (numbers)  (series,   (plotters)
//!                            grids)
//! ```
//!
//! [`table`] turns rows into numeric cells, [`figure`] builds a
//! backend-independent description of the plot for the chosen
//! [`PlotType`](options::PlotType), and [`render`] draws that description
//! with `plotters`, either into a file or into an RGB buffer for the
//! interactive viewer.

pub mod figure;
pub mod grid;
pub mod options;
pub mod render;
pub mod style;
pub mod table;

use thiserror::Error;

pub use figure::{build_figure, Figure, Input};
pub use options::PlotOptions;

/// Errors raised while parsing plot settings or drawing a figure.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("invalid {what} {spec:?}: {reason}")]
    InvalidSpec {
        what: &'static str,
        spec: String,
        reason: String,
    },

    #[error("unknown legend location {0:?}")]
    UnknownLegendLocation(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("failed to draw chart elements: {0}")]
    Drawing(String),
}

impl PlotError {
    pub(crate) fn spec(what: &'static str, spec: &str, reason: impl Into<String>) -> Self {
        PlotError::InvalidSpec {
            what,
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// Read every input, build one figure from all of them and either save it
/// to `options.output` or open the viewer.
pub fn run(paths: &[String], options: &PlotOptions) -> anyhow::Result<()> {
    let inputs = paths
        .iter()
        .map(|path| {
            let table = table::load_table(path, &options.table)?;
            log::info!("{path}: {} data rows", table.rows.len());
            Ok(Input::new(path.clone(), table))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let figure = build_figure(&inputs, options)?;
    log::debug!("built figure with {} series", figure.series_count());

    match &options.output {
        Some(path) => {
            render::save(&figure, path)?;
            log::info!("saved plot to {}", path.display());
            Ok(())
        }
        None => crate::app::show(figure),
    }
}
