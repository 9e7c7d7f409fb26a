use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use plotters::chart::SeriesLabelPosition;

use super::table::TableOptions;
use super::PlotError;
use crate::color::Colormap;

/// Pixels per inch of rendered figures.
pub const DPI: f64 = 100.0;

/// Font size in points when `--font-size` is not given.
pub const DEFAULT_FONT_SIZE: f64 = 10.0;

// ---------------------------------------------------------------------------
// Enumerated settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PlotType {
    Bar,
    Heatmap,
    #[default]
    Line,
    Quiver,
    Scatter,
    #[value(name = "scatter3d")]
    Scatter3d,
    Surface,
    Wireframe,
}

/// Which axes hold dates instead of numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DateAxes {
    #[default]
    None,
    X,
}

/// Which axes carry error bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorBars {
    #[default]
    None,
    Y,
}

/// How tick labels of an axis are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AxisFormat {
    #[default]
    Numeric,
    Percentage,
}

impl AxisFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            AxisFormat::Numeric => format_tick(value),
            AxisFormat::Percentage => format!("{}%", (value * 100.0).round() as i64),
        }
    }
}

/// Short form of a tick value, free of floating point noise.
pub fn format_tick(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = format!("{value:.9}").parse::<f64>().unwrap_or(value);
    if rounded == 0.0 {
        "0".to_string()
    } else if rounded.abs() >= 1e7 || rounded.abs() < 1e-4 {
        format!("{rounded:e}")
    } else {
        rounded.to_string()
    }
}

/// How missing grid points of heatmaps and gradient contours are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InterpolationMethod {
    /// Bilinear on rectilinear data, inverse distance weighting otherwise.
    #[default]
    Linear,
    /// Value of the closest data point.
    Nearest,
}

// ---------------------------------------------------------------------------
// Legend placement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendLocation {
    #[default]
    Best,
    UpperRight,
    UpperLeft,
    LowerLeft,
    LowerRight,
    Right,
    CenterLeft,
    CenterRight,
    LowerCenter,
    UpperCenter,
    Center,
}

const LEGEND_NAMES: [(&str, LegendLocation); 11] = [
    ("best", LegendLocation::Best),
    ("upper right", LegendLocation::UpperRight),
    ("upper left", LegendLocation::UpperLeft),
    ("lower left", LegendLocation::LowerLeft),
    ("lower right", LegendLocation::LowerRight),
    ("right", LegendLocation::Right),
    ("center left", LegendLocation::CenterLeft),
    ("center right", LegendLocation::CenterRight),
    ("lower center", LegendLocation::LowerCenter),
    ("upper center", LegendLocation::UpperCenter),
    ("center", LegendLocation::Center),
];

/// Parse a `--legend` argument. Locations are matched case-insensitively,
/// with `_` standing for a space, or given by their numeric code (0-10);
/// `none` and `hide` turn the legend off.
pub fn parse_legend(s: &str) -> Result<Option<LegendLocation>, PlotError> {
    let name = s.trim().to_lowercase().replace('_', " ");
    if name == "none" || name == "hide" {
        return Ok(None);
    }
    if let Ok(code) = name.parse::<usize>() {
        return LEGEND_NAMES
            .get(code)
            .map(|(_, loc)| Some(*loc))
            .ok_or_else(|| PlotError::UnknownLegendLocation(s.to_string()));
    }
    LEGEND_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, loc)| Some(*loc))
        .ok_or_else(|| PlotError::UnknownLegendLocation(s.to_string()))
}

impl LegendLocation {
    pub fn position(self) -> SeriesLabelPosition {
        match self {
            LegendLocation::Best | LegendLocation::UpperRight => SeriesLabelPosition::UpperRight,
            LegendLocation::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendLocation::LowerLeft => SeriesLabelPosition::LowerLeft,
            LegendLocation::LowerRight => SeriesLabelPosition::LowerRight,
            LegendLocation::Right | LegendLocation::CenterRight => SeriesLabelPosition::MiddleRight,
            LegendLocation::CenterLeft => SeriesLabelPosition::MiddleLeft,
            LegendLocation::LowerCenter => SeriesLabelPosition::LowerMiddle,
            LegendLocation::UpperCenter => SeriesLabelPosition::UpperMiddle,
            LegendLocation::Center => SeriesLabelPosition::MiddleMiddle,
        }
    }
}

// ---------------------------------------------------------------------------
// Ranges and sizes
// ---------------------------------------------------------------------------

/// `MIN:MAX` axis limits; an empty side keeps the automatic limit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AxisRange {
    /// Override the automatic limits `auto` where this range is set.
    pub fn apply(&self, auto: (f64, f64)) -> (f64, f64) {
        let min = self.min.unwrap_or(auto.0);
        let mut max = self.max.unwrap_or(auto.1);
        if max <= min {
            max = min + 1.0;
        }
        (min, max)
    }
}

impl FromStr for AxisRange {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once(':')
            .ok_or_else(|| PlotError::spec("range", s, "expected MIN:MAX"))?;
        let bound = |part: &str| -> Result<Option<f64>, PlotError> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part.parse::<f64>()
                .map(Some)
                .map_err(|_| PlotError::spec("range", s, format!("'{part}' is not a number")))
        };
        let range = AxisRange {
            min: bound(lo)?,
            max: bound(hi)?,
        };
        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min >= max {
                return Err(PlotError::spec("range", s, "MIN must be less than MAX"));
            }
        }
        Ok(range)
    }
}

/// Split `WIDTHxHEIGHT` into its two halves.
fn split_size(s: &str, what: &'static str) -> Result<(String, String), PlotError> {
    let lower = s.trim().to_lowercase();
    let (w, h) = lower
        .split_once('x')
        .ok_or_else(|| PlotError::spec(what, s, "expected WIDTHxHEIGHT"))?;
    Ok((w.trim().to_string(), h.trim().to_string()))
}

/// Figure size in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureSize {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureSize {
    fn default() -> Self {
        FigureSize {
            width: 8.0,
            height: 6.0,
        }
    }
}

impl FigureSize {
    pub fn pixels(&self) -> (u32, u32) {
        (
            (self.width * DPI).round().max(1.0) as u32,
            (self.height * DPI).round().max(1.0) as u32,
        )
    }
}

/// Split a length into its number and the inches-per-unit factor of its
/// unit suffix, if any.
fn parse_length(part: &str, spec: &str) -> Result<(f64, Option<f64>), PlotError> {
    let (number, unit) = match part.find(|c: char| c.is_ascii_alphabetic()) {
        Some(idx) => (&part[..idx], Some(part[idx..].trim())),
        None => (part, None),
    };
    let factor = match unit {
        None => None,
        Some("in") => Some(1.0),
        Some("cm") => Some(1.0 / 2.54),
        Some("mm") => Some(1.0 / 25.4),
        Some(other) => {
            return Err(PlotError::spec("size", spec, format!("unknown unit '{other}'")));
        }
    };
    let value = number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0 && v.is_finite())
        .ok_or_else(|| PlotError::spec("size", spec, format!("'{part}' is not a positive length")))?;
    Ok((value, factor))
}

impl FromStr for FigureSize {
    type Err = PlotError;

    /// `8x6`, `20cmx15cm` or `200x150mm`; a unit given only on the height
    /// applies to both sides.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = split_size(s, "size")?;
        let (width, w_unit) = parse_length(&w, s)?;
        let (height, h_unit) = parse_length(&h, s)?;
        let h_factor = h_unit.unwrap_or(1.0);
        let w_factor = w_unit.or(h_unit).unwrap_or(1.0);
        Ok(FigureSize {
            width: width * w_factor,
            height: height * h_factor,
        })
    }
}

/// Number of grid points of interpolated heatmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize {
            width: 50,
            height: 50,
        }
    }
}

impl FromStr for GridSize {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = split_size(s, "grid size")?;
        let count = |part: &str| {
            part.parse::<usize>()
                .ok()
                .filter(|n| *n >= 2)
                .ok_or_else(|| PlotError::spec("grid size", s, format!("'{part}' is not an integer >= 2")))
        };
        Ok(GridSize {
            width: count(&w)?,
            height: count(&h)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Per-axis and overall settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AxisOptions {
    pub label: Option<String>,
    pub range: AxisRange,
    pub format: AxisFormat,
    pub tick_labels: bool,
}

impl Default for AxisOptions {
    fn default() -> Self {
        AxisOptions {
            label: None,
            range: AxisRange::default(),
            format: AxisFormat::Numeric,
            tick_labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeatmapOptions {
    pub colormap: Colormap,
    pub contours: bool,
    pub contour_labels: bool,
    pub grid_size: GridSize,
    pub interpolate: InterpolationMethod,
    pub colorbar: bool,
}

impl HeatmapOptions {
    pub fn show_contours(&self) -> bool {
        self.contours || self.contour_labels
    }
}

/// Everything `qplot` was asked to do.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub plot_type: PlotType,
    pub table: TableOptions,
    pub errorbars: ErrorBars,
    pub output: Option<PathBuf>,
    pub size: FigureSize,
    /// Font size in points.
    pub font_size: Option<f64>,
    pub legend: Option<LegendLocation>,
    pub title: Option<String>,
    pub no_title: bool,
    /// Multiplier for marker sizes and line widths.
    pub scale: f64,
    pub twin: bool,
    pub x: AxisOptions,
    pub y: AxisOptions,
    pub y2: AxisOptions,
    pub z: AxisOptions,
    pub heatmap: HeatmapOptions,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            plot_type: PlotType::default(),
            table: TableOptions::default(),
            errorbars: ErrorBars::default(),
            output: None,
            size: FigureSize::default(),
            font_size: None,
            legend: Some(LegendLocation::Best),
            title: None,
            no_title: false,
            scale: 1.0,
            twin: false,
            x: AxisOptions::default(),
            y: AxisOptions::default(),
            y2: AxisOptions::default(),
            z: AxisOptions::default(),
            heatmap: HeatmapOptions {
                colorbar: true,
                ..Default::default()
            },
        }
    }
}
