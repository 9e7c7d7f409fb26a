use super::grid::{contour_levels, contours, finite_range, interpolate, surface_grid, ContourLine, Grid};
use super::options::{AxisOptions, ErrorBars, LegendLocation, PlotOptions, PlotType, DateAxes, DEFAULT_FONT_SIZE, DPI};
use super::style::{default_fill_style, default_line_style, default_marker_style, SeriesStyle, StyleSpec};
use super::table::NumericTable;
use super::PlotError;
use crate::color::Colormap;

/// Sizes in points (1/72 inch) before `--scale` is applied.
const LINE_WIDTH: f64 = 1.0;
const MARKER_SIZE: f64 = 6.0;
const CAP_SIZE: f64 = 3.0;

/// Half the width of a bar, in row-index units.
const BAR_HALF_WIDTH: f64 = 0.4;

/// Number of contour levels aimed for.
const CONTOUR_LEVELS: usize = 7;

/// One input file after table reading.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub table: NumericTable,
}

impl Input {
    pub fn new(name: impl Into<String>, table: NumericTable) -> Self {
        Input {
            name: name.into(),
            table,
        }
    }
}

// ---------------------------------------------------------------------------
// Figure model
// ---------------------------------------------------------------------------

/// Settings shared by every plot type.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Figure size in pixels.
    pub size: (u32, u32),
    /// Font size in points.
    pub font_size: f64,
    pub scale: f64,
    pub legend: Option<LegendLocation>,
    pub x: AxisOptions,
    pub y: AxisOptions,
    pub y2: AxisOptions,
    pub z: AxisOptions,
    /// Set when X values are days since the epoch, to be printed with
    /// this format.
    pub x_date_format: Option<String>,
}

impl Layout {
    fn new(options: &PlotOptions) -> Self {
        Layout {
            size: options.size.pixels(),
            font_size: options.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            scale: options.scale,
            legend: options.legend,
            x: options.x.clone(),
            y: options.y.clone(),
            y2: options.y2.clone(),
            z: options.z.clone(),
            x_date_format: (options.table.dates == DateAxes::X)
                .then(|| options.table.date_format.clone()),
        }
    }

    fn points_to_pixels(points: f64) -> f64 {
        points * DPI / 72.0
    }

    pub fn font_px(&self) -> f64 {
        Self::points_to_pixels(self.font_size)
    }

    pub fn line_width_px(&self) -> u32 {
        Self::points_to_pixels(LINE_WIDTH * self.scale).round().max(1.0) as u32
    }

    pub fn marker_radius_px(&self) -> i32 {
        (Self::points_to_pixels(MARKER_SIZE * self.scale) / 2.0).round().max(1.0) as i32
    }

    pub fn cap_width_px(&self) -> u32 {
        (Self::points_to_pixels(CAP_SIZE * self.scale) * 2.0).round().max(1.0) as u32
    }
}

#[derive(Debug, Clone)]
pub struct Figure {
    pub title: Option<String>,
    pub layout: Layout,
    pub plot: Plot,
}

#[derive(Debug, Clone)]
pub enum Plot {
    Cartesian(Cartesian),
    Heatmap(Heatmap),
    ThreeD(ThreeD),
}

/// Series on X/Y axes: line, scatter, bar and quiver plots.
#[derive(Debug, Clone, Default)]
pub struct Cartesian {
    pub series: Vec<Series>,
    pub twin: bool,
    pub contours: Option<ContourSet>,
}

#[derive(Debug, Clone)]
pub struct ContourSet {
    pub lines: Vec<ContourLine>,
    pub labels: bool,
    /// Colour lines by level; black when `None`.
    pub colormap: Option<Colormap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YAxis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: Option<String>,
    pub style: SeriesStyle,
    pub axis: YAxis,
    pub data: SeriesData,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorBar {
    pub x: f64,
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

/// An arrow from `(x, y)` to `(x + dx, y + dy)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone)]
pub enum SeriesData {
    /// Polylines broken at missing values.
    Line {
        segments: Vec<Vec<(f64, f64)>>,
        errors: Vec<ErrorBar>,
    },
    Scatter {
        points: Vec<(f64, f64)>,
    },
    Bars {
        bars: Vec<Bar>,
        errors: Vec<ErrorBar>,
    },
    Arrows {
        arrows: Vec<Arrow>,
    },
}

#[derive(Debug, Clone)]
pub struct Heatmap {
    pub grid: Grid,
    pub colormap: Colormap,
    /// Values mapped to the ends of the colormap.
    pub z_range: (f64, f64),
    pub contours: Option<ContourSet>,
    pub colorbar: bool,
}

#[derive(Debug, Clone)]
pub struct ThreeD {
    pub colormap: Colormap,
    pub kind: ThreeDKind,
}

#[derive(Debug, Clone)]
pub enum ThreeDKind {
    Scatter(Vec<(f64, f64, f64)>),
    Surface(Grid),
    Wireframe(Grid),
}

impl Figure {
    /// Series that can be toggled in the viewer.
    pub fn series(&self) -> &[Series] {
        match &self.plot {
            Plot::Cartesian(c) => &c.series,
            _ => &[],
        }
    }

    pub fn series_count(&self) -> usize {
        self.series().len()
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) {
        if let Plot::Cartesian(c) = &mut self.plot {
            if let Some(series) = c.series.get_mut(index) {
                series.visible = visible;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Axis extents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Extent> {
        finite_range(values).map(|(min, max)| Extent { min, max })
    }

    pub fn union(a: Option<Extent>, b: Option<Extent>) -> Option<Extent> {
        match (a, b) {
            (Some(a), Some(b)) => Some(Extent {
                min: a.min.min(b.min),
                max: a.max.max(b.max),
            }),
            (a, b) => a.or(b),
        }
    }

    /// Limits with a 5% margin on both sides.
    pub fn padded(self) -> (f64, f64) {
        let span = self.max - self.min;
        let pad = if span > 0.0 {
            span * 0.05
        } else if self.min != 0.0 {
            self.min.abs() * 0.05
        } else {
            0.5
        };
        (self.min - pad, self.max + pad)
    }
}

/// Limits of the X axis and both Y axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits {
    pub x: (f64, f64),
    pub y: (f64, f64),
    pub y2: (f64, f64),
}

impl Series {
    /// Every data coordinate the series touches.
    pub fn points(&self) -> Vec<(f64, f64)> {
        let error_points = |errors: &[ErrorBar]| {
            errors
                .iter()
                .flat_map(|e| [(e.x, e.low), (e.x, e.high)])
                .collect::<Vec<_>>()
        };
        match &self.data {
            SeriesData::Line { segments, errors } => {
                let mut points: Vec<_> = segments.iter().flatten().copied().collect();
                points.extend(error_points(errors));
                points
            }
            SeriesData::Scatter { points } => points.clone(),
            SeriesData::Bars { bars, errors } => {
                let mut points: Vec<_> = bars
                    .iter()
                    .flat_map(|b| [(b.left, b.bottom), (b.right, b.top)])
                    .collect();
                points.extend(error_points(errors));
                points
            }
            SeriesData::Arrows { arrows } => arrows
                .iter()
                .flat_map(|a| [(a.x, a.y), (a.x + a.dx, a.y + a.dy)])
                .collect(),
        }
    }

    fn is_bars(&self) -> bool {
        matches!(self.data, SeriesData::Bars { .. })
    }
}

impl Cartesian {
    /// Axis limits from the data, overridden by the user's ranges.
    pub fn limits(&self, layout: &Layout) -> AxisLimits {
        let mut x = None;
        let mut y = [None, None];
        let mut bars = [false, false];
        for series in &self.series {
            let points = series.points();
            let side = usize::from(series.axis == YAxis::Secondary);
            x = Extent::union(x, Extent::of(points.iter().map(|p| p.0)));
            y[side] = Extent::union(y[side], Extent::of(points.iter().map(|p| p.1)));
            bars[side] |= series.is_bars();
        }
        if let Some(set) = &self.contours {
            let points: Vec<_> = set.lines.iter().flat_map(|l| &l.segments).flatten().copied().collect();
            x = Extent::union(x, Extent::of(points.iter().map(|p| p.0)));
            y[0] = Extent::union(y[0], Extent::of(points.iter().map(|p| p.1)));
        }

        let auto = |extent: Option<Extent>, bars: bool| match extent {
            None => (0.0, 1.0),
            Some(e) => {
                let (lo, hi) = e.padded();
                // Bars rise from zero without a margin below them.
                if bars && e.min >= 0.0 {
                    (0.0, hi)
                } else {
                    (lo, hi)
                }
            }
        };
        AxisLimits {
            x: layout.x.range.apply(auto(x, false)),
            y: layout.y.range.apply(auto(y[0], bars[0])),
            y2: layout.y2.range.apply(auto(y[1], bars[1])),
        }
    }
}

// ---------------------------------------------------------------------------
// Building figures from tables
// ---------------------------------------------------------------------------

/// Describe the plot of every input on one figure.
pub fn build_figure(inputs: &[Input], options: &PlotOptions) -> Result<Figure, PlotError> {
    let plot = match options.plot_type {
        PlotType::Line => cartesian(inputs, options, line_series),
        PlotType::Bar => cartesian(inputs, options, bar_series),
        PlotType::Scatter => cartesian(inputs, options, scatter_series),
        PlotType::Quiver => quiver(inputs, options)?,
        PlotType::Heatmap => heatmap(inputs, options)?,
        PlotType::Scatter3d => Plot::ThreeD(ThreeD {
            colormap: options.heatmap.colormap,
            kind: ThreeDKind::Scatter(non_empty(triples(inputs))?),
        }),
        PlotType::Surface => Plot::ThreeD(ThreeD {
            colormap: options.heatmap.colormap,
            kind: ThreeDKind::Surface(surface_grid(&triples(inputs))?),
        }),
        PlotType::Wireframe => Plot::ThreeD(ThreeD {
            colormap: options.heatmap.colormap,
            kind: ThreeDKind::Wireframe(surface_grid(&triples(inputs))?),
        }),
    };
    Ok(Figure {
        title: figure_title(inputs, options),
        layout: Layout::new(options),
        plot,
    })
}

/// `--title` if given, else the names of the input files.
fn figure_title(inputs: &[Input], options: &PlotOptions) -> Option<String> {
    if options.no_title {
        return None;
    }
    if let Some(title) = &options.title {
        return Some(title.clone());
    }
    let names: Vec<&str> = inputs
        .iter()
        .map(|input| input.name.as_str())
        .filter(|name| *name != "-")
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}

fn cell(row: &[Option<f64>], idx: usize) -> Option<f64> {
    row.get(idx).copied().flatten()
}

fn override_at(overrides: &[Option<StyleSpec>], idx: usize) -> Option<StyleSpec> {
    overrides.get(idx).copied().flatten()
}

fn resolve(spec: Option<StyleSpec>, fallback: SeriesStyle) -> SeriesStyle {
    spec.map_or(fallback, |s| s.resolve(fallback))
}

fn axis_for(twin: bool, index: usize) -> YAxis {
    if twin && index % 2 == 1 {
        YAxis::Secondary
    } else {
        YAxis::Primary
    }
}

/// Series builders get the table, the options and the index of their first
/// series on the figure, so styles keep cycling across input files.
type SeriesBuilder = fn(&NumericTable, &PlotOptions, usize) -> Vec<Series>;

fn cartesian(inputs: &[Input], options: &PlotOptions, build: SeriesBuilder) -> Plot {
    let mut series = Vec::new();
    for input in inputs {
        let offset = series.len();
        series.extend(build(&input.table, options, offset));
    }
    Plot::Cartesian(Cartesian {
        series,
        twin: options.twin,
        contours: None,
    })
}

/// Split a table into columns, starting at column `skip`. The first row
/// with at least `min_len` cells fixes the number of columns; shorter rows
/// are padded with missing values.
fn columns(table: &NumericTable, skip: usize, min_len: usize) -> (Vec<Option<f64>>, Vec<Vec<Option<f64>>>) {
    let mut keys = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = Vec::new();
    for row in &table.rows {
        if row.len() < min_len {
            continue;
        }
        if columns.is_empty() {
            columns = vec![Vec::new(); row.len() - skip];
        }
        if skip > 0 {
            keys.push(row[0]);
        }
        for (k, column) in columns.iter_mut().enumerate() {
            column.push(cell(row, k + skip));
        }
    }
    (keys, columns)
}

/// Consecutive runs of points where both coordinates are present.
fn segments(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (x, y) in xs.iter().zip(ys) {
        match (x, y) {
            (Some(x), Some(y)) => current.push((*x, *y)),
            _ if !current.is_empty() => out.push(std::mem::take(&mut current)),
            _ => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Every how many points an error bar is drawn so that the markers of a
/// `width_in` inch wide figure do not overlap.
fn error_bar_stride(points: usize, marker_size: f64, width_in: f64) -> usize {
    let total_marker_width = points as f64 * marker_size / 72.0;
    (total_marker_width * 2.0 / width_in).ceil().max(1.0) as usize
}

fn line_series(table: &NumericTable, options: &PlotOptions, offset: usize) -> Vec<Series> {
    let (xs, columns) = columns(table, 1, 2);
    let (labels, overrides) = table.labels();
    let with_errors = options.errorbars == ErrorBars::Y;
    let step = if with_errors { 2 } else { 1 };
    let stride = error_bar_stride(xs.len(), MARKER_SIZE * options.scale, options.size.width);

    (0..columns.len())
        .step_by(step)
        .enumerate()
        .map(|(k, col)| {
            let index = offset + k;
            let ys = &columns[col];
            let errors = match columns.get(col + 1).filter(|_| with_errors) {
                Some(errs) => xs
                    .iter()
                    .zip(ys)
                    .zip(errs)
                    .step_by(stride)
                    .filter_map(|((x, y), e)| {
                        let (x, y, e) = ((*x)?, (*y)?, (*e)?.abs());
                        Some(ErrorBar {
                            x,
                            low: y - e,
                            mid: y,
                            high: y + e,
                        })
                    })
                    .collect(),
                None => Vec::new(),
            };
            Series {
                label: labels.get(col + 1).cloned(),
                style: resolve(override_at(&overrides, col + 1), default_line_style(index)),
                axis: axis_for(options.twin, index),
                data: SeriesData::Line {
                    segments: segments(&xs, ys),
                    errors,
                },
                visible: true,
            }
        })
        .collect()
}

fn bar_series(table: &NumericTable, options: &PlotOptions, offset: usize) -> Vec<Series> {
    let (_, columns) = columns(table, 0, 1);
    let (labels, overrides) = table.labels();
    let with_errors = options.errorbars == ErrorBars::Y;
    let step = if with_errors { 2 } else { 1 };
    let rows = columns.first().map_or(0, Vec::len);
    // Stacks grow separately on the two Y axes.
    let mut bottoms = [vec![0.0; rows], vec![0.0; rows]];

    (0..columns.len())
        .step_by(step)
        .enumerate()
        .map(|(k, col)| {
            let index = offset + k;
            let axis = axis_for(options.twin, index);
            let base = &mut bottoms[usize::from(axis == YAxis::Secondary)];
            let mut bars = Vec::new();
            let mut tops = vec![None; rows];
            for (i, height) in columns[col].iter().enumerate() {
                if let Some(h) = height {
                    let x = i as f64;
                    bars.push(Bar {
                        left: x - BAR_HALF_WIDTH,
                        right: x + BAR_HALF_WIDTH,
                        bottom: base[i],
                        top: base[i] + h,
                    });
                    tops[i] = Some(base[i] + h);
                    base[i] += h;
                }
            }
            let errors = match columns.get(col + 1).filter(|_| with_errors) {
                Some(errs) => tops
                    .iter()
                    .zip(errs)
                    .enumerate()
                    .filter_map(|(i, (top, e))| {
                        let (top, e) = ((*top)?, (*e)?.abs());
                        Some(ErrorBar {
                            x: i as f64,
                            low: top - e,
                            mid: top,
                            high: top + e,
                        })
                    })
                    .collect(),
                None => Vec::new(),
            };
            Series {
                label: labels.get(col).cloned(),
                style: resolve(override_at(&overrides, col), default_fill_style(index)),
                axis,
                data: SeriesData::Bars { bars, errors },
                visible: true,
            }
        })
        .collect()
}

/// Legend label of a scatter series from the header of its X column:
/// `x_speed`, `speed_x` and `speed (x)` all become `speed`.
pub fn scatter_label(header: &str) -> String {
    let mut label = header;
    for prefix in ["x_", "x "] {
        if let Some(rest) = label.strip_prefix(prefix) {
            label = rest;
            break;
        }
    }
    for suffix in ["_x", " x", "(x)"] {
        if let Some(rest) = label.strip_suffix(suffix) {
            label = rest;
            break;
        }
    }
    label.trim().to_string()
}

fn scatter_series(table: &NumericTable, _options: &PlotOptions, offset: usize) -> Vec<Series> {
    let mut pairs: Vec<Vec<(f64, f64)>> = Vec::new();
    for row in &table.rows {
        if row.len() % 2 != 0 {
            continue;
        }
        let mut values = row.clone();
        if values.len() < pairs.len() * 2 {
            values.resize(pairs.len() * 2, None);
        }
        if pairs.is_empty() {
            pairs = vec![Vec::new(); values.len() / 2];
        }
        for (points, pair) in pairs.iter_mut().zip(values.chunks(2)) {
            if let [Some(x), Some(y)] = pair {
                points.push((*x, *y));
            }
        }
    }

    let (labels, overrides) = table.labels();
    pairs
        .into_iter()
        .enumerate()
        .map(|(k, points)| {
            let index = offset + k;
            let spec = override_at(&overrides, 2 * k).or(override_at(&overrides, 2 * k + 1));
            Series {
                label: labels.get(2 * k).map(|h| scatter_label(h)),
                style: resolve(spec, default_marker_style(index)),
                axis: YAxis::Primary,
                data: SeriesData::Scatter { points },
                visible: true,
            }
        })
        .collect()
}

/// `(x, y, u, v)` rows of a table; U and V default to zero.
fn vectors(table: &NumericTable) -> Vec<(f64, f64, f64, f64)> {
    table
        .rows
        .iter()
        .filter(|row| row.len() >= 2)
        .filter_map(|row| {
            let mut values = row.clone();
            if values.len() < 4 {
                values.resize(4, Some(0.0));
            }
            match values.as_slice() {
                [Some(x), Some(y), Some(u), Some(v), rest @ ..] if rest.iter().all(Option::is_some) => {
                    Some((*x, *y, *u, *v))
                }
                _ => None,
            }
        })
        .collect()
}

/// Factor applied to vectors so that an average arrow is about as long as
/// the typical distance between arrow tails.
fn arrow_scale(vectors: &[(f64, f64, f64, f64)]) -> f64 {
    let lengths: Vec<f64> = vectors
        .iter()
        .map(|v| v.2.hypot(v.3))
        .filter(|l| *l > 0.0)
        .collect();
    if lengths.is_empty() {
        return 1.0;
    }
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    let span = |values: Vec<f64>| finite_range(values).map_or(0.0, |(lo, hi)| hi - lo);
    let width = span(vectors.iter().map(|v| v.0).collect());
    let height = span(vectors.iter().map(|v| v.1).collect());
    let n = vectors.len() as f64;
    let spacing = if width > 0.0 && height > 0.0 {
        (width * height / n).sqrt()
    } else if width.max(height) > 0.0 {
        width.max(height) / (n - 1.0).max(1.0)
    } else {
        mean
    };
    0.9 * spacing / mean
}

fn quiver(inputs: &[Input], options: &PlotOptions) -> Result<Plot, PlotError> {
    let per_file: Vec<Vec<(f64, f64, f64, f64)>> = inputs.iter().map(|i| vectors(&i.table)).collect();
    let all: Vec<(f64, f64, f64, f64)> = per_file.iter().flatten().copied().collect();
    let scale = arrow_scale(&all);

    let series = per_file
        .into_iter()
        .map(|vectors| Series {
            label: None,
            style: default_fill_style(0),
            axis: YAxis::Primary,
            data: SeriesData::Arrows {
                arrows: vectors
                    .iter()
                    .map(|&(x, y, u, v)| Arrow {
                        x,
                        y,
                        dx: u * scale,
                        dy: v * scale,
                    })
                    .collect(),
            },
            visible: true,
        })
        .collect();

    let contours = if options.heatmap.show_contours() && !all.is_empty() {
        let magnitudes: Vec<(f64, f64, f64)> = all.iter().map(|&(x, y, u, v)| (x, y, u.hypot(v))).collect();
        let grid = interpolate(&magnitudes, options.heatmap.grid_size, options.heatmap.interpolate)?;
        Some(contour_set(&grid, options, Some(options.heatmap.colormap)))
    } else {
        None
    };

    Ok(Plot::Cartesian(Cartesian {
        series,
        twin: false,
        contours,
    }))
}

fn contour_set(grid: &Grid, options: &PlotOptions, colormap: Option<Colormap>) -> ContourSet {
    let levels = grid
        .z_range()
        .map(|(lo, hi)| contour_levels(lo, hi, CONTOUR_LEVELS))
        .unwrap_or_default();
    ContourSet {
        lines: contours(grid, &levels),
        labels: options.heatmap.contour_labels,
        colormap,
    }
}

/// `(x, y, z)` rows of every input; rows with a missing value are skipped.
fn triples(inputs: &[Input]) -> Vec<(f64, f64, f64)> {
    inputs
        .iter()
        .flat_map(|input| &input.table.rows)
        .filter(|row| row.len() >= 3 && row.iter().all(Option::is_some))
        .filter_map(|row| Some((row[0]?, row[1]?, row[2]?)))
        .collect()
}

fn non_empty(points: Vec<(f64, f64, f64)>) -> Result<Vec<(f64, f64, f64)>, PlotError> {
    if points.is_empty() {
        Err(PlotError::InvalidData("no X, Y, Z triples to plot".into()))
    } else {
        Ok(points)
    }
}

fn heatmap(inputs: &[Input], options: &PlotOptions) -> Result<Plot, PlotError> {
    let settings = &options.heatmap;
    let grid = interpolate(&triples(inputs), settings.grid_size, settings.interpolate)?;
    let z_range = options.z.range.apply(grid.z_range().unwrap_or((0.0, 1.0)));
    let contours = settings
        .show_contours()
        .then(|| contour_set(&grid, options, None));
    Ok(Plot::Heatmap(Heatmap {
        grid,
        colormap: settings.colormap,
        z_range,
        contours,
        colorbar: settings.colorbar,
    }))
}
