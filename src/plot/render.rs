//! Drawing [`Figure`]s with `plotters`.
//!
//! Every figure goes through [`draw`], which works on any drawing backend:
//! [`save`] picks the SVG or bitmap backend from the file extension and
//! [`render_rgb`] draws into a buffer for the viewer window.

use std::path::Path;

use palette::Srgb;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::figure::{
    Arrow, Cartesian, ContourSet, Extent, Figure, Heatmap, Layout, Plot, Series, SeriesData, ThreeD,
    ThreeDKind, YAxis,
};
use super::grid::finite_range;
use super::options::{format_tick, AxisOptions};
use super::style::{Marker, SeriesStyle};
use super::table::format_date;
use super::PlotError;
use crate::color::{color_for_code, Colormap};

type Plane = Cartesian2d<RangedCoordf64, RangedCoordf64>;

const FONT_FAMILY: &str = "sans-serif";

/// Colorbar steps drawn next to heatmaps.
const COLORBAR_STEPS: usize = 100;

fn drawing<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Drawing(e.to_string())
}

fn chart_config<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::ChartConfig(e.to_string())
}

fn rgb(color: Srgb<u8>) -> RGBColor {
    RGBColor(color.red, color.green, color.blue)
}

fn font(px: f64) -> TextStyle<'static> {
    (FONT_FAMILY, px).into()
}

/// Save the figure; `.svg` files get vector output, anything else a
/// bitmap encoded by extension.
pub fn save(figure: &Figure, path: &Path) -> Result<(), PlotError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "svg" => {
            let root = SVGBackend::new(path, figure.layout.size).into_drawing_area();
            draw(figure, &root)
        }
        "png" | "jpg" | "jpeg" | "bmp" => {
            let root = BitMapBackend::new(path, figure.layout.size).into_drawing_area();
            draw(figure, &root)
        }
        _ => Err(PlotError::spec(
            "output file",
            &path.display().to_string(),
            "unsupported format; use .png, .jpg, .bmp or .svg",
        )),
    }
}

/// Render into an RGB buffer of `size` pixels.
pub fn render_rgb(figure: &Figure, size: (u32, u32)) -> Result<Vec<u8>, PlotError> {
    let mut buffer = vec![0u8; size.0 as usize * size.1 as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
        draw(figure, &root)?;
    }
    Ok(buffer)
}

pub fn draw<DB: DrawingBackend>(figure: &Figure, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
    root.fill(&WHITE).map_err(drawing)?;
    let layout = &figure.layout;
    let titled;
    let area = match figure.title.as_deref().filter(|t| !t.is_empty()) {
        Some(title) => {
            titled = root
                .titled(title, font(layout.font_px() * 1.2))
                .map_err(drawing)?;
            &titled
        }
        None => root,
    };

    match &figure.plot {
        Plot::Cartesian(cartesian) => draw_cartesian(layout, cartesian, area)?,
        Plot::Heatmap(heatmap) => draw_heatmap(layout, heatmap, area)?,
        Plot::ThreeD(three_d) => draw_three_d(layout, three_d, area)?,
    }
    root.present().map_err(drawing)
}

fn axis_formatter(axis: &AxisOptions, date_format: Option<&str>) -> Box<dyn Fn(&f64) -> String> {
    if !axis.tick_labels {
        return Box::new(|_| String::new());
    }
    match date_format {
        Some(format) => {
            let format = format.to_string();
            Box::new(move |v| format_date(*v, &format))
        }
        None => {
            let format = axis.format;
            Box::new(move |v| format.format(*v))
        }
    }
}

/// Pixels per data unit along each axis of a chart.
fn pixel_scale(chart: &ChartContext<'_, impl DrawingBackend, Plane>, x: (f64, f64), y: (f64, f64)) -> (f64, f64) {
    let (px, py) = chart.plotting_area().get_pixel_range();
    let per_unit = |pixels: i32, (lo, hi): (f64, f64)| {
        let s = f64::from(pixels.max(1)) / (hi - lo);
        if s.is_finite() && s > 0.0 {
            s
        } else {
            1.0
        }
    };
    (per_unit(px.end - px.start, x), per_unit(py.end - py.start, y))
}

// ---------------------------------------------------------------------------
// Cartesian plots
// ---------------------------------------------------------------------------

fn draw_cartesian<DB: DrawingBackend>(
    layout: &Layout,
    cartesian: &Cartesian,
    area: &DrawingArea<DB, Shift>,
) -> Result<(), PlotError> {
    let limits = cartesian.limits(layout);
    let font_px = layout.font_px();
    let label_area = (font_px * 5.0) as u32;

    let mut builder = ChartBuilder::on(area);
    builder
        .margin((font_px * 0.8) as u32)
        .x_label_area_size((font_px * 3.2) as u32)
        .y_label_area_size(label_area);
    if cartesian.twin {
        builder.right_y_label_area_size(label_area);
    }
    let mut chart = builder
        .build_cartesian_2d(limits.x.0..limits.x.1, limits.y.0..limits.y.1)
        .map_err(chart_config)?
        .set_secondary_coord(limits.x.0..limits.x.1, limits.y2.0..limits.y2.1);

    let x_fmt = axis_formatter(&layout.x, layout.x_date_format.as_deref());
    let y_fmt = axis_formatter(&layout.y, None);
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_label_formatter(&*x_fmt)
        .y_label_formatter(&*y_fmt)
        .label_style(font(font_px))
        .axis_desc_style(font(font_px));
    if let Some(label) = &layout.x.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &layout.y.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw().map_err(drawing)?;

    if cartesian.twin {
        let y2_fmt = axis_formatter(&layout.y2, None);
        let mut axes = chart.configure_secondary_axes();
        axes.y_label_formatter(&*y2_fmt)
            .label_style(font(font_px))
            .axis_desc_style(font(font_px));
        if let Some(label) = &layout.y2.label {
            axes.y_desc(label.as_str());
        }
        axes.draw().map_err(drawing)?;
    }

    let scale = pixel_scale(&*chart, limits.x, limits.y);
    if let Some(set) = &cartesian.contours {
        draw_contours(&mut *chart, set, layout)?;
    }

    // Secondary series are drawn in primary coordinates.
    let to_primary = |y: f64| {
        limits.y.0 + (y - limits.y2.0) / (limits.y2.1 - limits.y2.0) * (limits.y.1 - limits.y.0)
    };
    let mut labelled = false;
    for series in cartesian.series.iter().filter(|s| s.visible) {
        let data = match series.axis {
            YAxis::Primary => series.data.clone(),
            YAxis::Secondary => map_y(&series.data, to_primary),
        };
        draw_series(&mut *chart, series, &data, layout, scale)?;
        labelled |= series.label.as_deref().is_some_and(|l| !l.is_empty());
    }

    if let (Some(location), true) = (layout.legend, labelled) {
        chart
            .configure_series_labels()
            .position(location.position())
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(font(font_px))
            .draw()
            .map_err(drawing)?;
    }
    Ok(())
}

fn map_y(data: &SeriesData, f: impl Fn(f64) -> f64) -> SeriesData {
    let point = |(x, y): (f64, f64)| (x, f(y));
    match data {
        SeriesData::Line { segments, errors } => SeriesData::Line {
            segments: segments
                .iter()
                .map(|s| s.iter().map(|&p| point(p)).collect())
                .collect(),
            errors: errors
                .iter()
                .map(|e| super::figure::ErrorBar {
                    x: e.x,
                    low: f(e.low),
                    mid: f(e.mid),
                    high: f(e.high),
                })
                .collect(),
        },
        SeriesData::Scatter { points } => SeriesData::Scatter {
            points: points.iter().map(|&p| point(p)).collect(),
        },
        SeriesData::Bars { bars, errors } => SeriesData::Bars {
            bars: bars
                .iter()
                .map(|b| super::figure::Bar {
                    bottom: f(b.bottom),
                    top: f(b.top),
                    ..*b
                })
                .collect(),
            errors: errors
                .iter()
                .map(|e| super::figure::ErrorBar {
                    x: e.x,
                    low: f(e.low),
                    mid: f(e.mid),
                    high: f(e.high),
                })
                .collect(),
        },
        SeriesData::Arrows { arrows } => SeriesData::Arrows {
            arrows: arrows
                .iter()
                .map(|a| {
                    let (x, y) = point((a.x, a.y));
                    let tip = f(a.y + a.dy);
                    Arrow { x, y, dx: a.dx, dy: tip - y }
                })
                .collect(),
        },
    }
}

fn draw_series<'a, DB: DrawingBackend + 'a>(
    chart: &mut ChartContext<'a, DB, Plane>,
    series: &Series,
    data: &SeriesData,
    layout: &Layout,
    scale: (f64, f64),
) -> Result<(), PlotError> {
    let style = series.style;
    let color = rgb(style.color);
    let width = layout.line_width_px();
    let stroke = color.stroke_width(width);
    let radius = layout.marker_radius_px();

    match data {
        SeriesData::Line { segments, errors } => {
            if let Some(dash) = style.line {
                let pattern: Vec<f64> = dash.pattern().iter().map(|p| p * f64::from(width)).collect();
                let pieces: Vec<Vec<(f64, f64)>> = segments
                    .iter()
                    .flat_map(|s| dash_pieces(s, scale, &pattern))
                    .collect();
                chart
                    .draw_series(pieces.into_iter().map(|p| PathElement::new(p, stroke)))
                    .map_err(drawing)?;
            }
            if let Some(marker) = style.marker {
                let points: Vec<(f64, f64)> = segments.iter().flatten().copied().collect();
                draw_markers(chart, &points, marker, color, radius)?;
            }
            chart
                .draw_series(errors.iter().map(|e| {
                    ErrorBar::new_vertical(e.x, e.low, e.mid, e.high, stroke, layout.cap_width_px())
                }))
                .map_err(drawing)?;
        }
        SeriesData::Scatter { points } => {
            if let Some(dash) = style.line {
                let pattern: Vec<f64> = dash.pattern().iter().map(|p| p * f64::from(width)).collect();
                chart
                    .draw_series(dash_pieces(points, scale, &pattern).into_iter().map(|p| PathElement::new(p, stroke)))
                    .map_err(drawing)?;
            }
            draw_markers(chart, points, style.marker.unwrap_or(Marker::Circle), color, radius)?;
        }
        SeriesData::Bars { bars, errors } => {
            chart
                .draw_series(bars.iter().map(|b| {
                    Rectangle::new([(b.left, b.bottom), (b.right, b.top)], color.filled())
                }))
                .map_err(drawing)?;
            chart
                .draw_series(errors.iter().map(|e| {
                    ErrorBar::new_vertical(e.x, e.low, e.mid, e.high, BLACK.stroke_width(width), layout.cap_width_px())
                }))
                .map_err(drawing)?;
        }
        SeriesData::Arrows { arrows } => {
            chart
                .draw_series(arrows.iter().map(|a| {
                    PathElement::new(vec![(a.x, a.y), (a.x + a.dx, a.y + a.dy)], stroke)
                }))
                .map_err(drawing)?;
            let head = f64::from(radius) * 2.0;
            chart
                .draw_series(
                    arrows
                        .iter()
                        .filter_map(|a| arrow_head(a, scale, head))
                        .map(|h| Polygon::new(h.to_vec(), color.filled())),
                )
                .map_err(drawing)?;
        }
    }

    if let Some(label) = series.label.as_deref().filter(|l| !l.is_empty()) {
        add_legend_entry(chart, label, style, data, layout)?;
    }
    Ok(())
}

fn add_legend_entry<'a, DB: DrawingBackend + 'a>(
    chart: &mut ChartContext<'a, DB, Plane>,
    label: &str,
    style: SeriesStyle,
    data: &SeriesData,
    layout: &Layout,
) -> Result<(), PlotError> {
    let color = rgb(style.color);
    let stroke = color.stroke_width(layout.line_width_px());
    let radius = layout.marker_radius_px();
    let anno = chart
        .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())
        .map_err(drawing)?
        .label(label);

    if matches!(data, SeriesData::Bars { .. } | SeriesData::Arrows { .. }) {
        anno.legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
        return Ok(());
    }
    match (style.line, style.marker.map(|m| glyph(m, radius))) {
        (Some(_), _) | (None, None) => {
            anno.legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], stroke));
        }
        (None, Some(Glyph::Circle)) => {
            anno.legend(move |(x, y)| Circle::new((x + 10, y), radius, color.filled()));
        }
        (None, Some(Glyph::Filled(vertices))) => {
            anno.legend(move |(x, y)| EmptyElement::at((x + 10, y)) + Polygon::new(vertices.clone(), color.filled()));
        }
        (None, Some(Glyph::Stroked(vertices))) => {
            anno.legend(move |(x, y)| EmptyElement::at((x + 10, y)) + PathElement::new(vertices.clone(), stroke));
        }
    }
    Ok(())
}

/// Marker outline relative to its centre, in pixels.
#[derive(Debug, Clone, PartialEq)]
enum Glyph {
    Circle,
    Filled(Vec<(i32, i32)>),
    Stroked(Vec<(i32, i32)>),
}

/// Vertices of a regular polygon; `start` is the angle of the first one
/// in degrees, with 0 pointing right and 90 pointing down.
fn regular(sides: usize, radius: f64, start: f64) -> Vec<(i32, i32)> {
    (0..sides)
        .map(|k| {
            let angle = (start + 360.0 * k as f64 / sides as f64).to_radians();
            ((radius * angle.cos()).round() as i32, (radius * angle.sin()).round() as i32)
        })
        .collect()
}

fn glyph(marker: Marker, radius: i32) -> Glyph {
    let r = f64::from(radius);
    match marker {
        Marker::Circle => Glyph::Circle,
        Marker::Square => Glyph::Filled(vec![(-radius, -radius), (radius, -radius), (radius, radius), (-radius, radius)]),
        Marker::TriangleUp => Glyph::Filled(regular(3, r, -90.0)),
        Marker::TriangleDown => Glyph::Filled(regular(3, r, 90.0)),
        Marker::TriangleLeft => Glyph::Filled(regular(3, r, 180.0)),
        Marker::TriangleRight => Glyph::Filled(regular(3, r, 0.0)),
        Marker::Diamond => Glyph::Filled(regular(4, r, -90.0)),
        Marker::Pentagon => Glyph::Filled(regular(5, r, -90.0)),
        Marker::Hexagon => Glyph::Filled(regular(6, r, -90.0)),
        Marker::Octagon => Glyph::Filled(regular(8, r, -67.5)),
        Marker::Star => {
            let outer = regular(5, r, -90.0);
            let inner = regular(5, r * 0.4, -54.0);
            Glyph::Filled(outer.into_iter().zip(inner).flat_map(|(o, i)| [o, i]).collect())
        }
        Marker::Plus => Glyph::Stroked(vec![(-radius, 0), (radius, 0), (0, 0), (0, -radius), (0, radius)]),
        Marker::Cross => Glyph::Stroked(vec![(-radius, -radius), (radius, radius), (0, 0), (-radius, radius), (radius, -radius)]),
    }
}

fn draw_markers<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Plane>,
    points: &[(f64, f64)],
    marker: Marker,
    color: RGBColor,
    radius: i32,
) -> Result<(), PlotError> {
    match glyph(marker, radius) {
        Glyph::Circle => chart
            .draw_series(points.iter().map(|&p| Circle::new(p, radius, color.filled())))
            .map(|_| ()),
        Glyph::Filled(vertices) => chart
            .draw_series(
                points
                    .iter()
                    .map(|&p| EmptyElement::at(p) + Polygon::new(vertices.clone(), color.filled())),
            )
            .map(|_| ()),
        Glyph::Stroked(vertices) => chart
            .draw_series(
                points
                    .iter()
                    .map(|&p| EmptyElement::at(p) + PathElement::new(vertices.clone(), color.stroke_width(1))),
            )
            .map(|_| ()),
    }
    .map_err(drawing)
}

/// Split a polyline into the visible pieces of a dash pattern. Pattern
/// lengths are in pixels and alternate on and off; `scale` converts data
/// units to pixels. An empty pattern keeps the line whole.
fn dash_pieces(points: &[(f64, f64)], scale: (f64, f64), pattern: &[f64]) -> Vec<Vec<(f64, f64)>> {
    if pattern.is_empty() || points.len() < 2 || pattern.iter().any(|p| *p <= 0.0) {
        return vec![points.to_vec()];
    }
    let mut pieces = Vec::new();
    let mut current = Vec::new();
    let mut k = 0;
    let mut left = pattern[0];

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = ((b.0 - a.0) * scale.0).hypot((b.1 - a.1) * scale.1);
        if k % 2 == 0 && current.is_empty() {
            current.push(a);
        }
        let mut pos = 0.0;
        while length - pos > left {
            pos += left;
            let t = pos / length;
            let p = (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
            if k % 2 == 0 {
                current.push(p);
                pieces.push(std::mem::take(&mut current));
            }
            k = (k + 1) % pattern.len();
            left = pattern[k];
            if k % 2 == 0 {
                current.push(p);
            }
        }
        left -= length - pos;
        if k % 2 == 0 {
            current.push(b);
        }
    }
    if current.len() >= 2 {
        pieces.push(current);
    }
    pieces
}

/// Filled triangle at the tip of an arrow, `size` pixels long.
fn arrow_head(arrow: &Arrow, scale: (f64, f64), size: f64) -> Option<[(f64, f64); 3]> {
    let (ux, uy) = (arrow.dx * scale.0, arrow.dy * scale.1);
    let length = ux.hypot(uy);
    if length == 0.0 || !length.is_finite() {
        return None;
    }
    let size = size.min(length * 0.4);
    let (dx, dy) = (ux / length, uy / length);
    let tip = (arrow.x + arrow.dx, arrow.y + arrow.dy);
    let back = |along: f64, across: f64| {
        (
            tip.0 + (-dx * along - dy * across) / scale.0,
            tip.1 + (-dy * along + dx * across) / scale.1,
        )
    };
    Some([tip, back(size, size * 0.5), back(size, -size * 0.5)])
}

fn draw_contours<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Plane>,
    set: &ContourSet,
    layout: &Layout,
) -> Result<(), PlotError> {
    let levels = finite_range(set.lines.iter().map(|l| l.level));
    for line in &set.lines {
        let color = match (set.colormap, levels) {
            (Some(map), Some((lo, hi))) => rgb(map.scaled(line.level, lo, hi)),
            _ => BLACK,
        };
        chart
            .draw_series(
                line.segments
                    .iter()
                    .map(|s| PathElement::new(s.to_vec(), color.stroke_width(layout.line_width_px()))),
            )
            .map_err(drawing)?;

        if set.labels {
            if let Some([a, b]) = line.segments.get(line.segments.len() / 2) {
                let middle = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
                let style = font(layout.font_px() * 0.8).color(&color);
                chart
                    .draw_series(std::iter::once(Text::new(format_tick(line.level), middle, style)))
                    .map_err(drawing)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Heatmaps
// ---------------------------------------------------------------------------

/// Cell boundaries around grid coordinates: midpoints between neighbours,
/// extended by half a step at both ends.
fn cell_edges(centers: &[f64]) -> Vec<f64> {
    match centers {
        [] => Vec::new(),
        [c] => vec![c - 0.5, c + 0.5],
        _ => {
            let n = centers.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
            edges.extend(centers.windows(2).map(|w| (w[0] + w[1]) / 2.0));
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

fn draw_heatmap<DB: DrawingBackend>(
    layout: &Layout,
    heatmap: &Heatmap,
    area: &DrawingArea<DB, Shift>,
) -> Result<(), PlotError> {
    let font_px = layout.font_px();
    let (width, _) = area.dim_in_pixel();
    let bar_width = (font_px * 8.0) as u32;
    let split = (heatmap.colorbar && width > bar_width * 2).then(|| area.split_horizontally(width - bar_width));
    let (main, bar) = match &split {
        Some((main, bar)) => (main, Some(bar)),
        None => (area, None),
    };

    let grid = &heatmap.grid;
    let xe = cell_edges(&grid.xs);
    let ye = cell_edges(&grid.ys);
    let span = |edges: &[f64]| {
        let (lo, hi) = finite_range(edges.iter().copied()).unwrap_or((0.0, 1.0));
        if hi > lo {
            (lo, hi)
        } else {
            Extent { min: lo, max: hi }.padded()
        }
    };
    let x = layout.x.range.apply(span(&xe));
    let y = layout.y.range.apply(span(&ye));

    let mut chart = ChartBuilder::on(main)
        .margin((font_px * 0.8) as u32)
        .x_label_area_size((font_px * 3.2) as u32)
        .y_label_area_size((font_px * 5.0) as u32)
        .build_cartesian_2d(x.0..x.1, y.0..y.1)
        .map_err(chart_config)?;

    let x_fmt = axis_formatter(&layout.x, None);
    let y_fmt = axis_formatter(&layout.y, None);
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_label_formatter(&*x_fmt)
        .y_label_formatter(&*y_fmt)
        .label_style(font(font_px))
        .axis_desc_style(font(font_px));
    if let Some(label) = &layout.x.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &layout.y.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw().map_err(drawing)?;

    let (z_lo, z_hi) = heatmap.z_range;
    let mut cells = Vec::with_capacity(grid.xs.len() * grid.ys.len());
    for j in 0..grid.ys.len() {
        for i in 0..grid.xs.len() {
            let v = grid.value(i, j);
            if v.is_finite() {
                let color = rgb(heatmap.colormap.scaled(v, z_lo, z_hi));
                cells.push(Rectangle::new([(xe[i], ye[j]), (xe[i + 1], ye[j + 1])], color.filled()));
            }
        }
    }
    chart.draw_series(cells).map_err(drawing)?;

    if let Some(set) = &heatmap.contours {
        draw_contours(&mut chart, set, layout)?;
    }
    if let Some(bar) = bar {
        draw_colorbar(layout, heatmap.colormap, heatmap.z_range, bar)?;
    }
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    layout: &Layout,
    colormap: Colormap,
    (lo, hi): (f64, f64),
    area: &DrawingArea<DB, Shift>,
) -> Result<(), PlotError> {
    let font_px = layout.font_px();
    let mut chart = ChartBuilder::on(area)
        .margin_top((font_px * 0.8) as u32)
        .margin_bottom((font_px * 4.0) as u32)
        .margin_left((font_px * 0.8) as u32)
        .right_y_label_area_size((font_px * 5.0) as u32)
        .build_cartesian_2d(0f64..1f64, lo..hi)
        .map_err(chart_config)?;

    let z_fmt = axis_formatter(&layout.z, None);
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .disable_x_axis()
        .y_label_formatter(&*z_fmt)
        .label_style(font(font_px))
        .axis_desc_style(font(font_px));
    if let Some(label) = &layout.z.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw().map_err(drawing)?;

    let step = (hi - lo) / COLORBAR_STEPS as f64;
    chart
        .draw_series((0..COLORBAR_STEPS).map(|k| {
            let bottom = lo + step * k as f64;
            let color = rgb(colormap.scaled(bottom + step / 2.0, lo, hi));
            Rectangle::new([(0.0, bottom), (1.0, bottom + step)], color.filled())
        }))
        .map_err(drawing)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 3D plots
// ---------------------------------------------------------------------------

fn draw_three_d<DB: DrawingBackend>(
    layout: &Layout,
    plot: &ThreeD,
    area: &DrawingArea<DB, Shift>,
) -> Result<(), PlotError> {
    let points: Vec<(f64, f64, f64)> = match &plot.kind {
        ThreeDKind::Scatter(points) => points.clone(),
        ThreeDKind::Surface(grid) | ThreeDKind::Wireframe(grid) => grid
            .ys
            .iter()
            .enumerate()
            .flat_map(|(j, &y)| grid.xs.iter().enumerate().map(move |(i, &x)| (x, y, grid.value(i, j))))
            .collect(),
    };
    let range = |values: Vec<f64>, axis: &AxisOptions| {
        let auto = Extent::of(values).map_or((0.0, 1.0), Extent::padded);
        axis.range.apply(auto)
    };
    let x = range(points.iter().map(|p| p.0).collect(), &layout.x);
    let y = range(points.iter().map(|p| p.1).collect(), &layout.y);
    let z = range(points.iter().map(|p| p.2).collect(), &layout.z);
    let font_px = layout.font_px();

    let mut chart = ChartBuilder::on(area)
        .margin((font_px * 1.5) as u32)
        .build_cartesian_3d(x.0..x.1, z.0..z.1, y.0..y.1)
        .map_err(chart_config)?;
    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.4;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    let x_fmt = axis_formatter(&layout.x, None);
    let y_fmt = axis_formatter(&layout.y, None);
    let z_fmt = axis_formatter(&layout.z, None);
    chart
        .configure_axes()
        .label_style(font(font_px * 0.9))
        .x_formatter(&x_fmt)
        .y_formatter(&z_fmt)
        .z_formatter(&y_fmt)
        .draw()
        .map_err(drawing)?;

    let colormap = plot.colormap;
    match &plot.kind {
        ThreeDKind::Scatter(points) => {
            let radius = layout.marker_radius_px();
            chart
                .draw_series(points.iter().map(|&(px, py, pz)| {
                    Circle::new((px, pz, py), radius, rgb(colormap.scaled(pz, z.0, z.1)).filled())
                }))
                .map_err(drawing)?;
        }
        ThreeDKind::Surface(grid) => {
            let fallback = z.0;
            let style = |v: &f64| rgb(colormap.scaled(*v, z.0, z.1)).filled();
            chart
                .draw_series(
                    SurfaceSeries::xoz(grid.xs.iter().copied(), grid.ys.iter().copied(), |gx, gy| {
                        grid.value_at(gx, gy).unwrap_or(fallback)
                    })
                    .style_func(&style),
                )
                .map_err(drawing)?;
        }
        ThreeDKind::Wireframe(grid) => {
            let stroke = color_for_code('b').map_or(BLUE, rgb).stroke_width(layout.line_width_px());
            for (j, &gy) in grid.ys.iter().enumerate() {
                chart
                    .draw_series(LineSeries::new(
                        grid.xs.iter().enumerate().map(|(i, &gx)| (gx, grid.value(i, j), gy)),
                        stroke,
                    ))
                    .map_err(drawing)?;
            }
            for (i, &gx) in grid.xs.iter().enumerate() {
                chart
                    .draw_series(LineSeries::new(
                        grid.ys.iter().enumerate().map(|(j, &gy)| (gx, grid.value(i, j), gy)),
                        stroke,
                    ))
                    .map_err(drawing)?;
            }
        }
    }

    // Axis names go in a corner; the 3D axes have no label areas.
    let (_, height) = area.dim_in_pixel();
    let names = [("X", &layout.x), ("Y", &layout.y), ("Z", &layout.z)];
    let lines: Vec<String> = names
        .iter()
        .filter_map(|(axis, options)| options.label.as_ref().map(|l| format!("{axis}: {l}")))
        .collect();
    for (k, line) in lines.iter().rev().enumerate() {
        let top = height as i32 - ((k + 1) as f64 * font_px * 1.3) as i32;
        area.draw(&Text::new(line.as_str(), (font_px as i32, top), font(font_px)))
            .map_err(drawing)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashes_follow_the_pattern() {
        let pieces = dash_pieces(&[(0.0, 0.0), (10.0, 0.0)], (1.0, 1.0), &[2.0, 3.0]);
        assert_eq!(pieces, vec![vec![(0.0, 0.0), (2.0, 0.0)], vec![(5.0, 0.0), (7.0, 0.0)]]);
    }

    #[test]
    fn dashes_continue_across_vertices() {
        let pieces = dash_pieces(&[(0.0, 0.0), (1.0, 0.0), (1.0, 4.0)], (1.0, 1.0), &[2.0, 1.0]);
        assert_eq!(
            pieces,
            vec![
                vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
                vec![(1.0, 2.0), (1.0, 4.0)],
            ]
        );
    }

    #[test]
    fn solid_lines_are_not_split() {
        let line = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)];
        assert_eq!(dash_pieces(&line, (10.0, 10.0), &[]), vec![line]);
    }

    #[test]
    fn edges_surround_centres() {
        assert_eq!(cell_edges(&[0.0, 1.0, 2.0]), vec![-0.5, 0.5, 1.5, 2.5]);
        assert_eq!(cell_edges(&[3.0]), vec![2.5, 3.5]);
        assert!(cell_edges(&[]).is_empty());
    }

    #[test]
    fn arrow_heads_point_along_the_arrow() {
        let arrow = Arrow { x: 0.0, y: 0.0, dx: 10.0, dy: 0.0 };
        let [tip, left, right] = arrow_head(&arrow, (1.0, 1.0), 2.0).unwrap();
        assert_eq!(tip, (10.0, 0.0));
        assert_eq!(left, (8.0, 1.0));
        assert_eq!(right, (8.0, -1.0));
        let still = Arrow { dx: 0.0, ..arrow };
        assert!(arrow_head(&still, (1.0, 1.0), 2.0).is_none());
    }

    #[test]
    fn glyph_shapes() {
        assert_eq!(glyph(Marker::Circle, 4), Glyph::Circle);
        match glyph(Marker::TriangleUp, 4) {
            Glyph::Filled(v) => assert_eq!(v[0], (0, -4)),
            other => panic!("unexpected {other:?}"),
        }
        match glyph(Marker::Star, 4) {
            Glyph::Filled(v) => assert_eq!(v.len(), 10),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_output_formats() {
        let figure = crate::plot::build_figure(&[], &Default::default()).unwrap();
        assert!(save(&figure, Path::new("plot.pdf")).is_err());
    }

    use crate::plot::figure::Input;
    use crate::plot::options::PlotType;
    use crate::plot::table::NumericTable;
    use crate::plot::PlotOptions;

    // Title, legend and tick labels are off, so nothing needs a system font.
    fn render_svg(
        plot_type: PlotType,
        headers: Option<&[&str]>,
        rows: &[&[f64]],
        tweak: impl FnOnce(&mut PlotOptions),
    ) -> (Figure, String) {
        let table = NumericTable {
            headers: headers.map(|h| h.iter().map(|s| s.to_string()).collect()),
            rows: rows.iter().map(|r| r.iter().copied().map(Some).collect()).collect(),
        };
        let mut options = PlotOptions {
            plot_type,
            no_title: true,
            legend: None,
            ..Default::default()
        };
        for axis in [&mut options.x, &mut options.y, &mut options.y2, &mut options.z] {
            axis.tick_labels = false;
        }
        tweak(&mut options);
        let figure = crate::plot::build_figure(&[Input::new("t", table)], &options).unwrap();

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, figure.layout.size).into_drawing_area();
            draw(&figure, &root).unwrap();
        }
        (figure, svg)
    }

    fn hex(color: Srgb<u8>) -> String {
        format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
    }

    fn elements<'a>(svg: &'a str, tag: &str, attr: &str) -> Vec<&'a str> {
        let open = format!("<{tag} ");
        svg.lines()
            .filter(|l| l.starts_with(&open) && l.contains(attr))
            .collect()
    }

    fn points(element: &str) -> Vec<(i32, i32)> {
        let start = element.find("points=\"").unwrap() + "points=\"".len();
        let end = start + element[start..].find('"').unwrap();
        element[start..end]
            .split_whitespace()
            .map(|p| {
                let (x, y) = p.split_once(',').unwrap();
                (x.parse().unwrap(), y.parse().unwrap())
            })
            .collect()
    }

    #[test]
    fn twin_axis_series_share_the_plot_area() {
        let (figure, svg) = render_svg(
            PlotType::Line,
            Some(&["x", "a [[r-]]", "b [[b-]]"]),
            &[&[0.0, 1.0, 100.0], &[1.0, 3.0, 300.0], &[2.0, 2.0, 200.0]],
            |o| o.twin = true,
        );
        assert_eq!(figure.series()[1].axis, YAxis::Secondary);

        let red = elements(&svg, "polyline", "stroke=\"#FF0000\"");
        let blue = elements(&svg, "polyline", "stroke=\"#0000FF\"");
        assert_eq!((red.len(), blue.len()), (1, 1));
        let (primary, secondary) = (points(red[0]), points(blue[0]));
        assert_eq!(primary.len(), 3);
        for (p, q) in primary.iter().zip(&secondary) {
            assert!((p.0 - q.0).abs() <= 1 && (p.1 - q.1).abs() <= 1, "{p:?} vs {q:?}");
        }
    }

    #[test]
    fn bars_are_filled_rectangles() {
        let (_, svg) = render_svg(
            PlotType::Bar,
            Some(&["a [[r]]", "b [[g]]"]),
            &[&[1.0, 2.0], &[3.0, 1.0], &[2.0, 2.0]],
            |_| {},
        );
        assert_eq!(elements(&svg, "rect", "fill=\"#FF0000\"").len(), 3);
        assert_eq!(elements(&svg, "rect", "fill=\"#008000\"").len(), 3);
    }

    #[test]
    fn quiver_draws_a_shaft_and_head_per_arrow() {
        let (figure, svg) = render_svg(
            PlotType::Quiver,
            None,
            &[
                &[0.0, 0.0, 1.0, 0.0],
                &[1.0, 0.0, 0.0, 1.0],
                &[0.0, 1.0, 1.0, 1.0],
                &[1.0, 1.0, -1.0, 0.0],
            ],
            |_| {},
        );
        let color = hex(figure.series()[0].style.color);
        assert_eq!(elements(&svg, "polyline", &format!("stroke=\"{color}\"")).len(), 4);
        assert_eq!(elements(&svg, "polygon", &format!("fill=\"{color}\"")).len(), 4);
    }

    #[test]
    fn surface_draws_one_patch_per_grid_cell() {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                rows.push(vec![f64::from(x), f64::from(y), f64::from(x * y)]);
            }
        }
        let rows: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        let (_, svg) = render_svg(PlotType::Surface, None, &rows, |_| {});
        assert!(elements(&svg, "polygon", "fill=").len() >= 4);
    }

    #[test]
    fn heatmap_fills_cells_and_colorbar() {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                rows.push(vec![f64::from(x), f64::from(y), f64::from(x + y)]);
            }
        }
        let rows: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        let (_, svg) = render_svg(PlotType::Heatmap, None, &rows, |o| {
            o.heatmap.contours = true;
        });
        assert!(elements(&svg, "rect", "fill=").len() > COLORBAR_STEPS + 1);
    }
}
