//! Regular grids for heatmaps, gradient contours and surfaces, and contour
//! lines extracted from them.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::options::{GridSize, InterpolationMethod};
use super::PlotError;

/// Values sampled at every `(xs[i], ys[j])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Row-major, one row per Y coordinate.
    values: Vec<f64>,
}

impl Grid {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, values: Vec<f64>) -> Result<Self, PlotError> {
        if values.len() != xs.len() * ys.len() {
            return Err(PlotError::InvalidData(format!(
                "grid of {}x{} points needs {} values, got {}",
                xs.len(),
                ys.len(),
                xs.len() * ys.len(),
                values.len()
            )));
        }
        Ok(Grid { xs, ys, values })
    }

    /// Value at `(xs[i], ys[j])`.
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.xs.len() + i]
    }

    /// Value at the grid point with coordinates `(x, y)`, if there is one.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let i = self.xs.binary_search_by(|v| v.total_cmp(&x)).ok()?;
        let j = self.ys.binary_search_by(|v| v.total_cmp(&y)).ok()?;
        Some(self.value(i, j))
    }

    /// Smallest and largest finite value.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        finite_range(self.values.iter().copied())
    }
}

/// Smallest and largest finite value of `values`.
pub fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// `n` evenly spaced values from `lo` to `hi` inclusive.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n)
                .map(|k| if k == n - 1 { hi } else { lo + step * k as f64 })
                .collect()
        }
    }
}

fn sorted_unique(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.into_iter().collect();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v
}

// ---------------------------------------------------------------------------
// Scattered points → regular grid
// ---------------------------------------------------------------------------

/// Resample scattered `(x, y, z)` points onto a `size` grid spanning their
/// bounding box.
pub fn interpolate(
    points: &[(f64, f64, f64)],
    size: GridSize,
    method: InterpolationMethod,
) -> Result<Grid, PlotError> {
    if points.is_empty() {
        return Err(PlotError::InvalidData("no X, Y, Z triples to plot".into()));
    }
    let (x_lo, x_hi) = finite_range(points.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_lo, y_hi) = finite_range(points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let xs = linspace(x_lo, x_hi, size.width);
    let ys = linspace(y_lo, y_hi, size.height);

    let sample: Box<dyn Fn(f64, f64) -> f64 + '_> = match method {
        InterpolationMethod::Nearest => Box::new(|x, y| nearest(points, x, y)),
        InterpolationMethod::Linear => match rectilinear(points) {
            Some(source) => Box::new(move |x, y| bilinear(&source, x, y)),
            None => {
                log::warn!(
                    "data is not on a rectilinear grid; using inverse distance weighting, \
                     watch out for artifacts if the X and Y ranges are wildly different"
                );
                Box::new(|x, y| inverse_distance(points, x, y))
            }
        },
    };

    let values = ys
        .iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
        .map(|(x, y)| sample(x, y))
        .collect();
    Grid::new(xs, ys, values)
}

/// The points as a complete grid, when every combination of their distinct
/// X and Y coordinates occurs. Later duplicates win.
fn rectilinear(points: &[(f64, f64, f64)]) -> Option<Grid> {
    let xs = sorted_unique(points.iter().map(|p| p.0));
    let ys = sorted_unique(points.iter().map(|p| p.1));
    if xs.len() < 2 || ys.len() < 2 {
        return None;
    }
    let cells: HashMap<(u64, u64), f64> = points
        .iter()
        .map(|&(x, y, z)| ((x.to_bits(), y.to_bits()), z))
        .collect();
    let mut values = Vec::with_capacity(xs.len() * ys.len());
    for y in &ys {
        for x in &xs {
            values.push(*cells.get(&(x.to_bits(), y.to_bits()))?);
        }
    }
    Grid::new(xs, ys, values).ok()
}

/// Index `i` such that `axis[i] <= v <= axis[i + 1]`, clamped to the ends.
fn bracket(axis: &[f64], v: f64) -> (usize, f64) {
    let i = axis
        .partition_point(|&a| a <= v)
        .saturating_sub(1)
        .min(axis.len() - 2);
    let span = axis[i + 1] - axis[i];
    let t = if span > 0.0 { ((v - axis[i]) / span).clamp(0.0, 1.0) } else { 0.0 };
    (i, t)
}

fn bilinear(grid: &Grid, x: f64, y: f64) -> f64 {
    let (i, tx) = bracket(&grid.xs, x);
    let (j, ty) = bracket(&grid.ys, y);
    let bottom = grid.value(i, j) * (1.0 - tx) + grid.value(i + 1, j) * tx;
    let top = grid.value(i, j + 1) * (1.0 - tx) + grid.value(i + 1, j + 1) * tx;
    bottom * (1.0 - ty) + top * ty
}

fn nearest(points: &[(f64, f64, f64)], x: f64, y: f64) -> f64 {
    points
        .iter()
        .map(|&(px, py, z)| ((px - x).powi(2) + (py - y).powi(2), z))
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
        .map_or(f64::NAN, |(_, z)| z)
}

fn inverse_distance(points: &[(f64, f64, f64)], x: f64, y: f64) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for &(px, py, z) in points {
        let d2 = (px - x).powi(2) + (py - y).powi(2);
        if d2 == 0.0 {
            return z;
        }
        let w = 1.0 / d2;
        weighted += w * z;
        total += w;
    }
    if total > 0.0 {
        weighted / total
    } else {
        f64::NAN
    }
}

/// Grid over the distinct X and Y coordinates of the points, for surface
/// plots. Combinations that do not occur get the smallest Z.
pub fn surface_grid(points: &[(f64, f64, f64)]) -> Result<Grid, PlotError> {
    let (z_min, _) = finite_range(points.iter().map(|p| p.2))
        .ok_or_else(|| PlotError::InvalidData("no X, Y, Z triples to plot".into()))?;
    let xs = sorted_unique(points.iter().map(|p| p.0));
    let ys = sorted_unique(points.iter().map(|p| p.1));
    let cells: HashMap<(u64, u64), f64> = points
        .iter()
        .map(|&(x, y, z)| ((x.to_bits(), y.to_bits()), z))
        .collect();
    let values = ys
        .iter()
        .flat_map(|y| xs.iter().map(move |x| (x, y)))
        .map(|(x, y)| {
            cells
                .get(&(x.to_bits(), y.to_bits()))
                .copied()
                .filter(|z| z.is_finite())
                .unwrap_or(z_min)
        })
        .collect();
    Grid::new(xs, ys, values)
}

// ---------------------------------------------------------------------------
// Contours (marching squares)
// ---------------------------------------------------------------------------

pub type Point = (f64, f64);

/// All segments of one contour level.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLine {
    pub level: f64,
    pub segments: Vec<[Point; 2]>,
}

/// Round contour levels strictly inside `lo..hi`, at most about
/// `max_levels` of them.
pub fn contour_levels(lo: f64, hi: f64, max_levels: usize) -> Vec<f64> {
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo || max_levels == 0 {
        return Vec::new();
    }
    let raw = (hi - lo) / max_levels as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let first = (lo / step).floor() as i64 + 1;
    let last = (hi / step).ceil() as i64 - 1;
    (first..=last)
        .map(|k| k as f64 * step)
        .filter(|l| *l > lo && *l < hi)
        .collect()
}

// Cell corners: a = (i, j), b = (i+1, j), c = (i+1, j+1), d = (i, j+1).
#[derive(Clone, Copy)]
enum Edge {
    Bottom,
    Right,
    Top,
    Left,
}

/// Extract the contour segments of every level from the grid. Cells with a
/// NaN corner are skipped; saddle cells are resolved by the cell centre.
pub fn contours(grid: &Grid, levels: &[f64]) -> Vec<ContourLine> {
    levels
        .iter()
        .map(|&level| ContourLine {
            level,
            segments: level_segments(grid, level),
        })
        .filter(|line| !line.segments.is_empty())
        .collect()
}

fn level_segments(grid: &Grid, level: f64) -> Vec<[Point; 2]> {
    use Edge::*;

    let mut segments = Vec::new();
    if grid.xs.len() < 2 || grid.ys.len() < 2 {
        return segments;
    }
    for j in 0..grid.ys.len() - 1 {
        for i in 0..grid.xs.len() - 1 {
            let z = [
                grid.value(i, j),
                grid.value(i + 1, j),
                grid.value(i + 1, j + 1),
                grid.value(i, j + 1),
            ];
            if z.iter().any(|v| v.is_nan()) {
                continue;
            }
            let case = z
                .iter()
                .enumerate()
                .fold(0u8, |acc, (bit, v)| if *v >= level { acc | (1 << bit) } else { acc });
            let centre_above = || z.iter().sum::<f64>() / 4.0 >= level;
            let pairs: &[(Edge, Edge)] = match case {
                0 | 15 => &[],
                1 | 14 => &[(Left, Bottom)],
                2 | 13 => &[(Bottom, Right)],
                3 | 12 => &[(Left, Right)],
                4 | 11 => &[(Right, Top)],
                6 | 9 => &[(Bottom, Top)],
                7 | 8 => &[(Left, Top)],
                5 if centre_above() => &[(Bottom, Right), (Left, Top)],
                5 => &[(Left, Bottom), (Right, Top)],
                10 if centre_above() => &[(Left, Bottom), (Right, Top)],
                _ => &[(Bottom, Right), (Left, Top)],
            };
            for &(from, to) in pairs {
                segments.push([
                    crossing(grid, i, j, &z, from, level),
                    crossing(grid, i, j, &z, to, level),
                ]);
            }
        }
    }
    segments
}

/// Where `level` crosses `edge` of cell `(i, j)` with corner values `z`.
fn crossing(grid: &Grid, i: usize, j: usize, z: &[f64; 4], edge: Edge, level: f64) -> Point {
    let (x0, x1) = (grid.xs[i], grid.xs[i + 1]);
    let (y0, y1) = (grid.ys[j], grid.ys[j + 1]);
    let t = |a: f64, b: f64| if b != a { (level - a) / (b - a) } else { 0.5 };
    match edge {
        Edge::Bottom => (x0 + (x1 - x0) * t(z[0], z[1]), y0),
        Edge::Right => (x1, y0 + (y1 - y0) * t(z[1], z[2])),
        Edge::Top => (x0 + (x1 - x0) * t(z[3], z[2]), y1),
        Edge::Left => (x0, y0 + (y1 - y0) * t(z[0], z[3])),
    }
}
