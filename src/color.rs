use clap::ValueEnum;
use palette::{Hsv, IntoColor, Mix, Srgb};

// ---------------------------------------------------------------------------
// Named colours used by style strings
// ---------------------------------------------------------------------------

/// Colour for a single-letter colour code (`bgrcmykw`).
pub fn color_for_code(code: char) -> Option<Srgb<u8>> {
    let rgb = match code {
        'b' => (0, 0, 255),
        'g' => (0, 128, 0),
        'r' => (255, 0, 0),
        'c' => (0, 191, 191),
        'm' => (191, 0, 191),
        'y' => (191, 191, 0),
        'k' => (0, 0, 0),
        'w' => (255, 255, 255),
        _ => return None,
    };
    Some(Srgb::new(rgb.0, rgb.1, rgb.2))
}

// ---------------------------------------------------------------------------
// Colormaps: value in [0, 1] → colour
// ---------------------------------------------------------------------------

/// Colormaps available for heatmaps, contours and surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Colormap {
    Cool,
    #[value(alias = "grey")]
    Gray,
    Hot,
    Hsv,
    #[default]
    Jet,
    Viridis,
}

type Stop = (f32, (u8, u8, u8));

const JET: &[Stop] = &[
    (0.0, (0, 0, 128)),
    (0.125, (0, 0, 255)),
    (0.375, (0, 255, 255)),
    (0.625, (255, 255, 0)),
    (0.875, (255, 0, 0)),
    (1.0, (128, 0, 0)),
];

const HOT: &[Stop] = &[
    (0.0, (10, 0, 0)),
    (0.375, (255, 0, 0)),
    (0.75, (255, 255, 0)),
    (1.0, (255, 255, 255)),
];

const GRAY: &[Stop] = &[(0.0, (0, 0, 0)), (1.0, (255, 255, 255))];

const COOL: &[Stop] = &[(0.0, (0, 255, 255)), (1.0, (255, 0, 255))];

const VIRIDIS: &[Stop] = &[
    (0.0, (68, 1, 84)),
    (0.25, (59, 82, 139)),
    (0.5, (33, 145, 140)),
    (0.75, (94, 201, 98)),
    (1.0, (253, 231, 37)),
];

impl Colormap {
    /// Colour at `t`, clamped to `[0, 1]`. NaN maps to the low end.
    pub fn at(self, t: f64) -> Srgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) as f32 };
        match self {
            Colormap::Hsv => {
                let rgb: Srgb = Hsv::new(t * 360.0, 1.0, 1.0).into_color();
                rgb.into_format()
            }
            Colormap::Jet => gradient(JET, t),
            Colormap::Hot => gradient(HOT, t),
            Colormap::Gray => gradient(GRAY, t),
            Colormap::Cool => gradient(COOL, t),
            Colormap::Viridis => gradient(VIRIDIS, t),
        }
    }

    /// Colour of `value` when `lo..=hi` spans the whole map.
    pub fn scaled(self, value: f64, lo: f64, hi: f64) -> Srgb<u8> {
        if hi > lo {
            self.at((value - lo) / (hi - lo))
        } else {
            self.at(0.5)
        }
    }
}

fn gradient(stops: &[Stop], t: f32) -> Srgb<u8> {
    let to_rgb = |(r, g, b): (u8, u8, u8)| Srgb::new(r, g, b).into_format::<f32>();
    let upper = stops
        .iter()
        .position(|(pos, _)| *pos >= t)
        .unwrap_or(stops.len() - 1);
    if upper == 0 {
        return to_rgb(stops[0].1).into_format();
    }
    let (lo_pos, lo) = stops[upper - 1];
    let (hi_pos, hi) = stops[upper];
    let factor = if hi_pos > lo_pos {
        (t - lo_pos) / (hi_pos - lo_pos)
    } else {
        0.0
    };
    to_rgb(lo).mix(to_rgb(hi), factor).into_format()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_codes() {
        assert_eq!(color_for_code('r'), Some(Srgb::new(255, 0, 0)));
        assert_eq!(color_for_code('k'), Some(Srgb::new(0, 0, 0)));
        assert_eq!(color_for_code('q'), None);
    }

    #[test]
    fn gradients_hit_their_stops() {
        assert_eq!(Colormap::Gray.at(0.0), Srgb::new(0, 0, 0));
        assert_eq!(Colormap::Gray.at(1.0), Srgb::new(255, 255, 255));
        assert_eq!(Colormap::Jet.at(0.375), Srgb::new(0, 255, 255));
        assert_eq!(Colormap::Viridis.at(2.0), Colormap::Viridis.at(1.0));
    }

    #[test]
    fn gray_is_monotonic() {
        let a = Colormap::Gray.at(0.25).red;
        let b = Colormap::Gray.at(0.75).red;
        assert!(a < b);
    }

    #[test]
    fn hsv_starts_red() {
        assert_eq!(Colormap::Hsv.at(0.0), Srgb::new(255, 0, 0));
    }

    #[test]
    fn scaled_handles_flat_ranges() {
        assert_eq!(Colormap::Gray.scaled(3.0, 3.0, 3.0), Colormap::Gray.at(0.5));
        assert_eq!(Colormap::Gray.scaled(5.0, 0.0, 10.0), Colormap::Gray.at(0.5));
    }
}
