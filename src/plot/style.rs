use std::str::FromStr;

use palette::Srgb;

use super::PlotError;
use crate::color::color_for_code;

/// Colour codes cycled through by default.
pub const DEFAULT_COLORS: &str = "bgrcmyk";

/// Line styles cycled through once every colour has been used.
pub const DEFAULT_LINE_STYLES: [LineDash; 4] = [
    LineDash::Solid,
    LineDash::Dashed,
    LineDash::DashDot,
    LineDash::Dotted,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDash {
    Solid,
    Dashed,
    DashDot,
    Dotted,
}

impl LineDash {
    /// Alternating on/off lengths in line widths. Empty for solid lines.
    pub fn pattern(self) -> &'static [f64] {
        match self {
            LineDash::Solid => &[],
            LineDash::Dashed => &[3.7, 1.6],
            LineDash::DashDot => &[6.4, 1.6, 1.0, 1.6],
            LineDash::Dotted => &[1.0, 1.65],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
    TriangleUp,
    TriangleDown,
    TriangleLeft,
    TriangleRight,
    Plus,
    Cross,
    Star,
    Diamond,
    Pentagon,
    Hexagon,
    Octagon,
}

impl Marker {
    pub fn from_code(code: char) -> Option<Marker> {
        Some(match code {
            'o' => Marker::Circle,
            's' => Marker::Square,
            '^' => Marker::TriangleUp,
            'v' => Marker::TriangleDown,
            '<' => Marker::TriangleLeft,
            '>' => Marker::TriangleRight,
            '+' => Marker::Plus,
            'x' => Marker::Cross,
            '*' => Marker::Star,
            'd' | 'D' => Marker::Diamond,
            'p' => Marker::Pentagon,
            'h' | 'H' => Marker::Hexagon,
            '8' => Marker::Octagon,
            _ => return None,
        })
    }
}

/// A style string such as `r--o`: any of a colour code, a line style and
/// a marker, in any order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleSpec {
    pub color: Option<Srgb<u8>>,
    pub line: Option<LineDash>,
    pub marker: Option<Marker>,
}

impl FromStr for StyleSpec {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = StyleSpec::default();
        let mut rest = s.trim();
        while !rest.is_empty() {
            let line = [
                ("--", LineDash::Dashed),
                ("-.", LineDash::DashDot),
                ("-", LineDash::Solid),
                (":", LineDash::Dotted),
            ]
            .into_iter()
            .find(|(prefix, _)| rest.starts_with(prefix));
            if let Some((prefix, dash)) = line {
                if spec.line.replace(dash).is_some() {
                    return Err(PlotError::spec("style", s, "more than one line style"));
                }
                rest = &rest[prefix.len()..];
                continue;
            }

            let mut chars = rest.chars();
            let Some(c) = chars.next() else { break };
            if let Some(color) = color_for_code(c) {
                if spec.color.replace(color).is_some() {
                    return Err(PlotError::spec("style", s, "more than one colour"));
                }
            } else if let Some(marker) = Marker::from_code(c) {
                if spec.marker.replace(marker).is_some() {
                    return Err(PlotError::spec("style", s, "more than one marker"));
                }
            } else {
                return Err(PlotError::spec("style", s, format!("unknown style character '{c}'")));
            }
            rest = chars.as_str();
        }
        Ok(spec)
    }
}

/// The style a series is finally drawn with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStyle {
    pub color: Srgb<u8>,
    pub line: Option<LineDash>,
    pub marker: Option<Marker>,
}

impl StyleSpec {
    /// Fill the gaps of this spec from `fallback`. A spec that names a
    /// line style or a marker replaces both of them; a bare colour keeps
    /// the fallback's line and marker.
    pub fn resolve(&self, fallback: SeriesStyle) -> SeriesStyle {
        let color = self.color.unwrap_or(fallback.color);
        if self.line.is_none() && self.marker.is_none() {
            SeriesStyle { color, ..fallback }
        } else {
            SeriesStyle {
                color,
                line: self.line,
                marker: self.marker,
            }
        }
    }
}

fn default_color(index: usize) -> Srgb<u8> {
    let codes = DEFAULT_COLORS.as_bytes();
    color_for_code(codes[index % codes.len()] as char).unwrap_or(Srgb::new(0, 0, 0))
}

/// The `index`-th default line style: colours change fastest, then the
/// line style.
pub fn default_line_style(index: usize) -> SeriesStyle {
    let colors = DEFAULT_COLORS.len();
    let dash = DEFAULT_LINE_STYLES[(index / colors) % DEFAULT_LINE_STYLES.len()];
    SeriesStyle {
        color: default_color(index),
        line: Some(dash),
        marker: None,
    }
}

/// The `index`-th default marker style for scatter plots.
pub fn default_marker_style(index: usize) -> SeriesStyle {
    SeriesStyle {
        color: default_color(index),
        line: None,
        marker: Some(Marker::Circle),
    }
}

/// The `index`-th default fill style for bars.
pub fn default_fill_style(index: usize) -> SeriesStyle {
    SeriesStyle {
        color: default_color(index),
        line: None,
        marker: None,
    }
}

/// Split `label [[spec]]` headers into labels and parsed style overrides.
/// Unparseable overrides are logged and ignored.
pub fn split_headers(headers: &[String]) -> (Vec<String>, Vec<Option<StyleSpec>>) {
    headers
        .iter()
        .map(|header| match split_header(header) {
            Some((label, spec)) => match spec.parse::<StyleSpec>() {
                Ok(style) => (label.to_string(), Some(style)),
                Err(e) => {
                    log::warn!("ignoring style of column {header:?}: {e}");
                    (label.to_string(), None)
                }
            },
            None => (header.clone(), None),
        })
        .unzip()
}

/// `"label [[spec]]"` → `("label", "spec")`.
fn split_header(header: &str) -> Option<(&str, &str)> {
    let body = header.strip_suffix("]]")?;
    let start = body.rfind("[[")?;
    let spec = &body[start + 2..];
    if spec.is_empty() || spec.contains(']') {
        return None;
    }
    Some((body[..start].trim(), spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_style_strings() {
        let s: StyleSpec = "r--o".parse().unwrap();
        assert_eq!(s.color, color_for_code('r'));
        assert_eq!(s.line, Some(LineDash::Dashed));
        assert_eq!(s.marker, Some(Marker::Circle));

        let s: StyleSpec = "-.k".parse().unwrap();
        assert_eq!(s.line, Some(LineDash::DashDot));
        assert_eq!(s.color, color_for_code('k'));

        let s: StyleSpec = ":^".parse().unwrap();
        assert_eq!(s.line, Some(LineDash::Dotted));
        assert_eq!(s.marker, Some(Marker::TriangleUp));
    }

    #[test]
    fn rejects_bad_style_strings() {
        assert!("q".parse::<StyleSpec>().is_err());
        assert!("rg".parse::<StyleSpec>().is_err());
        assert!("--:".parse::<StyleSpec>().is_err());
    }

    #[test]
    fn default_cycle_changes_colour_first() {
        assert_eq!(default_line_style(0).color, color_for_code('b').unwrap());
        assert_eq!(default_line_style(1).color, color_for_code('g').unwrap());
        assert_eq!(default_line_style(6).line, Some(LineDash::Solid));
        assert_eq!(default_line_style(7).color, color_for_code('b').unwrap());
        assert_eq!(default_line_style(7).line, Some(LineDash::Dashed));
        assert_eq!(default_line_style(28).line, Some(LineDash::Solid));
    }

    #[test]
    fn resolving_overrides() {
        let fallback = default_line_style(7);
        let red: StyleSpec = "r".parse().unwrap();
        let resolved = red.resolve(fallback);
        assert_eq!(resolved.color, color_for_code('r').unwrap());
        assert_eq!(resolved.line, Some(LineDash::Dashed));

        let markers_only: StyleSpec = "o".parse().unwrap();
        let resolved = markers_only.resolve(fallback);
        assert_eq!(resolved.color, fallback.color);
        assert_eq!(resolved.line, None);
        assert_eq!(resolved.marker, Some(Marker::Circle));
    }

    #[test]
    fn splits_header_styles() {
        let headers = vec![
            "x".to_string(),
            "speed [[r--]]".to_string(),
            "bad [[zz]]".to_string(),
            "odd ]]".to_string(),
        ];
        let (labels, styles) = split_headers(&headers);
        assert_eq!(labels, vec!["x", "speed", "bad", "odd ]]"]);
        assert_eq!(styles[0], None);
        assert_eq!(styles[1].and_then(|s| s.line), Some(LineDash::Dashed));
        assert_eq!(styles[2], None);
        assert_eq!(styles[3], None);
    }
}
