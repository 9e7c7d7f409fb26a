use std::fmt;

// ---------------------------------------------------------------------------
// Row – one line of a tabular input
// ---------------------------------------------------------------------------

/// A single input row together with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number in the source (0 when the source has no lines,
    /// e.g. rows synthesised from a Parquet schema).
    pub line: u64,
    /// Field values in column order.
    pub fields: Vec<String>,
}

impl Row {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Row { line, fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Numeric cells
// ---------------------------------------------------------------------------

/// Parse a cell as a float, ignoring surrounding whitespace.
///
/// Accepts everything `f64::from_str` does, which includes `nan` and `inf`.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Whether every cell of the row parses as a number.
pub fn is_numeric_row<S: AsRef<str>>(cells: &[S]) -> bool {
    cells.iter().all(|c| parse_number(c.as_ref()).is_some())
}

/// Displays an `f64` the way the tools print numbers: the shortest digits
/// that round-trip, integral values with a trailing `.0`, and exponent form
/// (`1e+16`, `2.5e-05`) below `1e-4` or from `1e16` on. Non-finite values
/// print as `nan`, `inf` and `-inf`.
#[derive(Debug, Clone, Copy)]
pub struct Number(pub f64);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_nan() {
            return write!(f, "nan");
        }
        if v.is_infinite() {
            return write!(f, "{}", if v > 0.0 { "inf" } else { "-inf" });
        }
        if v == 0.0 {
            return write!(f, "{v:.1}");
        }

        let sci = format!("{v:e}");
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        if (-4..16).contains(&exponent) {
            if v.fract() == 0.0 {
                write!(f, "{v:.1}")
            } else {
                write!(f, "{v}")
            }
        } else {
            let sign = if exponent < 0 { '-' } else { '+' };
            write!(f, "{mantissa}e{sign}{:02}", exponent.abs())
        }
    }
}

pub fn format_number(v: f64) -> String {
    Number(v).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_leniently() {
        assert_eq!(parse_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert!(parse_number("nan").unwrap().is_nan());
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn numeric_rows() {
        assert!(is_numeric_row(&["1", "2.5", "1e3"]));
        assert!(!is_numeric_row(&["1", "name"]));
        assert!(is_numeric_row::<&str>(&[]));
    }

    #[test]
    fn formats_like_the_tools_print() {
        assert_eq!(format_number(2.0), "2.0");
        assert_eq!(format_number(-7.0), "-7.0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::NAN), "nan");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn switches_to_exponent_form_outside_the_plain_range() {
        let cases = [
            (0.0, "0.0"),
            (-0.0, "-0.0"),
            (1e-4, "0.0001"),
            (0.00012, "0.00012"),
            (1e-5, "1e-05"),
            (-2.5e-7, "-2.5e-07"),
            (1.5e-300, "1.5e-300"),
            (123456.0, "123456.0"),
            (9999999999999998.0, "9999999999999998.0"),
            (1e16, "1e+16"),
            (1e20, "1e+20"),
            (-1.2345e21, "-1.2345e+21"),
            (1.7976931348623157e308, "1.7976931348623157e+308"),
        ];
        for (value, expected) in cases {
            assert_eq!(format_number(value), expected, "{value:?}");
        }
    }
}
