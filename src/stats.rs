//! Aggregation functions used by `aggregate`.

use clap::ValueEnum;

/// An aggregation function selectable with `aggregate -F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AggregateFn {
    First,
    Last,
    Max,
    #[default]
    Mean,
    #[value(name = "mean_95ci")]
    Mean95Ci,
    #[value(name = "mean_err")]
    MeanErr,
    #[value(name = "mean_sd")]
    MeanSd,
    Median,
    Min,
    Sum,
}

impl AggregateFn {
    /// Header suffixes of the values this function produces. Single-valued
    /// functions have exactly one empty suffix.
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            AggregateFn::MeanSd => &["", "sd"],
            AggregateFn::MeanErr => &["", "err"],
            AggregateFn::Mean95Ci => &["", "95ci"],
            _ => &[""],
        }
    }

    /// Apply the function; returns one value per suffix.
    pub fn apply(self, items: &[f64]) -> Vec<f64> {
        match self {
            AggregateFn::First => vec![items.first().copied().unwrap_or(f64::NAN)],
            AggregateFn::Last => vec![items.last().copied().unwrap_or(f64::NAN)],
            AggregateFn::Max => vec![fold_or_nan(items, f64::max)],
            AggregateFn::Min => vec![fold_or_nan(items, f64::min)],
            AggregateFn::Sum => vec![items.iter().sum()],
            AggregateFn::Mean => vec![mean(items)],
            AggregateFn::Median => vec![median(items).unwrap_or(f64::NAN)],
            AggregateFn::MeanSd => {
                let (m, sd) = mean_sd(items);
                vec![m, sd]
            }
            AggregateFn::MeanErr => {
                let (m, sd) = mean_sd(items);
                vec![m, sd / (items.len() as f64).sqrt()]
            }
            AggregateFn::Mean95Ci => {
                let (m, sd) = mean_sd(items);
                vec![m, 1.96 * sd / (items.len() as f64).sqrt()]
            }
        }
    }

    /// Expand a header row the way the output columns are laid out:
    /// `h` becomes `h, h_sd` for `mean_sd`, and so on.
    pub fn expand_headers<S: AsRef<str>>(self, headers: &[S]) -> Vec<String> {
        headers
            .iter()
            .flat_map(|h| {
                self.suffixes().iter().map(move |suffix| {
                    if suffix.is_empty() {
                        h.as_ref().to_string()
                    } else {
                        format!("{}_{suffix}", h.as_ref())
                    }
                })
            })
            .collect()
    }
}

fn fold_or_nan(items: &[f64], f: fn(f64, f64) -> f64) -> f64 {
    items.iter().copied().reduce(f).unwrap_or(f64::NAN)
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(items: &[f64]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().sum::<f64>() / items.len() as f64
}

/// Mean and sample standard deviation. The deviation of fewer than two
/// items is NaN.
pub fn mean_sd(items: &[f64]) -> (f64, f64) {
    let m = mean(items);
    if items.len() < 2 {
        return (m, f64::NAN);
    }
    let sqdiff: f64 = items.iter().map(|x| (x - m).powi(2)).sum();
    (m, (sqdiff / (items.len() - 1) as f64).sqrt())
}

/// Middle element, or the average of the two middle elements for even
/// lengths. `None` for an empty slice.
pub fn median(items: &[f64]) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let mut sorted = items.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sd() {
        assert_eq!(mean(&[5.0, 3.0, 7.0, 1.0, 9.0]), 5.0);
        assert_eq!(mean(&[]), 0.0);
        let (m, sd) = mean_sd(&[5.0, 3.0, 7.0, 1.0, 9.0]);
        assert_eq!(m, 5.0);
        assert!((sd - 3.162278).abs() < 1e-5);
        assert!(mean_sd(&[4.0]).1.is_nan());
    }

    #[test]
    fn median_of_odd_and_even_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn functions_produce_one_value_per_suffix() {
        let items = [1.0, 2.0, 6.0];
        for f in AggregateFn::value_variants() {
            assert_eq!(f.apply(&items).len(), f.suffixes().len(), "{f:?}");
        }
        assert_eq!(AggregateFn::Min.apply(&items), vec![1.0]);
        assert_eq!(AggregateFn::Max.apply(&items), vec![6.0]);
        assert_eq!(AggregateFn::Sum.apply(&items), vec![9.0]);
        assert_eq!(AggregateFn::First.apply(&items), vec![1.0]);
        assert_eq!(AggregateFn::Last.apply(&items), vec![6.0]);
    }

    #[test]
    fn standard_error_and_confidence_interval() {
        let items = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (_, sd) = mean_sd(&items);
        let err = AggregateFn::MeanErr.apply(&items)[1];
        let ci = AggregateFn::Mean95Ci.apply(&items)[1];
        assert!((err - sd / 8f64.sqrt()).abs() < 1e-12);
        assert!((ci - 1.96 * err).abs() < 1e-12);
    }

    #[test]
    fn header_expansion() {
        assert_eq!(
            AggregateFn::MeanSd.expand_headers(&["a", "b"]),
            vec!["a", "a_sd", "b", "b_sd"]
        );
        assert_eq!(AggregateFn::Sum.expand_headers(&["a"]), vec!["a"]);
    }

    #[test]
    fn cli_names() {
        assert_eq!(
            AggregateFn::from_str("mean_95ci", false).unwrap(),
            AggregateFn::Mean95Ci
        );
        assert_eq!(AggregateFn::from_str("median", false).unwrap(), AggregateFn::Median);
    }
}
