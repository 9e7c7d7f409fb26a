use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Index specifications: "1,3-5" → [1, 3, 4, 5]
// ---------------------------------------------------------------------------

/// Parse a comma-separated list of 1-based column indices and inclusive
/// ranges. Order is preserved and duplicates are kept.
pub fn parse_index_spec(spec: &str) -> Result<Vec<usize>, AppError> {
    let invalid = |reason: String| AppError::InvalidIndexSpec {
        spec: spec.to_string(),
        reason,
    };
    let index = |s: &str| -> Result<usize, AppError> {
        let s = s.trim();
        match s.parse::<usize>() {
            Ok(0) => Err(invalid("column indices start at 1".into())),
            Ok(i) => Ok(i),
            Err(_) => Err(invalid(format!("'{s}' is not a column index"))),
        }
    };

    let mut result = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid("empty item".into()));
        }
        match part.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (index(lo)?, index(hi)?);
                if lo > hi {
                    return Err(invalid(format!("range {lo}-{hi} is descending")));
                }
                result.extend(lo..=hi);
            }
            None => result.push(index(part)?),
        }
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// FieldSelection – which columns a tool looks at
// ---------------------------------------------------------------------------

/// A column selection given on the command line with `-f`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldSelection {
    /// No `-f` given: every column.
    #[default]
    All,
    /// 1-based column indices in the order the user listed them.
    Columns(Vec<usize>),
}

impl FieldSelection {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        if indices.is_empty() {
            FieldSelection::All
        } else {
            FieldSelection::Columns(indices)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FieldSelection::All)
    }

    /// Pick the selected cells, in selection order. Indices past the end of
    /// the row are skipped.
    pub fn select<T: Clone>(&self, cells: &[T]) -> Vec<T> {
        match self {
            FieldSelection::All => cells.to_vec(),
            FieldSelection::Columns(indices) => indices
                .iter()
                .filter_map(|&i| cells.get(i - 1).cloned())
                .collect(),
        }
    }

    /// Same as [`select`](Self::select) but consumes the row.
    pub fn select_owned<T: Clone>(&self, cells: Vec<T>) -> Vec<T> {
        match self {
            FieldSelection::All => cells,
            FieldSelection::Columns(_) => self.select(&cells),
        }
    }

    /// The 1-based source column shown at `position` (0-based) of a selected
    /// row, for error messages.
    pub fn column_number(&self, position: usize) -> usize {
        match self {
            FieldSelection::All => position + 1,
            FieldSelection::Columns(indices) => {
                indices.get(position).copied().unwrap_or(position + 1)
            }
        }
    }

    /// A set view for membership tests on 1-based column numbers.
    pub fn membership(&self) -> FieldMembership {
        match self {
            FieldSelection::All => FieldMembership::Everything,
            FieldSelection::Columns(indices) => {
                FieldMembership::Only(indices.iter().copied().collect())
            }
        }
    }
}

impl FromStr for FieldSelection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_index_spec(s).map(FieldSelection::from_indices)
    }
}

/// Membership test derived from a [`FieldSelection`].
#[derive(Debug, Clone)]
pub enum FieldMembership {
    Everything,
    Only(BTreeSet<usize>),
}

impl FieldMembership {
    pub fn contains(&self, column: usize) -> bool {
        match self {
            FieldMembership::Everything => true,
            FieldMembership::Only(set) => set.contains(&column),
        }
    }
}
