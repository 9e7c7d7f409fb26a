//! Remapping of identifiers in tabular files.
//!
//! A [`Mapper`] turns an old value into a new one; it is either a
//! [`MappingTable`] loaded from a side file or a compiled [`Expression`].
//! [`remap_rows`] pushes every selected field of every row through it.
pub mod expr;

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::data::fields::FieldSelection;
use crate::data::model::Row;
use crate::data::writer::RowWriter;
use crate::error::AppError;

pub use expr::Expression;

// ---------------------------------------------------------------------------
// Mapper – old value → new value
// ---------------------------------------------------------------------------

/// What to do when a value has no entry in the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MissingAction {
    /// Keep the original value.
    #[default]
    Ignore,
    /// Keep the original value and log a warning.
    Warn,
    /// Drop the whole row.
    Skip,
    /// Drop the field from the row.
    Empty,
    /// Stop with an error.
    Fail,
}

/// Outcome of mapping a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    Value(String),
    SkipRow,
    SkipField,
}

pub trait Mapper {
    fn map(&self, value: &str) -> Result<Mapped, AppError>;
}

/// Lookup table loaded from a mapping file.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: HashMap<String, String>,
    missing: MissingAction,
}

impl MappingTable {
    pub fn new(missing: MissingAction) -> Self {
        Self {
            entries: HashMap::new(),
            missing,
        }
    }

    /// Build a table from rows, taking keys from column `old` and values from
    /// column `new` (both 1-based). Later rows override earlier ones.
    pub fn from_rows<I>(rows: I, old: usize, new: usize, missing: MissingAction) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Row>>,
    {
        let mut table = Self::new(missing);
        let needed = old.max(new);
        for row in rows {
            let row = row?;
            match (row.fields.get(old - 1), row.fields.get(new - 1)) {
                (Some(key), Some(value)) => table.insert(key.clone(), value.clone()),
                _ => {
                    return Err(AppError::MalformedRow {
                        line: row.line,
                        reason: format!(
                            "mapping row has {} columns, at least {needed} needed",
                            row.len()
                        ),
                    }
                    .into())
                }
            }
        }
        log::debug!("loaded {} mapping entries", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Mapper for MappingTable {
    fn map(&self, value: &str) -> Result<Mapped, AppError> {
        if let Some(new) = self.entries.get(value) {
            return Ok(Mapped::Value(new.clone()));
        }
        match self.missing {
            MissingAction::Ignore => Ok(Mapped::Value(value.to_string())),
            MissingAction::Warn => {
                log::warn!("{value:?} not found in mapping");
                Ok(Mapped::Value(value.to_string()))
            }
            MissingAction::Skip => Ok(Mapped::SkipRow),
            MissingAction::Empty => Ok(Mapped::SkipField),
            MissingAction::Fail => Err(AppError::UnknownId(value.to_string())),
        }
    }
}

impl Mapper for Expression {
    fn map(&self, value: &str) -> Result<Mapped, AppError> {
        Ok(Mapped::Value(self.evaluate(value)?.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Remapping a stream of rows
// ---------------------------------------------------------------------------

/// Counters reported after a remapping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapStats {
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_skipped: usize,
}

/// Remap the selected fields (1-based) of every row and write the result.
pub fn remap_rows<I, M, W>(
    rows: I,
    mapper: &M,
    fields: &FieldSelection,
    out: &mut RowWriter<W>,
) -> Result<RemapStats>
where
    I: IntoIterator<Item = Result<Row>>,
    M: Mapper + ?Sized,
    W: Write,
{
    let selected = fields.membership();
    let mut stats = RemapStats::default();

    'rows: for row in rows {
        let row = row?;
        stats.rows_read += 1;

        let mut new_fields = Vec::with_capacity(row.len());
        for (idx, field) in row.fields.iter().enumerate() {
            if !selected.contains(idx + 1) {
                new_fields.push(field.clone());
                continue;
            }
            match mapper
                .map(field)
                .with_context(|| format!("line {}", row.line))?
            {
                Mapped::Value(v) => new_fields.push(v),
                Mapped::SkipField => {}
                Mapped::SkipRow => {
                    stats.rows_skipped += 1;
                    continue 'rows;
                }
            }
        }

        out.write_row(&new_fields)?;
        stats.rows_written += 1;
    }

    out.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{delimited_rows, ReadOptions};

    fn rows(input: &'static str) -> impl Iterator<Item = Result<Row>> {
        delimited_rows(input.as_bytes(), &ReadOptions::default())
    }

    fn table(pairs: &[(&str, &str)], missing: MissingAction) -> MappingTable {
        let mut t = MappingTable::new(missing);
        for (k, v) in pairs {
            t.insert(k.to_string(), v.to_string());
        }
        t
    }

    fn run<M: Mapper>(input: &'static str, mapper: &M, fields: FieldSelection) -> Result<String> {
        let mut out = RowWriter::new(Vec::new(), b'\t');
        remap_rows(rows(input), mapper, &fields, &mut out)?;
        Ok(String::from_utf8(out.into_inner()?)?)
    }

    #[test]
    fn identity_mapping_returns_input_unchanged() {
        let input = "a\tb\tc\nc\ta\tb\n";
        let identity = table(&[("a", "a"), ("b", "b"), ("c", "c")], MissingAction::Fail);
        assert_eq!(run(input, &identity, FieldSelection::All).unwrap(), input);
    }

    #[test]
    fn remaps_only_selected_fields() {
        let t = table(&[("a", "A"), ("b", "B")], MissingAction::Ignore);
        let out = run("a\tb\na\ta\n", &t, FieldSelection::Columns(vec![2])).unwrap();
        assert_eq!(out, "a\tB\na\tA\n");
    }

    #[test]
    fn missing_actions() {
        let input = "a\tz\nb\ta\n";
        let pairs = [("a", "A"), ("b", "B")];

        let ignore = table(&pairs, MissingAction::Ignore);
        assert_eq!(run(input, &ignore, FieldSelection::All).unwrap(), "A\tz\nB\tA\n");

        let warn = table(&pairs, MissingAction::Warn);
        assert_eq!(run(input, &warn, FieldSelection::All).unwrap(), "A\tz\nB\tA\n");

        let skip = table(&pairs, MissingAction::Skip);
        assert_eq!(run(input, &skip, FieldSelection::All).unwrap(), "B\tA\n");

        let empty = table(&pairs, MissingAction::Empty);
        assert_eq!(run(input, &empty, FieldSelection::All).unwrap(), "A\nB\tA\n");

        let fail = table(&pairs, MissingAction::Fail);
        let err = run(input, &fail, FieldSelection::All).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AppError>(),
            Some(&AppError::UnknownId("z".into()))
        );
    }

    #[test]
    fn skip_counts_rows() {
        let t = table(&[("a", "A")], MissingAction::Skip);
        let mut out = RowWriter::new(Vec::new(), b'\t');
        let stats = remap_rows(rows("a\nq\na\n"), &t, &FieldSelection::All, &mut out).unwrap();
        assert_eq!(
            stats,
            RemapStats {
                rows_read: 3,
                rows_written: 2,
                rows_skipped: 1
            }
        );
    }

    #[test]
    fn loads_mapping_from_chosen_columns() {
        let t = MappingTable::from_rows(
            rows("x\told1\tnew1\nx\told2\tnew2\nx\told1\tnew3\n"),
            2,
            3,
            MissingAction::Fail,
        )
        .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.map("old1").unwrap(), Mapped::Value("new3".into()));
        assert_eq!(t.map("old2").unwrap(), Mapped::Value("new2".into()));
    }

    #[test]
    fn short_mapping_rows_are_errors() {
        let err = MappingTable::from_rows(rows("a\tb\nc\n"), 1, 2, MissingAction::Ignore)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn expressions_are_mappers() {
        let e = Expression::parse("x.upper() + '!'").unwrap();
        let out = run("a\tb\n", &e, FieldSelection::Columns(vec![1])).unwrap();
        assert_eq!(out, "A!\tb\n");
    }

    #[test]
    fn identity_mapping_keeps_blank_lines() {
        let options = ReadOptions {
            keep_blank_lines: true,
            ..ReadOptions::default()
        };
        let input = "a\tb\n\nc\td\n";
        let identity = table(&[("a", "a"), ("b", "b"), ("c", "c"), ("d", "d")], MissingAction::Ignore);
        let mut out = RowWriter::new(Vec::new(), b'\t');
        remap_rows(
            delimited_rows(input.as_bytes(), &options),
            &identity,
            &FieldSelection::All,
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out.into_inner().unwrap()).unwrap(), input);
    }

    #[test]
    fn emptied_rows_print_as_empty_lines() {
        let blank = Expression::parse("''").unwrap();
        assert_eq!(run("a\nb\n", &blank, FieldSelection::All).unwrap(), "\n\n");

        let empty = table(&[("b", "B")], MissingAction::Empty);
        let out = run("a\nb\tc\n", &empty, FieldSelection::Columns(vec![1])).unwrap();
        assert_eq!(out, "\nB\tc\n");
    }
}
