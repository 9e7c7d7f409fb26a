//! Aggregation of aligned tabular files (`aggregate`).
//!
//! In [`Mode::Multiple`] the files are read in lockstep and cell (i, j) of
//! the output aggregates cell (i, j) of every input. In [`Mode::Column`]
//! each file is reduced to a single line, one value per column.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

use crate::data::fields::FieldSelection;
use crate::data::model::{format_number, is_numeric_row, parse_number, Row};
use crate::data::writer::RowWriter;
use crate::error::AppError;
use crate::stats::AggregateFn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// One output line per input file, aggregating down each column.
    Column,
    /// Row i of the output aggregates row i of every input file.
    #[default]
    Multiple,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub function: AggregateFn,
    pub mode: Mode,
    pub fields: FieldSelection,
}

/// An input file and the rows read from it.
pub struct Source<I> {
    pub name: String,
    pub rows: I,
}

impl<I> Source<I> {
    pub fn new(name: impl Into<String>, rows: I) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

pub fn aggregate<I, W>(
    sources: Vec<Source<I>>,
    options: &AggregateOptions,
    out: &mut RowWriter<W>,
) -> Result<()>
where
    I: Iterator<Item = Result<Row>>,
    W: Write,
{
    match options.mode {
        Mode::Multiple => aggregate_multiple(sources, options, out)?,
        Mode::Column => {
            for (idx, source) in sources.into_iter().enumerate() {
                let name = source.name.clone();
                aggregate_columns(source, options, idx == 0, out)
                    .with_context(|| format!("aggregating {name}"))?;
            }
        }
    }
    out.flush()
}

/// Convert the selected cells of a data row to numbers.
fn parse_data_row(row: &Row, cells: &[String], fields: &FieldSelection) -> Result<Vec<f64>, AppError> {
    cells
        .iter()
        .enumerate()
        .map(|(pos, cell)| {
            parse_number(cell).ok_or_else(|| AppError::NotANumber {
                line: row.line,
                column: fields.column_number(pos),
                value: cell.clone(),
            })
        })
        .collect()
}

fn aggregate_multiple<I, W>(
    mut sources: Vec<Source<I>>,
    options: &AggregateOptions,
    out: &mut RowWriter<W>,
) -> Result<()>
where
    I: Iterator<Item = Result<Row>>,
    W: Write,
{
    if sources.is_empty() {
        bail!("no input files to aggregate");
    }
    let func = options.function;
    let mut data_started = false;

    loop {
        let mut rows = Vec::with_capacity(sources.len());
        let mut exhausted = Vec::new();
        for source in sources.iter_mut() {
            match source.rows.next() {
                Some(row) => rows.push(row?),
                None => exhausted.push(source.name.clone()),
            }
        }
        if !exhausted.is_empty() {
            if !rows.is_empty() {
                log::warn!(
                    "input files have different lengths; output stops at the end of {}",
                    exhausted.join(", ")
                );
            }
            return Ok(());
        }

        let selected: Vec<Vec<String>> = rows
            .iter()
            .map(|row| options.fields.select(&row.fields))
            .collect();

        if !data_started {
            if selected.iter().any(|cells| !is_numeric_row(cells)) {
                // Header row: printed once, from the first file.
                out.write_row(func.expand_headers(&selected[0]))?;
                continue;
            }
            data_started = true;
        }

        let width = selected[0].len();
        let mut values = Vec::with_capacity(selected.len());
        for ((source, row), cells) in sources.iter().zip(&rows).zip(&selected) {
            if cells.len() != width {
                return Err(AppError::ColumnCountMismatch {
                    line: row.line,
                    expected: width,
                    found: cells.len(),
                })
                .with_context(|| format!("reading {}", source.name));
            }
            values.push(
                parse_data_row(row, cells, &options.fields)
                    .with_context(|| format!("reading {}", source.name))?,
            );
        }

        let mut output = Vec::with_capacity(width * func.suffixes().len());
        let mut items = Vec::with_capacity(values.len());
        for col in 0..width {
            items.clear();
            items.extend(values.iter().map(|v| v[col]));
            output.extend(func.apply(&items).into_iter().map(format_number));
        }
        out.write_row(&output)?;
    }
}

fn aggregate_columns<I, W>(
    source: Source<I>,
    options: &AggregateOptions,
    first_file: bool,
    out: &mut RowWriter<W>,
) -> Result<()>
where
    I: Iterator<Item = Result<Row>>,
    W: Write,
{
    let func = options.function;
    let mut data_started = false;
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for row in source.rows {
        let row = row?;
        let cells = options.fields.select(&row.fields);

        if !data_started {
            if !is_numeric_row(&cells) {
                if first_file {
                    out.write_row(func.expand_headers(&cells))?;
                }
                continue;
            }
            data_started = true;
        }

        let values = parse_data_row(&row, &cells, &options.fields)?;
        if columns.len() < values.len() {
            columns.resize_with(values.len(), Vec::new);
        }
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    let output: Vec<String> = columns
        .iter()
        .flat_map(|column| func.apply(column))
        .map(format_number)
        .collect();
    out.write_row(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{delimited_rows, ReadOptions};

    fn source(name: &str, input: &'static str) -> Source<impl Iterator<Item = Result<Row>>> {
        Source::new(name, delimited_rows(input.as_bytes(), &ReadOptions::default()))
    }

    fn run(inputs: &[&'static str], options: &AggregateOptions) -> Result<String> {
        let sources = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| source(&format!("in{i}"), input))
            .collect();
        let mut out = RowWriter::new(Vec::new(), b'\t');
        aggregate(sources, options, &mut out)?;
        Ok(String::from_utf8(out.into_inner()?)?)
    }

    #[test]
    fn multiple_mode_needs_an_input() {
        let err = run(&[], &AggregateOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no input files"));
    }

    #[test]
    fn mean_of_identical_files_is_the_file() {
        let file = "a\tb\n1.0\t2.5\n-3.0\t4.0\n";
        let out = run(&[file, file, file], &AggregateOptions::default()).unwrap();
        assert_eq!(out, file);
    }

    #[test]
    fn aggregates_cell_by_cell() {
        let options = AggregateOptions {
            function: AggregateFn::Sum,
            ..Default::default()
        };
        let out = run(&["1\t2\n3\t4\n", "10\t20\n30\t40\n"], &options).unwrap();
        assert_eq!(out, "11.0\t22.0\n33.0\t44.0\n");
    }

    #[test]
    fn multi_valued_functions_expand_headers() {
        let options = AggregateOptions {
            function: AggregateFn::MeanSd,
            ..Default::default()
        };
        let out = run(&["x\n1\n", "x\n3\n"], &options).unwrap();
        let sd = 2f64.sqrt();
        assert_eq!(out, format!("x\tx_sd\n2.0\t{sd}\n"));
    }

    #[test]
    fn field_selection_reorders_columns() {
        let options = AggregateOptions {
            fields: FieldSelection::Columns(vec![3, 1]),
            function: AggregateFn::Max,
            ..Default::default()
        };
        let out = run(&["1\t9\t5\n", "2\t9\t4\n"], &options).unwrap();
        assert_eq!(out, "5.0\t2.0\n");
    }

    #[test]
    fn non_numeric_data_is_an_error() {
        let err = run(&["1\n2\n", "1\nxx\n"], &AggregateOptions::default()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AppError>(),
            Some(&AppError::NotANumber {
                line: 2,
                column: 1,
                value: "xx".into()
            })
        );
    }

    #[test]
    fn column_count_mismatch_is_an_error() {
        let err = run(&["1\t2\n", "1\n"], &AggregateOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::ColumnCountMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn stops_at_the_shortest_file() {
        let out = run(&["1\n2\n3\n", "3\n4\n"], &AggregateOptions::default()).unwrap();
        assert_eq!(out, "2.0\n3.0\n");
    }

    #[test]
    fn column_mode_reduces_each_file_to_one_line() {
        let options = AggregateOptions {
            mode: Mode::Column,
            function: AggregateFn::Median,
            ..Default::default()
        };
        let out = run(&["a\tb\n1\t10\n2\t20\n9\t30\n", "a\tb\n4\t1\n"], &options).unwrap();
        assert_eq!(out, "a\tb\n2.0\t20.0\n4.0\t1.0\n");
    }

    #[test]
    fn column_mode_accepts_ragged_rows() {
        let options = AggregateOptions {
            mode: Mode::Column,
            function: AggregateFn::Sum,
            ..Default::default()
        };
        let out = run(&["1\n2\t5\n3\n"], &options).unwrap();
        assert_eq!(out, "6.0\t5.0\n");
    }
}
