use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::options::DateAxes;
use super::style::{split_headers, StyleSpec};
use crate::data::fields::FieldSelection;
use crate::data::loader::{open_rows, ReadOptions};
use crate::data::model::{parse_number, Row};

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone)]
pub struct TableOptions {
    pub delimiter: u8,
    pub strip: bool,
    pub fields: FieldSelection,
    /// Keep the header and every Nth data row.
    pub every: usize,
    pub dates: DateAxes,
    pub date_format: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            delimiter: b'\t',
            strip: false,
            fields: FieldSelection::All,
            every: 1,
            dates: DateAxes::None,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Rows of numbers read from one input. Cells that are not numbers (or,
/// on a date column, not dates) are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericTable {
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl NumericTable {
    /// Header labels with their `[[...]]` style overrides split off.
    /// Without a header both lists are empty.
    pub fn labels(&self) -> (Vec<String>, Vec<Option<StyleSpec>>) {
        match &self.headers {
            Some(headers) => split_headers(headers),
            None => (Vec::new(), Vec::new()),
        }
    }
}

/// Days since the Unix epoch of a date (or date and time) in `format`.
pub fn parse_date(s: &str, format: &str) -> Option<f64> {
    let s = s.trim();
    let datetime = NaiveDateTime::parse_from_str(s, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(datetime.and_utc().timestamp() as f64 / SECONDS_PER_DAY)
}

/// Inverse of [`parse_date`], for tick labels.
pub fn format_date(days: f64, format: &str) -> String {
    if !days.is_finite() {
        return String::new();
    }
    DateTime::from_timestamp((days * SECONDS_PER_DAY).round() as i64, 0)
        .map(|d| d.format(format).to_string())
        .unwrap_or_default()
}

fn parse_cell(cell: &str, is_date: bool, date_format: &str) -> Option<f64> {
    if is_date {
        parse_date(cell, date_format)
    } else {
        parse_number(cell).filter(|v| v.is_finite())
    }
}

/// Convert rows into a [`NumericTable`]. The first non-empty row is the
/// header if any selected cell of it fails to parse.
pub fn read_table<I>(rows: I, options: &TableOptions) -> Result<NumericTable>
where
    I: IntoIterator<Item = Result<Row>>,
{
    let x_is_date = options.dates == DateAxes::X;
    let every = options.every.max(1);
    let mut table = NumericTable::default();
    let mut first = true;
    let mut data_index = 0usize;

    for row in rows {
        let row = row?;
        let cells = options.fields.select_owned(row.fields);
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let values: Vec<Option<f64>> = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| parse_cell(cell, x_is_date && idx == 0, &options.date_format))
            .collect();

        if first {
            first = false;
            let is_header = cells
                .iter()
                .zip(&values)
                .any(|(cell, value)| value.is_none() && !cell.trim().is_empty());
            if is_header {
                table.headers = Some(cells.iter().map(|c| c.trim().to_string()).collect());
                continue;
            }
        }

        if data_index % every == 0 {
            table.rows.push(values);
        }
        data_index += 1;
    }
    Ok(table)
}

/// Open `path` and read it as a numeric table.
pub fn load_table(path: &str, options: &TableOptions) -> Result<NumericTable> {
    let read = ReadOptions {
        delimiter: options.delimiter,
        strip: options.strip,
        ..ReadOptions::default()
    };
    read_table(open_rows(path, &read)?, options).with_context(|| format!("reading {path}"))
}
