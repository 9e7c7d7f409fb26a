use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Row;

/// A stream of rows read from one input.
pub type Rows = Box<dyn Iterator<Item = Result<Row>>>;

/// How delimiter-separated text inputs are split into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub delimiter: u8,
    /// Trim leading and trailing whitespace from every field.
    pub strip: bool,
    /// Report empty lines as rows holding one empty field instead of
    /// skipping them.
    pub keep_blank_lines: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            strip: false,
            keep_blank_lines: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Open an input for reading. `-` is standard input; `.gz` and `.bz2`
/// suffixes are decompressed on the fly.
pub fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(path).with_context(|| format!("cannot open {path}"))?;
    match extension(path).as_str() {
        "gz" => {
            log::debug!("decompressing {path} with gzip");
            Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
        }
        "bz2" => {
            log::debug!("decompressing {path} with bzip2");
            Ok(Box::new(MultiBzDecoder::new(BufReader::new(file))))
        }
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// Open an input as a stream of rows. Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – header row from the schema, then one row per record
/// * `.json`            – array of objects, object of key/value pairs, or
///   array of arrays
/// * anything else      – delimiter-separated text (optionally gzip or
///   bzip2 compressed)
pub fn open_rows(path: &str, options: &ReadOptions) -> Result<Rows> {
    log::info!("reading {path}");
    match extension(path).as_str() {
        "parquet" | "pq" => Ok(Box::new(load_parquet(path)?.into_iter().map(Ok))),
        "json" => Ok(Box::new(load_json(path)?.into_iter().map(Ok))),
        _ => {
            let reader = open_input(path)?;
            let path = path.to_string();
            Ok(Box::new(delimited_rows(reader, options).map(move |row| {
                row.with_context(|| format!("reading {path}"))
            })))
        }
    }
}

/// Split any reader into rows. Quotes carry no meaning and rows may have any
/// number of fields.
pub fn delimited_rows<R: Read + 'static>(reader: R, options: &ReadOptions) -> Rows {
    if options.keep_blank_lines {
        return line_rows(reader, options);
    }
    let trim = if options.strip {
        csv::Trim::All
    } else {
        csv::Trim::None
    };
    let reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(trim)
        .from_reader(reader);

    Box::new(reader.into_records().map(|result| -> Result<Row> {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Ok(Row::new(line, record.iter().map(str::to_string).collect()))
    }))
}

// csv::Reader skips empty lines, so inputs whose blank lines must survive
// are split line by line.
fn line_rows<R: Read + 'static>(reader: R, options: &ReadOptions) -> Rows {
    let delimiter = char::from(options.delimiter);
    let strip = options.strip;
    Box::new(
        BufReader::new(reader)
            .split(b'\n')
            .zip(1u64..)
            .map(move |(line, number)| -> Result<Row> {
                let mut bytes = line?;
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                let text = String::from_utf8(bytes)
                    .with_context(|| format!("line {number} is not valid UTF-8"))?;
                let fields = text
                    .split(delimiter)
                    .map(|f| {
                        let f = if strip { f.trim() } else { f };
                        f.to_string()
                    })
                    .collect();
                Ok(Row::new(number, fields))
            }),
    )
}

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Accepted layouts:
///
/// ```json
/// [{"name": "a", "value": 1}, {"name": "b", "value": 2}]
/// {"old": "new", "foo": "bar"}
/// [["a", 1], ["b", 2]]
/// ```
fn load_json(path: &str) -> Result<Vec<Row>> {
    let reader = open_input(path)?;
    let root: JsonValue =
        serde_json::from_reader(reader).with_context(|| format!("parsing JSON in {path}"))?;
    json_to_rows(&root).with_context(|| format!("reading {path}"))
}

fn json_to_rows(root: &JsonValue) -> Result<Vec<Row>> {
    let rows: Vec<Vec<String>> = match root {
        JsonValue::Object(map) => map
            .iter()
            .map(|(key, val)| vec![key.clone(), json_cell(val)])
            .collect(),
        JsonValue::Array(items) if items.iter().all(JsonValue::is_object) => {
            let mut header: Vec<String> = Vec::new();
            for item in items.iter().filter_map(JsonValue::as_object) {
                for key in item.keys() {
                    if !header.contains(key) {
                        header.push(key.clone());
                    }
                }
            }
            let body = items.iter().filter_map(JsonValue::as_object).map(|obj| {
                header
                    .iter()
                    .map(|key| obj.get(key).map(json_cell).unwrap_or_default())
                    .collect::<Vec<_>>()
            });
            let mut rows = Vec::with_capacity(items.len() + 1);
            if !header.is_empty() {
                rows.push(header.clone());
            }
            rows.extend(body);
            rows
        }
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_array()
                    .map(|cells| cells.iter().map(json_cell).collect())
                    .with_context(|| format!("item {i} is neither an object nor an array"))
            })
            .collect::<Result<_>>()?,
        other => bail!("expected a JSON array or object, found {other}"),
    };

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, fields)| Row::new(i as u64 + 1, fields))
        .collect())
}

fn json_cell(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file as rows of strings. The first row holds the column
/// names; nulls become empty strings.
fn load_parquet(path: &str) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("cannot open {path}"))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let header: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = vec![Row::new(1, header)];
    let options = FormatOptions::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<Result<Vec<_>, _>>()
            .context("formatting parquet columns")?;

        for row in 0..batch.num_rows() {
            let fields = formatters
                .iter()
                .map(|f| f.value(row).to_string())
                .collect();
            let line = rows.len() as u64 + 1;
            rows.push(Row::new(line, fields));
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect(input: &'static str, options: &ReadOptions) -> Vec<Vec<String>> {
        delimited_rows(input.as_bytes(), options)
            .map(|r| r.unwrap().fields)
            .collect()
    }

    #[test]
    fn splits_on_the_delimiter_without_quoting() {
        let rows = collect("a\t\"b\tc\n1\t2\n", &ReadOptions::default());
        assert_eq!(rows, vec![vec!["a", "\"b", "c"], vec!["1", "2"]]);
    }

    #[test]
    fn tracks_line_numbers() {
        let rows: Vec<Row> = delimited_rows("x,y\n1,2\n".as_bytes(), &ReadOptions {
            delimiter: b',',
            ..ReadOptions::default()
        })
        .map(Result::unwrap)
        .collect();
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn strip_trims_fields() {
        let options = ReadOptions {
            delimiter: b',',
            strip: true,
            ..ReadOptions::default()
        };
        assert_eq!(collect("  a , b \n", &options), vec![vec!["a", "b"]]);
    }

    #[test]
    fn json_records_get_a_header() {
        let rows = json_to_rows(&json!([
            {"name": "a", "value": 1},
            {"name": "b", "extra": null}
        ]))
        .unwrap();
        let fields: Vec<_> = rows.into_iter().map(|r| r.fields).collect();
        assert_eq!(fields[0], vec!["name", "value", "extra"]);
        assert_eq!(fields[1], vec!["a", "1", ""]);
        assert_eq!(fields[2], vec!["b", "", ""]);
    }

    #[test]
    fn json_object_becomes_key_value_rows() {
        let rows = json_to_rows(&json!({"x": "y", "n": 3})).unwrap();
        let fields: Vec<_> = rows.into_iter().map(|r| r.fields).collect();
        assert!(fields.contains(&vec!["x".to_string(), "y".to_string()]));
        assert!(fields.contains(&vec!["n".to_string(), "3".to_string()]));
    }

    #[test]
    fn json_scalars_are_rejected() {
        assert!(json_to_rows(&json!(42)).is_err());
    }

    #[test]
    fn reads_gzipped_files() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"1\t2\n3\t4\n").unwrap();
        enc.finish().unwrap();

        let rows: Vec<_> = open_rows(path.to_str().unwrap(), &ReadOptions::default())
            .unwrap()
            .map(|r| r.unwrap().fields)
            .collect();
        assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn blank_lines_are_kept_on_request() {
        let options = ReadOptions {
            keep_blank_lines: true,
            ..ReadOptions::default()
        };
        let rows: Vec<Row> = delimited_rows("a\tb\n\nc\td\r\n".as_bytes(), &options)
            .map(Result::unwrap)
            .collect();
        let fields: Vec<_> = rows.iter().map(|r| r.fields.clone()).collect();
        assert_eq!(fields, vec![vec!["a", "b"], vec![""], vec!["c", "d"]]);
        assert_eq!(rows[2].line, 3);

        assert_eq!(
            collect("a\n\nb\n", &ReadOptions::default()),
            vec![vec!["a"], vec!["b"]]
        );
    }

    #[test]
    fn reads_bzip2_files() {
        use bzip2::write::BzEncoder;
        use bzip2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv.bz2");
        let mut enc = BzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"x\ty\n5\t6\n").unwrap();
        enc.finish().unwrap();

        let rows: Vec<_> = open_rows(path.to_str().unwrap(), &ReadOptions::default())
            .unwrap()
            .map(|r| r.unwrap().fields)
            .collect();
        assert_eq!(rows, vec![vec!["x", "y"], vec!["5", "6"]]);
    }

    #[test]
    fn parquet_rows_follow_the_schema_header() {
        use std::sync::Arc;

        use arrow::array::{ArrayRef, Int32Array, StringArray};
        use arrow::datatypes::{DataType, Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = |ids: Vec<i32>, names: Vec<Option<&str>>| {
            RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Int32Array::from(ids)) as ArrayRef,
                    Arc::new(StringArray::from(names)) as ArrayRef,
                ],
            )
            .unwrap()
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.parquet");
        let mut writer =
            ArrowWriter::try_new(File::create(&path).unwrap(), schema.clone(), None).unwrap();
        writer.write(&batch(vec![1, 2], vec![Some("a"), None])).unwrap();
        writer.flush().unwrap();
        writer.write(&batch(vec![3], vec![Some("c")])).unwrap();
        writer.close().unwrap();

        let rows: Vec<Row> = open_rows(path.to_str().unwrap(), &ReadOptions::default())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        let fields: Vec<_> = rows.iter().map(|r| r.fields.clone()).collect();
        assert_eq!(
            fields,
            vec![
                vec!["id", "name"],
                vec!["1", "a"],
                vec!["2", ""],
                vec!["3", "c"],
            ]
        );
        let lines: Vec<_> = rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }
}
