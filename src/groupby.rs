//! Grouping rows by their key column (`groupby`).

use std::collections::{HashMap, HashSet};
use std::io::Write;

use anyhow::Result;

use crate::data::fields::FieldSelection;
use crate::data::model::Row;
use crate::data::writer::RowWriter;

#[derive(Debug, Clone, Default)]
pub struct GroupByOptions {
    /// Columns to use; the first selected column is the key.
    pub fields: FieldSelection,
    /// Keep each value at most once per key.
    pub unique: bool,
}

/// Values collected for one key, in first-seen order.
#[derive(Debug, Default)]
struct Group {
    values: Vec<String>,
    seen: HashSet<String>,
}

impl Group {
    fn extend(&mut self, values: impl IntoIterator<Item = String>, unique: bool) {
        for value in values {
            if unique {
                if self.seen.contains(&value) {
                    continue;
                }
                self.seen.insert(value.clone());
            }
            self.values.push(value);
        }
    }
}

/// Group `rows` by key and write one `key, values...` row per key, keys in
/// the order they first appear. Returns the number of groups written.
pub fn group_rows<I, W>(rows: I, options: &GroupByOptions, out: &mut RowWriter<W>) -> Result<usize>
where
    I: IntoIterator<Item = Result<Row>>,
    W: Write,
{
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group> = HashMap::new();

    for row in rows {
        let row = row?;
        let mut parts = options.fields.select_owned(row.fields).into_iter();
        let Some(key) = parts.next() else {
            continue;
        };
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Group::default()
        });
        group.extend(parts, options.unique);
    }

    for key in &order {
        let values = groups.get(key).map(|g| g.values.as_slice()).unwrap_or_default();
        out.write_row(std::iter::once(key).chain(values))?;
    }
    out.flush()?;
    log::debug!("wrote {} groups", order.len());
    Ok(order.len())
}
