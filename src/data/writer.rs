use std::io::{self, Write};

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Delimited output
// ---------------------------------------------------------------------------

/// Writes rows as delimiter-joined lines. Fields are never quoted, so the
/// output round-trips through [`delimited_rows`](super::loader::delimited_rows).
///
/// A row without content (no fields, or one empty field) is written as an
/// empty line.
pub struct RowWriter<W: Write> {
    inner: Option<csv::Writer<W>>,
    delimiter: u8,
}

fn joiner<W: Write>(writer: W, delimiter: u8) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Never)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(writer)
}

fn is_blank<T: AsRef<[u8]>>(fields: &[T]) -> bool {
    match fields {
        [] => true,
        [only] => only.as_ref().is_empty(),
        _ => false,
    }
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W, delimiter: u8) -> Self {
        Self {
            inner: Some(joiner(writer, delimiter)),
            delimiter,
        }
    }

    pub fn write_row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let fields: Vec<T> = fields.into_iter().collect();
        if is_blank(&fields) {
            return self.write_blank_line();
        }
        self.writer()?.write_record(fields)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.take_inner()
    }

    // csv writes a lone empty field as `""`, so blank lines bypass it.
    fn write_blank_line(&mut self) -> Result<()> {
        let mut out = self.take_inner()?;
        out.write_all(b"\n")?;
        self.inner = Some(joiner(out, self.delimiter));
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<W>> {
        self.inner.as_mut().context("output is closed")
    }

    fn take_inner(&mut self) -> Result<W> {
        let inner = self.inner.take().context("output is closed")?;
        inner.into_inner().map_err(|e| {
            let cause = e.error();
            io::Error::new(cause.kind(), format!("flushing output: {cause}")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(rows: &[&[&str]]) -> String {
        let mut w = RowWriter::new(Vec::new(), b'\t');
        for row in rows {
            w.write_row(row.iter()).unwrap();
        }
        String::from_utf8(w.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn joins_fields_without_quotes() {
        assert_eq!(written(&[&["a", "b \"c\"", ""], &["1"]]), "a\tb \"c\"\t\n1\n");
    }

    #[test]
    fn rows_without_content_are_empty_lines() {
        assert_eq!(written(&[&["a"], &[], &["b"]]), "a\n\nb\n");
        assert_eq!(written(&[&[""], &["x", "y"], &[""]]), "\nx\ty\n\n");
    }

    #[test]
    fn two_empty_fields_keep_their_delimiter() {
        assert_eq!(written(&[&["", ""]]), "\t\n");
    }
}
