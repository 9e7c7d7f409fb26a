//! Glue shared by the command-line front-ends.

use std::io::{self, StdoutLock};
use std::process::ExitCode;

use crate::data::fields::FieldSelection;
use crate::data::writer::RowWriter;
use crate::error::AppError;

/// Set up `env_logger`; warnings are shown unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
}

/// Parse a delimiter argument. Besides a single ASCII character, `\t` and
/// `tab` are accepted for TAB.
pub fn parse_delimiter(s: &str) -> Result<u8, AppError> {
    match s {
        "\\t" | "tab" | "TAB" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(AppError::InvalidDelimiter(s.to_string())),
    }
}

/// Parse a `-f` style column list such as `1,3-5`.
pub fn parse_fields(s: &str) -> Result<FieldSelection, AppError> {
    s.parse()
}

/// Row writer on standard output.
pub fn stdout_rows(delimiter: u8) -> RowWriter<StdoutLock<'static>> {
    RowWriter::new(io::stdout().lock(), delimiter)
}

/// Run a tool's body, reporting failures as `NAME: error: ...` on stderr.
/// A closed stdout (e.g. piping into `head`) ends the program quietly.
pub fn run_main(name: &str, body: impl FnOnce() -> anyhow::Result<()>) -> ExitCode {
    match body() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_broken_pipe(&e) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{e:?}");
            eprintln!("{name}: error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn is_broken_pipe(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            return io.kind() == io::ErrorKind::BrokenPipe;
        }
        if let Some(csv) = cause.downcast_ref::<csv::Error>() {
            if let csv::ErrorKind::Io(io) = csv.kind() {
                return io.kind() == io::ErrorKind::BrokenPipe;
            }
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiters() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter("::").is_err());
        assert!(parse_delimiter("é").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn broken_pipe_is_detected_through_context() {
        let err = anyhow::Error::new(io::Error::from(io::ErrorKind::BrokenPipe))
            .context("writing output");
        assert!(is_broken_pipe(&err));
        assert!(!is_broken_pipe(&anyhow::anyhow!("other")));
    }
}
