//! Remapping of identifiers in a file using a mapping file or mapping
//! expression.

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};

use swissknife::cli::{self, parse_delimiter, parse_fields};
use swissknife::data::fields::FieldSelection;
use swissknife::data::loader::{open_rows, ReadOptions};
use swissknife::remap::{remap_rows, Expression, Mapper, MappingTable, MissingAction};

#[derive(Parser, Debug)]
#[command(name = "remap", version, about)]
#[command(group(ArgGroup::new("mapping").required(true).args(["mapping_file", "mapping_expr"])))]
struct Args {
    /// Use DELIM instead of TAB as field delimiter in the input file
    #[arg(short = 'd', long, value_name = "DELIM", default_value = "\\t", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Use DELIM instead of TAB as field delimiter in the mapping file
    #[arg(short = 'D', long, value_name = "DELIM", default_value = "\\t", value_parser = parse_delimiter)]
    mapping_delimiter: u8,

    /// Remap only these fields (e.g. 1,3-5)
    #[arg(short = 'f', long, value_name = "LIST", value_parser = parse_fields)]
    fields: Option<FieldSelection>,

    /// Use the given columns from the mapping file for the old and new IDs
    #[arg(short = 'F', long, value_name = "OLD,NEW", default_value = "1,2", value_parser = parse_fields)]
    mapping_fields: FieldSelection,

    /// Load mappings from the given FILE
    #[arg(short = 'm', long, value_name = "FILE")]
    mapping_file: Option<String>,

    /// Compute the new IDs with EXPR instead of a mapping file; the old
    /// value is available as x (e.g. "x.upper()" or "'id' + x")
    #[arg(long, value_name = "EXPR")]
    mapping_expr: Option<String>,

    /// Stop when an ID cannot be remapped (same as --missing fail)
    #[arg(short = 's', long)]
    strict: bool,

    /// Print a warning for IDs that cannot be remapped (same as --missing warn)
    #[arg(short = 'W', long)]
    warn: bool,

    /// What to do when an ID cannot be remapped
    #[arg(long = "missing", value_name = "ACTION", value_enum, default_value_t = MissingAction::Ignore)]
    missing_action: MissingAction,

    /// Input files; `-` is standard input
    #[arg(value_name = "INFILE", default_value = "-")]
    inputs: Vec<String>,
}

impl Args {
    fn missing_action(&self) -> MissingAction {
        if self.strict {
            MissingAction::Fail
        } else if self.warn {
            MissingAction::Warn
        } else {
            self.missing_action
        }
    }
}

fn build_mapper(args: &Args) -> Result<Box<dyn Mapper>> {
    if let Some(path) = &args.mapping_file {
        let (old, new) = match &args.mapping_fields {
            FieldSelection::Columns(cols) if cols.len() == 2 => (cols[0], cols[1]),
            _ => bail!("-F must specify exactly two columns"),
        };
        let options = ReadOptions {
            delimiter: args.mapping_delimiter,
            ..ReadOptions::default()
        };
        let table = MappingTable::from_rows(open_rows(path, &options)?, old, new, args.missing_action())
            .with_context(|| format!("loading mapping from {path}"))?;
        log::info!("{} entries in mapping {path}", table.len());
        return Ok(Box::new(table));
    }
    match &args.mapping_expr {
        Some(expr) => Ok(Box::new(Expression::parse(expr)?)),
        None => bail!("either -m or --mapping-expr must be given"),
    }
}

fn run(args: Args) -> Result<()> {
    let mapper = build_mapper(&args)?;
    let fields = args.fields.clone().unwrap_or_default();
    let options = ReadOptions {
        delimiter: args.delimiter,
        keep_blank_lines: true,
        ..ReadOptions::default()
    };

    let mut out = cli::stdout_rows(args.delimiter);
    for input in &args.inputs {
        let rows = open_rows(input, &options)?;
        let stats = remap_rows(rows, mapper.as_ref(), &fields, &mut out)
            .with_context(|| format!("remapping {input}"))?;
        log::info!(
            "{input}: {} rows read, {} written, {} skipped",
            stats.rows_read,
            stats.rows_written,
            stats.rows_skipped
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    cli::init_logging();
    let args = Args::parse();
    cli::run_main("remap", || run(args))
}
