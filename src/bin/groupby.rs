//! Groups the rows of a file by the value of a key column.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use swissknife::cli::{self, parse_delimiter, parse_fields};
use swissknife::data::fields::FieldSelection;
use swissknife::data::loader::{open_rows, ReadOptions};
use swissknife::groupby::{group_rows, GroupByOptions};

#[derive(Parser, Debug)]
#[command(name = "groupby", version, about)]
struct Args {
    /// Use DELIM instead of TAB as field delimiter in the input
    #[arg(short = 'd', long, value_name = "DELIM", default_value = "\\t", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Use DELIM as field delimiter in the output (default: the input delimiter)
    #[arg(short = 'D', long, value_name = "DELIM", value_parser = parse_delimiter)]
    output_delimiter: Option<u8>,

    /// Use only these fields; the first one is the key (e.g. 3,1-2)
    #[arg(short = 'f', long, value_name = "LIST", value_parser = parse_fields)]
    fields: Option<FieldSelection>,

    /// List every value only once per key
    #[arg(short = 'u', long)]
    unique: bool,

    /// Strip whitespace around fields
    #[arg(long)]
    strip: bool,

    /// Input files; `-` is standard input
    #[arg(value_name = "INFILE", default_value = "-")]
    inputs: Vec<String>,
}

fn run(args: Args) -> Result<()> {
    let read = ReadOptions {
        delimiter: args.delimiter,
        strip: args.strip,
        ..ReadOptions::default()
    };
    let options = GroupByOptions {
        fields: args.fields.unwrap_or_default(),
        unique: args.unique,
    };

    let mut out = cli::stdout_rows(args.output_delimiter.unwrap_or(args.delimiter));
    for input in &args.inputs {
        let rows = open_rows(input, &read)?;
        let groups = group_rows(rows, &options, &mut out).with_context(|| format!("grouping {input}"))?;
        log::info!("{input}: {groups} groups");
    }
    Ok(())
}

fn main() -> ExitCode {
    cli::init_logging();
    let args = Args::parse();
    cli::run_main("groupby", || run(args))
}
