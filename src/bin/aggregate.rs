//! Aggregates numeric values across aligned files, or down the columns of
//! each file.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use swissknife::aggregate::{aggregate, AggregateOptions, Mode, Source};
use swissknife::cli::{self, parse_delimiter, parse_fields};
use swissknife::data::fields::FieldSelection;
use swissknife::data::loader::{open_rows, ReadOptions};
use swissknife::stats::AggregateFn;

#[derive(Parser, Debug)]
#[command(name = "aggregate", version, about)]
struct Args {
    /// Use DELIM instead of TAB as field delimiter in the input files
    #[arg(short = 'd', long, value_name = "DELIM", default_value = "\\t", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Use DELIM instead of TAB as field delimiter in the output
    #[arg(short = 'D', long, value_name = "DELIM", default_value = "\\t", value_parser = parse_delimiter)]
    output_delimiter: u8,

    /// Use only these fields, in this order (e.g. 1,3-5)
    #[arg(short = 'f', long, value_name = "LIST", value_parser = parse_fields)]
    fields: Option<FieldSelection>,

    /// Aggregation function
    #[arg(short = 'F', long, value_name = "FUNC", value_enum, default_value_t = AggregateFn::Mean)]
    function: AggregateFn,

    /// Aggregate across files (multiple) or down the columns of each file
    #[arg(short = 'm', long, value_name = "MODE", value_enum, default_value_t = Mode::Multiple)]
    mode: Mode,

    /// Strip whitespace around fields
    #[arg(long)]
    strip: bool,

    /// Input files; `-` is standard input
    #[arg(value_name = "INFILE", required = true)]
    inputs: Vec<String>,
}

fn run(args: Args) -> Result<()> {
    let read = ReadOptions {
        delimiter: args.delimiter,
        strip: args.strip,
        ..ReadOptions::default()
    };
    let sources = args
        .inputs
        .iter()
        .map(|input| Ok(Source::new(input.clone(), open_rows(input, &read)?)))
        .collect::<Result<Vec<_>>>()?;
    log::info!("aggregating {} files with {:?}", sources.len(), args.function);

    let options = AggregateOptions {
        function: args.function,
        mode: args.mode,
        fields: args.fields.unwrap_or_default(),
    };
    let mut out = cli::stdout_rows(args.output_delimiter);
    aggregate(sources, &options, &mut out)
}

fn main() -> ExitCode {
    cli::init_logging();
    let args = Args::parse();
    cli::run_main("aggregate", || run(args))
}
