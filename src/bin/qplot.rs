//! Quick plots of tabular data files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use swissknife::cli::{self, parse_delimiter, parse_fields};
use swissknife::color::Colormap;
use swissknife::data::fields::FieldSelection;
use swissknife::plot::options::{
    parse_legend, AxisFormat, AxisOptions, AxisRange, DateAxes, ErrorBars, FigureSize, GridSize,
    HeatmapOptions, InterpolationMethod, PlotType,
};
use swissknife::plot::table::TableOptions;
use swissknife::plot::{self, PlotOptions};

#[derive(Parser, Debug)]
#[command(name = "qplot", version, about)]
struct Args {
    // ---- Input settings ----
    /// Use DELIM instead of TAB as field delimiter
    #[arg(short = 'd', long, value_name = "DELIM", default_value = "\\t", value_parser = parse_delimiter, help_heading = "Input settings")]
    delimiter: u8,

    /// Treat values of these axes as dates
    #[arg(short = 'D', long, value_name = "AXES", value_enum, default_value_t = DateAxes::None, help_heading = "Input settings")]
    dates: DateAxes,

    /// strftime-style format of dates
    #[arg(long, value_name = "FORMAT", default_value = "%Y-%m-%d", help_heading = "Input settings")]
    date_format: String,

    /// Draw error bars; every second Y column holds the errors of the previous one
    #[arg(short = 'e', long, value_name = "AXES", value_enum, default_value_t = ErrorBars::None, help_heading = "Input settings")]
    errorbars: ErrorBars,

    /// Use only these fields, in this order (e.g. 1,3-5)
    #[arg(short = 'f', long, value_name = "LIST", value_parser = parse_fields, help_heading = "Input settings")]
    fields: Option<FieldSelection>,

    /// Use the header and every Nth data row only
    #[arg(long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..), help_heading = "Input settings")]
    every: u64,

    /// Strip whitespace around fields
    #[arg(long, help_heading = "Input settings")]
    strip: bool,

    // ---- Output settings ----
    /// Save the plot to FILE (.png, .jpg, .bmp or .svg) instead of showing it
    #[arg(short = 'o', long, value_name = "FILE", help_heading = "Output settings")]
    output: Option<PathBuf>,

    /// Figure size in inches, e.g. 8x6, 20x15cm or 200mmx150mm
    #[arg(short = 's', long, value_name = "WxH", default_value = "8x6", help_heading = "Output settings")]
    size: FigureSize,

    /// Plot type
    #[arg(short = 't', long = "type", value_name = "TYPE", value_enum, default_value_t = PlotType::Line, help_heading = "Output settings")]
    plot_type: PlotType,

    /// Font size in points
    #[arg(long, value_name = "SIZE", help_heading = "Output settings")]
    font_size: Option<f64>,

    /// Legend location: best, upper right, upper left, lower left, lower right,
    /// right, center left, center right, lower center, upper center, center, or none
    #[arg(long, value_name = "LOCATION", default_value = "best", help_heading = "Output settings")]
    legend: String,

    /// Do not show the legend
    #[arg(long, help_heading = "Output settings")]
    no_legend: bool,

    /// Do not show a title
    #[arg(long, help_heading = "Output settings")]
    no_title: bool,

    /// Scale marker sizes and line widths by FACTOR
    #[arg(long, value_name = "FACTOR", default_value_t = 1.0, help_heading = "Output settings")]
    scale: f64,

    /// Title of the plot (default: the input file names)
    #[arg(long, value_name = "TITLE", help_heading = "Output settings")]
    title: Option<String>,

    /// Put every second series on a secondary Y axis
    #[arg(long, help_heading = "Output settings")]
    twin: bool,

    // ---- Axis settings ----
    #[arg(long, value_name = "LABEL", help_heading = "Axis settings", help = "Label of the X axis")]
    xlabel: Option<String>,
    #[arg(long, value_name = "LABEL", help_heading = "Axis settings", help = "Label of the Y axis")]
    ylabel: Option<String>,
    #[arg(long, value_name = "LABEL", help_heading = "Axis settings", help = "Label of the secondary Y axis")]
    y2label: Option<String>,
    #[arg(long, value_name = "LABEL", help_heading = "Axis settings", help = "Label of the Z axis")]
    zlabel: Option<String>,

    #[arg(long, value_name = "MIN:MAX", help_heading = "Axis settings", help = "Range of the X axis")]
    xrange: Option<AxisRange>,
    #[arg(long, value_name = "MIN:MAX", help_heading = "Axis settings", help = "Range of the Y axis")]
    yrange: Option<AxisRange>,
    #[arg(long, value_name = "MIN:MAX", help_heading = "Axis settings", help = "Range of the secondary Y axis")]
    y2range: Option<AxisRange>,
    #[arg(long, value_name = "MIN:MAX", help_heading = "Axis settings", help = "Range of the Z axis (colour scale of heatmaps)")]
    zrange: Option<AxisRange>,

    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = AxisFormat::Numeric, help_heading = "Axis settings", help = "Tick label format of the X axis")]
    xformat: AxisFormat,
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = AxisFormat::Numeric, help_heading = "Axis settings", help = "Tick label format of the Y axis")]
    yformat: AxisFormat,
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = AxisFormat::Numeric, help_heading = "Axis settings", help = "Tick label format of the secondary Y axis")]
    y2format: AxisFormat,
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = AxisFormat::Numeric, help_heading = "Axis settings", help = "Tick label format of the Z axis")]
    zformat: AxisFormat,

    #[arg(long, help_heading = "Axis settings", help = "Hide the tick labels of the X axis")]
    no_x_tick_labels: bool,
    #[arg(long, help_heading = "Axis settings", help = "Hide the tick labels of the Y axis")]
    no_y_tick_labels: bool,
    #[arg(long, help_heading = "Axis settings", help = "Hide the tick labels of the secondary Y axis")]
    no_y2_tick_labels: bool,
    #[arg(long, help_heading = "Axis settings", help = "Hide the tick labels of the Z axis")]
    no_z_tick_labels: bool,

    // ---- Heatmap settings ----
    /// Colormap of heatmaps, contours and 3D plots
    #[arg(long, value_name = "NAME", value_enum, default_value_t = Colormap::Jet, help_heading = "Heatmap settings")]
    colormap: Colormap,

    /// Draw contour lines
    #[arg(long, help_heading = "Heatmap settings")]
    contours: bool,

    /// Draw contour lines with level labels
    #[arg(long, help_heading = "Heatmap settings")]
    contour_labels: bool,

    /// Number of interpolation grid points
    #[arg(long, value_name = "WxH", default_value = "50x50", help_heading = "Heatmap settings")]
    grid_size: GridSize,

    /// Interpolation method for scattered data
    #[arg(long, value_name = "METHOD", value_enum, default_value_t = InterpolationMethod::Linear, help_heading = "Heatmap settings")]
    interpolate: InterpolationMethod,

    /// Do not draw a colour bar
    #[arg(long, help_heading = "Heatmap settings")]
    no_colorbar: bool,

    /// Input files; `-` is standard input
    #[arg(value_name = "INFILE", default_value = "-")]
    inputs: Vec<String>,
}

fn axis(label: Option<String>, range: Option<AxisRange>, format: AxisFormat, hide_ticks: bool) -> AxisOptions {
    AxisOptions {
        label,
        range: range.unwrap_or_default(),
        format,
        tick_labels: !hide_ticks,
    }
}

impl Args {
    fn into_options(self) -> Result<(Vec<String>, PlotOptions)> {
        let legend = if self.no_legend {
            None
        } else {
            parse_legend(&self.legend)?
        };
        let options = PlotOptions {
            plot_type: self.plot_type,
            table: TableOptions {
                delimiter: self.delimiter,
                strip: self.strip,
                fields: self.fields.unwrap_or_default(),
                every: usize::try_from(self.every)?,
                dates: self.dates,
                date_format: self.date_format,
            },
            errorbars: self.errorbars,
            output: self.output,
            size: self.size,
            font_size: self.font_size,
            legend,
            title: self.title,
            no_title: self.no_title,
            scale: self.scale,
            twin: self.twin,
            x: axis(self.xlabel, self.xrange, self.xformat, self.no_x_tick_labels),
            y: axis(self.ylabel, self.yrange, self.yformat, self.no_y_tick_labels),
            y2: axis(self.y2label, self.y2range, self.y2format, self.no_y2_tick_labels),
            z: axis(self.zlabel, self.zrange, self.zformat, self.no_z_tick_labels),
            heatmap: HeatmapOptions {
                colormap: self.colormap,
                contours: self.contours,
                contour_labels: self.contour_labels,
                grid_size: self.grid_size,
                interpolate: self.interpolate,
                colorbar: !self.no_colorbar,
            },
        };
        Ok((self.inputs, options))
    }
}

fn run(args: Args) -> Result<()> {
    let (inputs, options) = args.into_options()?;
    plot::run(&inputs, &options)
}

fn main() -> ExitCode {
    cli::init_logging();
    let args = Args::parse();
    cli::run_main("qplot", || run(args))
}
