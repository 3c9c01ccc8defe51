use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use perf_sweep::{
    aggregate, parse_log, table, ArchVariant, Executor, GroupOptions, NumberFormat, Reducer,
    ReportParser, ShapeArgs, Sweep,
};

#[derive(Parser, Debug)]
#[clap(version, about = "perf stat sweep harness for conv2d accelerator variants")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full variant x channel-count sweep and write the results table
    Sweep(SweepArgs),
    /// Reprocess an aggregated perf log file into a per-command table
    ParseLog(ParseLogArgs),
    /// Reduce a previously written results table per configuration
    Aggregate(AggregateArgs),
}

/// Separator convention of the perf text being parsed.
#[derive(ValueEnum, Debug, Clone, Copy)]
enum Separators {
    /// grouping '.', decimal ',' (perf under a European locale)
    Eu,
    /// grouping ',', decimal '.'
    C,
}

impl From<Separators> for NumberFormat {
    fn from(s: Separators) -> Self {
        match s {
            Separators::Eu => NumberFormat::EUROPEAN,
            Separators::C => NumberFormat::C_LOCALE,
        }
    }
}

fn parse_variant(s: &str) -> Result<ArchVariant, String> {
    match s.split_once('=') {
        Some((label, path)) if !label.is_empty() && !path.is_empty() => Ok(ArchVariant {
            label: label.to_owned(),
            executable: PathBuf::from(path),
        }),
        _ => Err(format!("expected LABEL=PATH, got '{s}'")),
    }
}

#[derive(clap::Args, Debug)]
struct SweepArgs {
    /// Architecture variants as LABEL=PATH, e.g. ISC=./isc WS=./ws
    #[clap(short, long, env, value_parser = parse_variant, num_args = 1.., required = true)]
    arch: Vec<ArchVariant>,

    /// Channel counts to sweep
    #[clap(short, long, num_args = 1.., default_values_t = [1, 2, 4, 8, 16, 32, 48])]
    channels: Vec<u32>,

    /// CPU list for taskset -c
    #[clap(long, env, default_value = "0-7")]
    cpu_list: String,

    /// perf event domain
    #[clap(short, long, env, default_value = "cpu_core")]
    domain: String,

    #[clap(short, long, value_enum, default_value_t = Separators::Eu)]
    separators: Separators,

    /// Skip the sudo wrapper around taskset/perf
    #[clap(long)]
    no_sudo: bool,

    /// Results table path
    #[clap(short, long, env, default_value = "master_survey_results.csv")]
    out: PathBuf,

    /// Also dump the raw records as JSON
    #[clap(long)]
    json_out: Option<PathBuf>,

    /// Also write the reduced table to this path
    #[clap(long)]
    agg_out: Option<PathBuf>,

    #[clap(short, long, value_enum, default_value_t = Reducer::Mean)]
    reducer: Reducer,

    /// Baseline architecture label for the speedup column
    #[clap(long)]
    baseline: Option<String>,

    #[clap(flatten)]
    shape: ShapeOpts,
}

/// Fixed conv2d shape of the sweep, argv order IH IW IC KH KW OF OH OW S P.
#[derive(clap::Args, Debug)]
struct ShapeOpts {
    #[clap(long, default_value_t = 112)]
    input_h: u32,
    #[clap(long, default_value_t = 112)]
    input_w: u32,
    #[clap(long, default_value_t = 32)]
    input_c: u32,
    #[clap(long, default_value_t = 3)]
    kernel_h: u32,
    #[clap(long, default_value_t = 3)]
    kernel_w: u32,
    #[clap(long, default_value_t = 1)]
    output_f: u32,
    #[clap(long, default_value_t = 112)]
    output_h: u32,
    #[clap(long, default_value_t = 112)]
    output_w: u32,
    #[clap(long, default_value_t = 1)]
    stride: u32,
    #[clap(long, default_value_t = 1)]
    padding: u32,
}

impl From<&ShapeOpts> for ShapeArgs {
    fn from(s: &ShapeOpts) -> Self {
        Self {
            input_h: s.input_h,
            input_w: s.input_w,
            input_c: s.input_c,
            kernel_h: s.kernel_h,
            kernel_w: s.kernel_w,
            output_f: s.output_f,
            output_h: s.output_h,
            output_w: s.output_w,
            stride: s.stride,
            padding: s.padding,
        }
    }
}

#[derive(clap::Args, Debug)]
struct ParseLogArgs {
    /// Aggregated perf log file
    #[clap(short, long)]
    input: PathBuf,

    #[clap(short, long, env, default_value = "cpu_core")]
    domain: String,

    #[clap(short, long, value_enum, default_value_t = Separators::Eu)]
    separators: Separators,

    #[clap(short, long, default_value = "performance_comparison.csv")]
    out: PathBuf,
}

#[derive(clap::Args, Debug)]
struct AggregateArgs {
    /// Results table written by the sweep command
    #[clap(short, long)]
    input: PathBuf,

    #[clap(short, long, value_enum, default_value_t = Reducer::Mean)]
    reducer: Reducer,

    /// Group by buffer capacity as a tertiary dimension
    #[clap(long)]
    by_buffer: bool,

    /// Baseline architecture label for the speedup column
    #[clap(long)]
    baseline: Option<String>,

    #[clap(short, long, default_value = "aggregated_results.csv")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Sweep(args) => run_sweep(args),
        Command::ParseLog(args) => run_parse_log(args),
        Command::Aggregate(args) => run_aggregate(args),
    }
}

fn run_sweep(args: SweepArgs) -> anyhow::Result<()> {
    let executor = Executor::new(&args.cpu_list, &args.domain, !args.no_sudo);
    let parser = ReportParser::new(&args.domain, args.separators.into());
    let sweep = Sweep {
        shape: (&args.shape).into(),
        channels: args.channels,
        variants: args.arch,
    };

    let records = sweep.run(&executor, &parser);
    if records.is_empty() {
        warn!("sweep produced no records; writing empty table");
    }
    table::write_records(&args.out, &records)?;
    info!("wrote {} records to {}", records.len(), args.out.display());

    if let Some(path) = &args.json_out {
        table::write_records_json(path, &records)?;
    }
    if let Some(path) = &args.agg_out {
        let options = GroupOptions {
            by_buffer: false,
            baseline: args.baseline,
        };
        let aggregates = aggregate(&records, args.reducer, &options);
        table::write_aggregates(path, &aggregates)?;
        info!("wrote {} groups to {}", aggregates.len(), path.display());
    }
    Ok(())
}

fn run_parse_log(args: ParseLogArgs) -> anyhow::Result<()> {
    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let parser = ReportParser::new(&args.domain, args.separators.into());
    let reports = parse_log(&content, &parser);
    if reports.is_empty() {
        bail!("no perf stat blocks found in {}", args.input.display());
    }
    table::write_log_reports(&args.out, &reports)?;
    info!("wrote {} commands to {}", reports.len(), args.out.display());
    Ok(())
}

fn run_aggregate(args: AggregateArgs) -> anyhow::Result<()> {
    let records = table::read_records(&args.input)?;
    let options = GroupOptions {
        by_buffer: args.by_buffer,
        baseline: args.baseline,
    };
    let aggregates = aggregate(&records, args.reducer, &options);
    table::write_aggregates(&args.out, &aggregates)?;
    info!(
        "wrote {} groups to {}",
        aggregates.len(),
        args.out.display()
    );
    Ok(())
}
