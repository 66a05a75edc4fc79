use anyhow::{Context, Result};
use clap::Parser;
use credito_eda::catalog;
use credito_eda::clean::{Cleaner, SentinelScope, SENTINEL};
use credito_eda::console::ConsoleReporter;
use credito_eda::data::DEFAULT_INPUT;
use credito_eda::graph::ChartReporter;
use credito_eda::json::JsonReporter;
use credito_eda::report::Reporter;
use credito_eda::runtime::{self, PipelineOptions};
use credito_eda::{OutputFormat, RenderOptions};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, trace};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "credito-eda")]
#[command(about = "Exploratory analysis of the credit customer dataset", long_about = None)]
struct Args {
    /// Headerless 13-column CSV file
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Directory chart files are written to
    #[arg(long, default_value = "charts")]
    out_dir: PathBuf,

    /// Chart file format
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    format: OutputFormat,

    /// Chart width in pixels
    #[arg(long, default_value_t = RenderOptions::default().width)]
    width: u32,

    /// Chart height in pixels
    #[arg(long, default_value_t = RenderOptions::default().height)]
    height: u32,

    /// Skip chart files, print reports only
    #[arg(long)]
    no_charts: bool,

    /// Print one JSON document instead of text tables
    #[arg(long)]
    json: bool,

    /// Columns searched for the "na" sentinel when cleaning
    #[arg(long, value_enum, default_value_t = SentinelScope::AllFields)]
    sentinel_scope: SentinelScope,

    /// Extra report in pipeline form, e.g. 'group(by: tipo_cartao) | pie()'
    #[arg(long = "report", value_name = "DSL")]
    reports: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .init();

    debug!("credito-eda started with verbosity level: {}", verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let reports = catalog::reports(&args.reports).context("Invalid report definition")?;
    let options = PipelineOptions {
        cleaner: Cleaner::new(SENTINEL, args.sentinel_scope),
        ..PipelineOptions::new(&args.input, reports)
    };

    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();
    if args.json {
        reporters.push(Box::new(JsonReporter::new(io::stdout())));
    } else {
        reporters.push(Box::new(ConsoleReporter::new(io::stdout())));
    }
    if !args.no_charts {
        let render = RenderOptions {
            width: args.width,
            height: args.height,
            format: args.format,
        };
        reporters.push(Box::new(ChartReporter::new(&args.out_dir, render)));
    }

    let summary = runtime::run(&options, &mut reporters)?;
    info!(
        "Done: {} reports, {} warnings",
        summary.results.len(),
        summary.warning_count()
    );

    Ok(())
}
