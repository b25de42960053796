mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::appraise::{AppraiseArgs, ExportArgs};
use commands::schedules::{AllowancesArgs, MetricsArgs, WorkingCapitalArgs};

/// Capital investment appraisal with UK capital allowances and lagged tax
#[derive(Parser)]
#[command(
    name = "capex",
    version,
    about = "Capital investment appraisal with UK capital allowances and lagged tax",
    long_about = "A CLI for appraising capital projects with decimal precision. Builds the \
                  operating profile, reducing-balance capital allowances, working capital \
                  and lagged tax schedules, then reports NPV, IRR, payback, discounted \
                  payback and ARR."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log every calculation stage to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Appraise a full project (NPV, IRR, payback, ARR and all workings)
    Appraise(AppraiseArgs),
    /// Reducing-balance capital allowance schedule
    Allowances(AllowancesArgs),
    /// Working capital movements from a sales series
    WorkingCapital(WorkingCapitalArgs),
    /// Appraisal metrics for a bare net cash-flow series
    Metrics(MetricsArgs),
    /// Write the per-year cash-flow and discounting table as CSV
    Export(ExportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Appraise(args) => commands::appraise::run_appraise(args),
        Commands::Allowances(args) => commands::schedules::run_allowances(args),
        Commands::WorkingCapital(args) => commands::schedules::run_working_capital(args),
        Commands::Metrics(args) => commands::schedules::run_metrics(args),
        Commands::Export(args) => commands::appraise::run_export(args),
        Commands::Version => {
            println!("capex {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    let outcome = result.and_then(|value| match value {
        serde_json::Value::Null => Ok(()),
        value => output::format_output(&cli.output, &value).map_err(Into::into),
    });

    match outcome {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("capex_appraisal_core=debug,capex=debug")
    } else {
        EnvFilter::try_from_env("CAPEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
