use std::path::PathBuf;

use bse_screener::config::ScreenerConfig;
use bse_screener::sync;
use bse_screener::{Result, ScreenerError};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_tracing().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ScreenerError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ScreenerConfig::load(path)?,
        None => ScreenerConfig::default(),
    };

    match cli.command {
        Command::Flatten(args) => {
            let input = args.input.unwrap_or(config.cache_file);
            let output = args.output.unwrap_or(config.spreadsheet);
            let table = sync::cache_to_excel(&input, &output)?;
            println!(
                "wrote {} companies x {} columns to {}",
                table.rows.len(),
                table.layout.column_count(),
                output.display()
            );
            for failure in &table.failures {
                eprintln!("skipped {}: {}", failure.entity, failure.message);
            }
            Ok(())
        }
        Command::Screen(args) => {
            let input = args.input.unwrap_or(config.cache_file);
            let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
            let exchange = args.exchange.unwrap_or(config.exchange);
            let report = sync::cache_to_screen(&input, &args.output, &exchange, as_of)?;
            println!(
                "screened {} companies, {} with missing info ({} missing fields)",
                report.stats.total_companies,
                report.stats.companies_with_missing_info,
                report.stats.missing_fields
            );
            Ok(())
        }
        Command::Codes(args) => {
            let input = args.input.unwrap_or(config.stock_list);
            let column = args.column.unwrap_or(config.code_column);
            for code in sync::list_codes(&input, column)? {
                println!("{code}");
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Flatten and screen cached BSE company data."
)]
struct Cli {
    /// Optional JSON configuration file; command-line flags take precedence.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flatten the record cache into a spreadsheet, one column per field.
    Flatten(FlattenArgs),
    /// Extract screening attributes and missing-value counts.
    Screen(ScreenArgs),
    /// Print the scrip codes of an equity listing.
    Codes(CodesArgs),
}

#[derive(clap::Args)]
struct FlattenArgs {
    /// Record cache to read (defaults to the configured cache file).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Workbook to write (defaults to the configured spreadsheet).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ScreenArgs {
    /// Record cache to read (defaults to the configured cache file).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output path; `.json` writes JSON, anything else a workbook.
    #[arg(long)]
    output: PathBuf,

    /// Date the trailing dividend windows end on (YYYY-MM-DD, default today).
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Exchange name written next to each stock.
    #[arg(long)]
    exchange: Option<String>,
}

#[derive(clap::Args)]
struct CodesArgs {
    /// Equity listing (CSV, XLSX, or the exchange description list).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Zero-based column holding the scrip codes in CSV/XLSX listings.
    #[arg(long)]
    column: Option<usize>,
}
