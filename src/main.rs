use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use dialoguer::Select;
use tracing_subscriber::EnvFilter;

mod error;
mod logs;
mod models;
mod parser;
mod report;

use error::LogError;
use models::LogFileInfo;

const DAY_SECS: u64 = 86_400;
/// Dates offered in the interactive menu
const DATE_MENU_LEN: usize = 7;

/// Process EQ logs for spell casting and skill-ups.
#[derive(Parser, Debug)]
#[command(name = "eqlogger", version, about)]
struct Cli {
    /// Directory containing eqlog_*.txt files
    #[arg(default_value = ".")]
    log_dir: PathBuf,

    /// Only offer logs modified within this many days
    #[arg(long, default_value_t = 7)]
    max_age_days: u64,

    /// Enable verbose output with statistics
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output and write excluded_lines_<Character>.log
    #[arg(short, long)]
    debug: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log to analyze by menu number, skipping the prompt
    #[arg(long, value_name = "N")]
    log: Option<usize>,

    /// Date to analyze by menu number (most recent first), skipping the prompt
    #[arg(long, value_name = "N", conflicts_with = "all_dates")]
    date: Option<usize>,

    /// Analyze the whole log without scoping to one date
    #[arg(long)]
    all_dates: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // 1. Find recent logs
    let max_age = Duration::from_secs(cli.max_age_days.saturating_mul(DAY_SECS));
    let logs = logs::list_recent_logs(&cli.log_dir, max_age, SystemTime::now())
        .with_context(|| format!("Failed to scan {}", cli.log_dir.display()))?;
    if logs.is_empty() {
        return Err(LogError::NoLogs { dir: cli.log_dir }.into());
    }

    // 2. Pick a log
    let selected = match cli.log {
        Some(n) => parser::select(&logs, n)?,
        None => prompt_log(&logs, cli.max_age_days)?,
    };

    // 3. Load it whole; a vanished file yields an empty report
    let contents = match logs::load_log(&selected.path)
        .with_context(|| format!("Failed to read {}", selected.path.display()))?
    {
        Some(c) => c,
        None => {
            eprintln!("Error: The file {} was not found.", selected.filename);
            String::new()
        }
    };

    // 4. Pick a date unless the whole log is wanted
    let date_filter = if cli.all_dates {
        None
    } else {
        let dates = parser::extract_distinct_dates(&contents);
        if dates.is_empty() {
            return Err(LogError::NoDates {
                file: selected.filename.clone(),
            }
            .into());
        }
        let date = match cli.date {
            Some(n) => parser::select_date(&dates, n)?,
            None => prompt_date(&dates)?,
        };
        Some(date)
    };

    // 5. Parse, timing only the pass itself
    let start = Instant::now();
    let mut report = parser::parse(&contents, date_filter, cli.debug);
    report.processing_secs = start.elapsed().as_secs_f64();

    // 6. Debug side-log of experience lines
    if cli.debug {
        if let Some(character) = logs::character_name(&selected.filename) {
            if let Some(path) = logs::write_excluded_lines(&cli.log_dir, &character, &report.excluded_lines)? {
                eprintln!("Excluded lines written to {}", path.display());
            }
        }
    }

    // 7. Output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        print!("{}", report::render(&report, cli.verbose, cli.debug));
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn prompt_log(logs: &[LogFileInfo], max_age_days: u64) -> anyhow::Result<&LogFileInfo> {
    let items: Vec<String> = logs
        .iter()
        .map(|l| format!("{} ({}, {})", l.filename, l.size_display, l.modified.format("%Y-%m-%d %H:%M")))
        .collect();
    let choice = Select::new()
        .with_prompt(format!("EQ logs from the last {} days, select one to analyze", max_age_days))
        .items(&items)
        .default(0)
        .interact()?;
    Ok(parser::select(logs, choice + 1)?)
}

fn prompt_date(dates: &[NaiveDate]) -> anyhow::Result<NaiveDate> {
    let shown = &dates[..dates.len().min(DATE_MENU_LEN)];
    let choice = Select::new()
        .with_prompt("Select a date to analyze (most recent first)")
        .items(shown)
        .default(0)
        .interact()?;
    Ok(parser::select_date(shown, choice + 1)?)
}
