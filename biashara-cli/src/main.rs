//! BiasharaWatch CLI: one scheduled run of the NSE price tracker.
//!
//! Meant to be invoked by cron or a CI schedule every few minutes. Outside
//! the configured trading window the run exits immediately unless `--force`
//! is given. On the weekly send hour, or with `--force` or `--send-email`,
//! the portfolio report is emailed after the workbook is saved.
//!
//! Exit codes: 0 success or skipped, 1 configuration or other error,
//! 2 network, 3 page structure changed, 4 corrupt workbook, 5 write failure.

mod mailer;

use anyhow::Result;
use biashara_core::data::HttpSource;
use biashara_core::{run, Config, PipelineError, RunOptions, RunOutcome, RunReport};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "biashara",
    about = "BiasharaWatch: NSE stock tracker and portfolio workbook"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "biashara.toml")]
    config: PathBuf,

    /// Run regardless of trading hours, and send the report too.
    #[arg(short, long, default_value_t = false)]
    force: bool,

    /// Override the trading window start hour (local time).
    #[arg(long, value_name = "HOUR")]
    start: Option<u32>,

    /// Override the trading window end hour (local time, exclusive).
    #[arg(long, value_name = "HOUR")]
    end: Option<u32>,

    /// Send the weekly portfolio email now.
    #[arg(long, default_value_t = false)]
    send_email: bool,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: &Cli) -> Result<()> {
    let config = Config::from_file(&cli.config)?.with_hours_override(cli.start, cli.end)?;
    let source = HttpSource::new(&config.source_url, config.timeout())?;
    let options = RunOptions {
        force: cli.force,
        send_email: cli.send_email,
    };

    info!(
        window = %format!("{:02}:00-{:02}:00", config.trading_hours.start, config.trading_hours.end),
        timezone = %config.trading_hours.timezone,
        force = cli.force,
        "BiasharaWatch starting"
    );

    match run(&config, &source, Utc::now(), options)? {
        RunOutcome::Skipped { local_time } => {
            println!(
                "Outside trading hours ({}). Use --force to run anyway.",
                local_time.format("%A %H:%M")
            );
        }
        RunOutcome::Completed(report) => {
            print_summary(&report);
            if report.send_email {
                deliver(&report);
            }
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "Fetched {} securities at {}",
        report.records,
        report.fetched_at.format("%Y-%m-%d %H:%M %:z")
    );
    if !report.row_errors.is_empty() {
        println!("Skipped {} malformed rows", report.row_errors.len());
    }
    for warning in &report.warnings {
        println!("Warning: {warning}");
    }

    let summary = &report.summary;
    if !summary.holdings.is_empty() {
        println!(
            "Portfolio: invested {} | value {} | gain/loss {}",
            summary.total_invested.round_dp(2),
            summary.total_current_value.round_dp(2),
            summary.total_gain_loss.round_dp(2),
        );
    }
    println!("Saved -> {}", report.output_file.display());
}

/// Email the weekly report. Failures are logged; the workbook is already
/// saved, so they do not fail the run.
fn deliver(report: &RunReport) {
    let settings = match mailer::MailSettings::from_env() {
        Ok(settings) => settings,
        Err(missing) => {
            warn!(missing = %missing.join(", "), "email not configured, skipping weekly report");
            return;
        }
    };

    let email = mailer::compose(&report.summary, report.fetched_at);
    match mailer::send(&settings, &email) {
        Ok(()) => info!(to = %settings.recipient, "weekly report sent"),
        Err(e) => error!("weekly report failed: {e:#}"),
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Network(_)) => 2,
        Some(PipelineError::StructureChanged(_)) => 3,
        Some(PipelineError::CorruptWorkbook(_)) => 4,
        Some(PipelineError::Write(_)) => 5,
        None => 1,
    }
}
