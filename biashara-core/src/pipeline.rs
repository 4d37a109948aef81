//! One run: gate, fetch, parse, reconcile, write.
//!
//! Every stage that can fail does so before the workbook is touched, and the
//! write itself is atomic, so a failed run leaves the previous workbook as
//! it was.

use crate::config::Config;
use crate::data::{parse, FetchError, PageSource, RowParseError, StructureChangedError};
use crate::gate::GateDecision;
use crate::reconcile::{reconcile, UnmatchedTickerWarning};
use crate::report::PortfolioSummary;
use crate::workbook::{read_portfolio, write_workbook, CorruptWorkbookError, WriteError};
use chrono::{DateTime, FixedOffset, Utc};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Fatal run errors. Each leaves the previous workbook untouched.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Network(#[from] FetchError),
    #[error(transparent)]
    StructureChanged(#[from] StructureChangedError),
    #[error(transparent)]
    CorruptWorkbook(#[from] CorruptWorkbookError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Flags that bypass the schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Open both gates: fetch and mail regardless of the schedule.
    pub force: bool,
    /// Send the report regardless of the email schedule.
    pub send_email: bool,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Both gates were closed; nothing was fetched or written.
    Skipped { local_time: DateTime<FixedOffset> },
    Completed(RunReport),
}

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_file: PathBuf,
    pub fetched_at: DateTime<FixedOffset>,
    pub records: usize,
    pub row_errors: Vec<RowParseError>,
    pub warnings: Vec<UnmatchedTickerWarning>,
    pub summary: PortfolioSummary,
    /// The email gate was open for this run.
    pub send_email: bool,
}

/// Run the pipeline once against `source`.
///
/// `now` drives the schedule gates, which makes the run reproducible in
/// tests.
pub fn run(
    config: &Config,
    source: &dyn PageSource,
    now: DateTime<Utc>,
    options: RunOptions,
) -> Result<RunOutcome, PipelineError> {
    let offset = config.trading_hours.timezone;
    let gate = GateDecision::evaluate(
        now,
        &config.trading_hours,
        &config.email,
        options.force,
        options.send_email,
    );

    if !gate.should_run() {
        let local_time = now.with_timezone(&offset);
        info!(
            local_time = %local_time.format("%a %H:%M %:z"),
            start = config.trading_hours.start,
            end = config.trading_hours.end,
            "outside trading hours, skipping"
        );
        return Ok(RunOutcome::Skipped { local_time });
    }

    info!(source = source.name(), "fetching market page");
    let page = source.fetch()?;

    let parsed = parse(&page, offset)?;
    for err in &parsed.row_errors {
        warn!(row = err.row_index, reason = %err.reason, "skipped malformed row");
    }
    info!(
        records = parsed.records.len(),
        skipped = parsed.row_errors.len(),
        "market page parsed"
    );

    let entries = read_portfolio(&config.output_file)?;
    let reconciled = reconcile(&parsed.records, &entries);
    for warning in &reconciled.warnings {
        warn!(ticker = %warning.ticker, row = warning.position, "ticker not found in market data");
    }

    write_workbook(
        &reconciled.market,
        &reconciled.portfolio,
        &config.output_file,
    )?;
    info!(
        path = %config.output_file.display(),
        market_rows = reconciled.market.len(),
        portfolio_rows = reconciled.portfolio.len(),
        "workbook saved"
    );

    Ok(RunOutcome::Completed(RunReport {
        output_file: config.output_file.clone(),
        fetched_at: page.fetched_at.with_timezone(&offset),
        records: reconciled.market.len(),
        row_errors: parsed.row_errors,
        summary: PortfolioSummary::from_view(&reconciled.portfolio),
        warnings: reconciled.warnings,
        send_email: gate.email,
    }))
}
