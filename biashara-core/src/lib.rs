//! BiasharaWatch core: NSE price harvesting and portfolio workbook upkeep.
//!
//! One run of the pipeline:
//! - checks the trading-hours and email gates
//! - fetches the market page and parses the embedded Nuxt data
//! - reads the user's holdings back out of the existing workbook
//! - joins holdings to prices and rewrites both sheets atomically
//!
//! The binary crate adds flag parsing, logging setup and the weekly email.

pub mod config;
pub mod data;
pub mod domain;
pub mod gate;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod workbook;

pub use config::{Config, ConfigError};
pub use pipeline::{run, PipelineError, RunOptions, RunOutcome, RunReport};
