//! Workbook persistence: the Market and My Portfolio sheets.

pub mod layout;
pub mod reader;
pub mod style;
pub mod writer;

pub use reader::read_portfolio;
pub use writer::{render, write_workbook};

use std::path::PathBuf;
use thiserror::Error;

/// An existing workbook that cannot be trusted to hold the user's holdings.
#[derive(Debug, Error)]
#[error("workbook {} is unreadable: {reason}", .path.display())]
pub struct CorruptWorkbookError {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("render workbook: {0}")]
    Render(#[from] rust_xlsxwriter::XlsxError),

    #[error("persist workbook to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
