//! Domain types for BiasharaWatch

pub mod portfolio;
pub mod security;

pub use portfolio::{PortfolioEntry, PortfolioRow, Valuation};
pub use security::SecurityRecord;
