//! User-owned holdings and their per-run valuation.

use super::security::SecurityRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A holding typed into the portfolio sheet by the user.
///
/// The pipeline reads these back and re-renders them; it never creates,
/// drops or reorders them. Shares and buy price stay `None` while the user
/// has only filled in the ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub ticker: String,
    pub shares_owned: Option<u64>,
    pub buy_price: Option<Decimal>,
}

impl PortfolioEntry {
    pub fn new(ticker: impl Into<String>, shares_owned: u64, buy_price: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            shares_owned: Some(shares_owned),
            buy_price: Some(buy_price),
        }
    }

    /// Amount paid for the position, when both inputs are present and the
    /// product is representable.
    pub fn cost_basis(&self) -> Option<Decimal> {
        Decimal::from(self.shares_owned?).checked_mul(self.buy_price?)
    }
}

/// Values derived by joining an entry with its market record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub company: String,
    pub current_price: Decimal,
    pub current_value: Option<Decimal>,
    pub gain_loss: Option<Decimal>,
    /// Price move since purchase in percent (5 means +5%). `None` without a
    /// non-zero buy price.
    pub gain_loss_pct: Option<Decimal>,
}

impl Valuation {
    pub fn compute(entry: &PortfolioEntry, record: &SecurityRecord) -> Self {
        let current_value = entry
            .shares_owned
            .and_then(|shares| Decimal::from(shares).checked_mul(record.price));
        let cost = entry.cost_basis();
        let gain_loss = match (current_value, cost) {
            (Some(value), Some(cost)) => value.checked_sub(cost),
            _ => None,
        };
        let gain_loss_pct = entry
            .buy_price
            .filter(|buy| !buy.is_zero())
            .and_then(|buy| {
                record
                    .price
                    .checked_sub(buy)?
                    .checked_div(buy)?
                    .checked_mul(Decimal::ONE_HUNDRED)
            })
            .map(|pct| pct.round_dp(4));

        Self {
            company: record.company.clone(),
            current_price: record.price,
            current_value,
            gain_loss,
            gain_loss_pct,
        }
    }
}

/// One rendered row of the portfolio sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRow {
    /// 1-based position in the sheet, shown in the `#` column.
    pub position: usize,
    pub entry: PortfolioEntry,
    /// `None` when the ticker is absent from this run's market data.
    pub valuation: Option<Valuation>,
}

impl PortfolioRow {
    pub fn is_priced(&self) -> bool {
        self.valuation.is_some()
    }
}
