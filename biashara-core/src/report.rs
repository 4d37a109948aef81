//! Portfolio totals for the weekly report.

use crate::domain::PortfolioRow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One fully priced holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub ticker: String,
    pub company: String,
    pub shares_owned: u64,
    pub buy_price: Decimal,
    pub current_price: Decimal,
    pub invested: Decimal,
    pub current_value: Decimal,
    pub gain_loss: Decimal,
    pub gain_loss_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_invested: Decimal,
    pub total_current_value: Decimal,
    pub total_gain_loss: Decimal,
    /// Gain over the amount invested, in percent. `None` when nothing is
    /// invested.
    pub total_gain_loss_pct: Option<Decimal>,
    pub holdings: Vec<HoldingSummary>,
    /// Tickers that could not be valued this run: unmatched in the market
    /// data, or missing shares or buy price.
    pub unpriced: Vec<String>,
}

impl PortfolioSummary {
    /// Totals over the rows that have a market match plus both user inputs.
    pub fn from_view(rows: &[PortfolioRow]) -> Self {
        let mut summary = Self::default();

        for row in rows {
            let totals = holding(row).and_then(|h| {
                Some((
                    summary.total_invested.checked_add(h.invested)?,
                    summary.total_current_value.checked_add(h.current_value)?,
                    summary.total_gain_loss.checked_add(h.gain_loss)?,
                    h,
                ))
            });
            // A holding that cannot be added to the totals is reported as unpriced.
            match totals {
                Some((invested, value, gain_loss, h)) => {
                    summary.total_invested = invested;
                    summary.total_current_value = value;
                    summary.total_gain_loss = gain_loss;
                    summary.holdings.push(h);
                }
                None => summary.unpriced.push(row.entry.ticker.clone()),
            }
        }

        summary.total_gain_loss_pct = summary
            .total_gain_loss
            .checked_div(summary.total_invested)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|pct| pct.round_dp(2));
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty() && self.unpriced.is_empty()
    }

    pub fn is_gain(&self) -> bool {
        !self.total_gain_loss.is_sign_negative()
    }
}

fn holding(row: &PortfolioRow) -> Option<HoldingSummary> {
    let valuation = row.valuation.as_ref()?;
    let shares_owned = row.entry.shares_owned?;
    let buy_price = row.entry.buy_price?;
    let invested = row.entry.cost_basis()?;
    let current_value = valuation.current_value?;

    Some(HoldingSummary {
        ticker: row.entry.ticker.clone(),
        company: valuation.company.clone(),
        shares_owned,
        buy_price,
        current_price: valuation.current_price,
        invested,
        current_value,
        gain_loss: current_value.checked_sub(invested)?,
        gain_loss_pct: valuation.gain_loss_pct,
    })
}
