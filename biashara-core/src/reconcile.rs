//! Merge fresh market records with the user's preserved portfolio rows.
//!
//! Pure: no I/O, no clock. The reader and writer sit on either side.

use crate::domain::{PortfolioEntry, PortfolioRow, SecurityRecord, Valuation};
use std::collections::HashMap;
use std::fmt;

/// A portfolio ticker that is not on this run's market page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedTickerWarning {
    pub ticker: String,
    /// 1-based portfolio row.
    pub position: usize,
}

impl fmt::Display for UnmatchedTickerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "portfolio row {}: ticker {} not found in market data",
            self.position, self.ticker
        )
    }
}

/// The two logical sheets to be written.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Every record, sorted by ticker.
    pub market: Vec<SecurityRecord>,
    /// Every portfolio entry, in input order.
    pub portfolio: Vec<PortfolioRow>,
    pub warnings: Vec<UnmatchedTickerWarning>,
}

pub fn reconcile(records: &[SecurityRecord], entries: &[PortfolioEntry]) -> Reconciliation {
    let by_ticker: HashMap<&str, &SecurityRecord> = records
        .iter()
        .map(|record| (record.ticker.as_str(), record))
        .collect();

    let mut warnings = Vec::new();
    let portfolio = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let position = i + 1;
            let valuation = match by_ticker.get(entry.ticker.as_str()) {
                Some(record) => Some(Valuation::compute(entry, record)),
                None => {
                    warnings.push(UnmatchedTickerWarning {
                        ticker: entry.ticker.clone(),
                        position,
                    });
                    None
                }
            };
            PortfolioRow {
                position,
                entry: entry.clone(),
                valuation,
            }
        })
        .collect();

    Reconciliation {
        market: sort_market(records),
        portfolio,
        warnings,
    }
}

/// Case-insensitive ticker order. The sort is stable, so equal keys keep
/// parse order.
fn sort_market(records: &[SecurityRecord]) -> Vec<SecurityRecord> {
    let mut market = records.to_vec();
    market.sort_by_cached_key(|record| record.ticker.to_lowercase());
    market
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(ticker: &str, price: Decimal) -> SecurityRecord {
        SecurityRecord {
            ticker: ticker.into(),
            company: format!("{ticker} Plc"),
            sector: "Banking".into(),
            price,
            change_pct: dec!(0),
            volume: 100,
            updated_at: FixedOffset::east_opt(3 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 6, 3, 10, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn derives_scom_values() {
        let records = vec![record("SCOM", dec!(30.00))];
        let entries = vec![PortfolioEntry::new("SCOM", 1000, dec!(28.00))];

        let r = reconcile(&records, &entries);
        let v = r.portfolio[0].valuation.as_ref().unwrap();
        assert_eq!(v.current_value, Some(dec!(30000.00)));
        assert_eq!(v.gain_loss, Some(dec!(2000.00)));
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn unmatched_ticker_warns_and_keeps_row() {
        let records = vec![record("SCOM", dec!(30.00))];
        let entries = vec![
            PortfolioEntry::new("SCOM", 10, dec!(25)),
            PortfolioEntry::new("DELISTED", 50, dec!(3)),
        ];

        let r = reconcile(&records, &entries);
        assert_eq!(r.portfolio.len(), 2);
        assert!(r.portfolio[1].valuation.is_none());
        assert_eq!(
            r.warnings,
            vec![UnmatchedTickerWarning {
                ticker: "DELISTED".into(),
                position: 2
            }]
        );
    }

    #[test]
    fn market_sorted_case_insensitively() {
        let records = vec![
            record("scom", dec!(1)),
            record("ABSA", dec!(1)),
            record("Kcb", dec!(1)),
            record("EQTY", dec!(1)),
        ];
        let r = reconcile(&records, &[]);
        let tickers: Vec<_> = r.market.iter().map(|m| m.ticker.as_str()).collect();
        assert_eq!(tickers, ["ABSA", "EQTY", "Kcb", "scom"]);
    }

    #[test]
    fn market_ties_keep_parse_order() {
        let mut a = record("abc", dec!(1));
        a.company = "first".into();
        let mut b = record("ABC", dec!(2));
        b.company = "second".into();
        let r = reconcile(&[a, b], &[]);
        assert_eq!(r.market[0].company, "first");
        assert_eq!(r.market[1].company, "second");
    }

    #[test]
    fn empty_market_leaves_every_row_unavailable() {
        let entries = vec![
            PortfolioEntry::new("SCOM", 1, dec!(1)),
            PortfolioEntry::new("KCB", 1, dec!(1)),
        ];
        let r = reconcile(&[], &entries);
        assert_eq!(r.portfolio.len(), 2);
        assert_eq!(r.warnings.len(), 2);
        assert!(r.portfolio.iter().all(|row| !row.is_priced()));
    }

    #[test]
    fn duplicate_portfolio_tickers_both_survive() {
        let records = vec![record("SCOM", dec!(30))];
        let entries = vec![
            PortfolioEntry::new("SCOM", 100, dec!(20)),
            PortfolioEntry::new("SCOM", 200, dec!(25)),
        ];
        let r = reconcile(&records, &entries);
        assert_eq!(r.portfolio.len(), 2);
        assert_eq!(r.portfolio[0].position, 1);
        assert_eq!(r.portfolio[1].position, 2);
        assert_eq!(r.portfolio[1].entry.shares_owned, Some(200));
    }
}
