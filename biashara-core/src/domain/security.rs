use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One listed security as seen on the market page during a single fetch.
///
/// Records are rebuilt from scratch every run and only ever persisted as
/// rows of the Market sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRecord {
    pub ticker: String,
    pub company: String,
    pub sector: String,
    /// Last traded price, never negative.
    pub price: Decimal,
    /// Signed percentage change versus the previous close (1.25 means +1.25%).
    pub change_pct: Decimal,
    pub volume: u64,
    pub updated_at: DateTime<FixedOffset>,
}

impl SecurityRecord {
    pub fn is_gain(&self) -> bool {
        !self.change_pct.is_sign_negative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn record(change: Decimal) -> SecurityRecord {
        let eat = FixedOffset::east_opt(3 * 3600).unwrap();
        SecurityRecord {
            ticker: "SCOM".into(),
            company: "Safaricom Plc".into(),
            sector: "Telecommunication".into(),
            price: dec!(30.00),
            change_pct: change,
            volume: 1_200_000,
            updated_at: eat.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn unchanged_counts_as_gain() {
        assert!(record(dec!(0)).is_gain());
        assert!(record(dec!(1.5)).is_gain());
        assert!(!record(dec!(-0.01)).is_gain());
    }
}
