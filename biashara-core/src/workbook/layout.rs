//! Sheet names, cell positions and formulas shared by the reader and writer.
//!
//! Rows and columns are zero-based as the xlsx libraries expect. Formulas
//! use the one-based A1 notation a spreadsheet user sees.

use rust_xlsxwriter::RowNum;

pub const MARKET_SHEET: &str = "Market";
pub const PORTFOLIO_SHEET: &str = "My Portfolio";

pub mod market {
    use rust_xlsxwriter::{ColNum, RowNum};

    pub const HEADER_ROW: RowNum = 0;
    pub const FIRST_DATA_ROW: RowNum = 1;

    pub const TICKER: ColNum = 0;
    pub const COMPANY: ColNum = 1;
    pub const SECTOR: ColNum = 2;
    pub const PRICE: ColNum = 3;
    pub const CHANGE: ColNum = 4;
    pub const VOLUME: ColNum = 5;
    pub const LAST_UPDATED: ColNum = 6;

    pub const HEADERS: [(&str, f64); 7] = [
        ("Ticker", 10.0),
        ("Company", 28.0),
        ("Sector", 22.0),
        ("Price (KES)", 14.0),
        ("Change (%)", 12.0),
        ("Volume", 14.0),
        ("Last Updated", 22.0),
    ];
}

pub mod portfolio {
    use rust_xlsxwriter::{ColNum, RowNum};

    pub const TITLE_ROW: RowNum = 0;
    pub const NOTE_ROW: RowNum = 1;
    pub const HEADER_ROW: RowNum = 2;
    pub const FIRST_DATA_ROW: RowNum = 3;

    /// Numbered rows rendered even when the portfolio is shorter, so there
    /// is room to type new holdings.
    pub const MIN_ROWS: usize = 20;

    pub const NUMBER: ColNum = 0;
    pub const TICKER: ColNum = 1;
    pub const COMPANY: ColNum = 2;
    pub const SHARES: ColNum = 3;
    pub const BUY_PRICE: ColNum = 4;
    pub const CURRENT_PRICE: ColNum = 5;
    pub const CURRENT_VALUE: ColNum = 6;
    pub const GAIN_LOSS: ColNum = 7;
    pub const GAIN_LOSS_PCT: ColNum = 8;
    pub const LAST_COL: ColNum = GAIN_LOSS_PCT;

    pub const TITLE: &str = "My NSE Portfolio";
    pub const NOTE: &str = "Fill in columns B (Ticker), D (Shares Owned) and E (Buy Price). \
                            Columns C and F\u{2013}I are calculated from the Market sheet.";

    pub const HEADERS: [(&str, f64); 9] = [
        ("#", 5.0),
        ("Ticker", 10.0),
        ("Company", 28.0),
        ("Shares Owned", 14.0),
        ("Buy Price (KES)", 15.0),
        ("Current Price (KES)", 18.0),
        ("Current Value (KES)", 18.0),
        ("Gain/Loss (KES)", 18.0),
        ("Gain/Loss (%)", 14.0),
    ];

    /// Header prefixes the reader insists on for the user-input columns.
    pub const INPUT_HEADERS: [(ColNum, &str); 3] = [
        (TICKER, "Ticker"),
        (SHARES, "Shares"),
        (BUY_PRICE, "Buy Price"),
    ];
}

/// Formulas for the derived portfolio columns of one sheet row.
///
/// Every formula yields `""` when an input is missing, so an unmatched
/// ticker shows blank cells rather than zeros.
pub struct PortfolioFormulas {
    n: RowNum,
}

impl PortfolioFormulas {
    pub fn for_row(row: RowNum) -> Self {
        Self { n: row + 1 }
    }

    pub fn company(&self) -> String {
        let n = self.n;
        format!("=IFERROR(VLOOKUP(B{n},{MARKET_SHEET}!$A:$B,2,FALSE),\"\")")
    }

    pub fn current_price(&self) -> String {
        let n = self.n;
        format!("=IFERROR(VLOOKUP(B{n},{MARKET_SHEET}!$A:$D,4,FALSE),\"\")")
    }

    pub fn current_value(&self) -> String {
        let n = self.n;
        format!("=IF(OR(F{n}=\"\",D{n}=\"\"),\"\",D{n}*F{n})")
    }

    pub fn gain_loss(&self) -> String {
        let n = self.n;
        format!("=IF(OR(F{n}=\"\",D{n}=\"\",E{n}=\"\"),\"\",(F{n}-E{n})*D{n})")
    }

    pub fn gain_loss_pct(&self) -> String {
        let n = self.n;
        format!("=IF(OR(F{n}=\"\",E{n}=\"\",E{n}=0),\"\",(F{n}-E{n})/E{n})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_data_row_formulas_reference_row_four() {
        let f = PortfolioFormulas::for_row(portfolio::FIRST_DATA_ROW);
        assert_eq!(f.company(), "=IFERROR(VLOOKUP(B4,Market!$A:$B,2,FALSE),\"\")");
        assert_eq!(f.current_price(), "=IFERROR(VLOOKUP(B4,Market!$A:$D,4,FALSE),\"\")");
        assert_eq!(f.current_value(), "=IF(OR(F4=\"\",D4=\"\"),\"\",D4*F4)");
        assert!(f.gain_loss().ends_with("(F4-E4)*D4)"));
        assert!(f.gain_loss_pct().ends_with("(F4-E4)/E4)"));
    }

    #[test]
    fn lookup_columns_match_market_layout() {
        // VLOOKUP index is 1-based from the ticker column.
        assert_eq!(market::COMPANY - market::TICKER + 1, 2);
        assert_eq!(market::PRICE - market::TICKER + 1, 4);
        assert_eq!(market::HEADERS[market::PRICE as usize].0, "Price (KES)");
    }
}
