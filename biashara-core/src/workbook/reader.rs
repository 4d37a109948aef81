//! Read the user's holdings back out of an existing workbook.
//!
//! Only the user-input columns of the portfolio sheet are trusted. Derived
//! columns and the whole Market sheet are recomputed every run, so their
//! old values are never read.

use super::layout::{self, portfolio};
use super::CorruptWorkbookError;
use crate::domain::PortfolioEntry;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Load portfolio entries in sheet order. A missing file is an empty
/// portfolio; an unreadable one is an error.
pub fn read_portfolio(path: &Path) -> Result<Vec<PortfolioEntry>, CorruptWorkbookError> {
    if !path.exists() {
        debug!(path = %path.display(), "no existing workbook, starting with empty portfolio");
        return Ok(Vec::new());
    }

    let corrupt = |reason: String| CorruptWorkbookError {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e| corrupt(format!("not a readable xlsx file: {e}")))?;
    let range = workbook
        .worksheet_range(layout::PORTFOLIO_SHEET)
        .map_err(|e| corrupt(format!("sheet '{}': {e}", layout::PORTFOLIO_SHEET)))?;

    check_headers(&range).map_err(corrupt)?;
    let entries = read_entries(&range).map_err(corrupt)?;

    debug!(entries = entries.len(), "portfolio loaded");
    Ok(entries)
}

fn check_headers(range: &Range<Data>) -> Result<(), String> {
    for (col, expected) in portfolio::INPUT_HEADERS {
        let found = cell(range, portfolio::HEADER_ROW, col)
            .and_then(cell_text)
            .unwrap_or_default();
        if !found.starts_with(expected) {
            return Err(format!(
                "expected '{expected}' header in {}, found '{found}'",
                a1(portfolio::HEADER_ROW, col)
            ));
        }
    }
    Ok(())
}

fn read_entries(range: &Range<Data>) -> Result<Vec<PortfolioEntry>, String> {
    let last_row = match range.end() {
        Some((row, _)) => row,
        None => return Ok(Vec::new()),
    };

    let mut entries = Vec::new();
    for row in portfolio::FIRST_DATA_ROW..=last_row {
        let ticker = match cell(range, row, portfolio::TICKER).and_then(cell_text) {
            Some(t) => t.to_uppercase(),
            None => continue,
        };

        let shares_owned = cell(range, row, portfolio::SHARES)
            .map(parse_shares)
            .transpose()
            .map_err(|e| format!("{}: {e}", a1(row, portfolio::SHARES)))?
            .flatten();
        let buy_price = cell(range, row, portfolio::BUY_PRICE)
            .map(parse_price)
            .transpose()
            .map_err(|e| format!("{}: {e}", a1(row, portfolio::BUY_PRICE)))?
            .flatten();

        entries.push(PortfolioEntry {
            ticker,
            shares_owned,
            buy_price,
        });
    }
    Ok(entries)
}

fn cell(range: &Range<Data>, row: u32, col: u16) -> Option<&Data> {
    range.get_value((row, col as u32))
}

/// Trimmed text of a cell, `None` when blank.
fn cell_text(data: &Data) -> Option<String> {
    let text = match data {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

fn parse_shares(data: &Data) -> Result<Option<u64>, String> {
    match data {
        Data::Empty => Ok(None),
        Data::Int(i) => u64::try_from(*i)
            .map(Some)
            .map_err(|_| format!("share count {i} is negative")),
        Data::Float(f) => {
            if *f < 0.0 || f.fract() != 0.0 || !f.is_finite() {
                Err(format!("share count {f} is not a whole non-negative number"))
            } else {
                Ok(Some(*f as u64))
            }
        }
        Data::String(s) => {
            let cleaned = strip_separators(s);
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<u64>()
                .map(Some)
                .map_err(|_| format!("share count '{s}' is not a whole number"))
        }
        other => Err(format!("unexpected share count cell {other:?}")),
    }
}

fn parse_price(data: &Data) -> Result<Option<Decimal>, String> {
    let price = match data {
        Data::Empty => return Ok(None),
        Data::Int(i) => Decimal::from(*i),
        Data::Float(f) => {
            Decimal::from_f64(*f).ok_or_else(|| format!("buy price {f} is not a number"))?
        }
        Data::String(s) => {
            let cleaned = strip_separators(s);
            if cleaned.is_empty() {
                return Ok(None);
            }
            Decimal::from_str(&cleaned).map_err(|_| format!("buy price '{s}' is not a number"))?
        }
        other => return Err(format!("unexpected buy price cell {other:?}")),
    };

    if price.is_sign_negative() && !price.is_zero() {
        return Err(format!("buy price {price} is negative"));
    }
    Ok(Some(price))
}

fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect()
}

/// Spreadsheet-style address for error messages.
fn a1(row: u32, col: u16) -> String {
    let letter = char::from(b'A' + col as u8);
    format!("{}!{letter}{}", layout::PORTFOLIO_SHEET, row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn shares_accept_whole_numbers() {
        assert_eq!(parse_shares(&Data::Float(1000.0)), Ok(Some(1000)));
        assert_eq!(parse_shares(&Data::Int(5)), Ok(Some(5)));
        assert_eq!(parse_shares(&Data::String("1,500".into())), Ok(Some(1500)));
        assert_eq!(parse_shares(&Data::Empty), Ok(None));
        assert_eq!(parse_shares(&Data::String("  ".into())), Ok(None));
    }

    #[test]
    fn shares_reject_fractions_and_negatives() {
        assert!(parse_shares(&Data::Float(10.5)).is_err());
        assert!(parse_shares(&Data::Int(-3)).is_err());
        assert!(parse_shares(&Data::String("lots".into())).is_err());
        assert!(parse_shares(&Data::Bool(true)).is_err());
    }

    #[test]
    fn prices_parse_exactly() {
        assert_eq!(parse_price(&Data::Float(28.1)), Ok(Some(dec!(28.1))));
        assert_eq!(parse_price(&Data::String("1,234.50".into())), Ok(Some(dec!(1234.50))));
        assert_eq!(parse_price(&Data::Empty), Ok(None));
        assert!(parse_price(&Data::Float(-1.0)).is_err());
        assert!(parse_price(&Data::String("KES".into())).is_err());
    }

    #[test]
    fn addresses_are_one_based() {
        assert_eq!(a1(3, portfolio::SHARES), "My Portfolio!D4");
    }

    #[test]
    fn missing_file_is_empty_portfolio() {
        let dir = tempfile::tempdir().unwrap();
        let entries = read_portfolio(&dir.path().join("absent.xlsx")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        let err = read_portfolio(&path).unwrap_err();
        assert!(err.to_string().contains("not a readable xlsx"));
    }
}
