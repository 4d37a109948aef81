//! Render the two sheets and replace the workbook file atomically.
//!
//! The whole workbook is built in memory first. The bytes then go to a
//! temporary file beside the target, which is fsynced and renamed over it,
//! so a crash mid-write leaves the previous workbook in place.

use super::layout::{self, market, portfolio, PortfolioFormulas};
use super::style::Styles;
use super::WriteError;
use crate::domain::{PortfolioRow, SecurityRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Formula, RowNum, Workbook, Worksheet};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write both sheets to `path`, replacing any previous workbook.
pub fn write_workbook(
    market: &[SecurityRecord],
    portfolio: &[PortfolioRow],
    path: &Path,
) -> Result<(), WriteError> {
    let bytes = render(market, portfolio)?;
    persist_atomically(&bytes, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "workbook written");
    Ok(())
}

/// Build the xlsx file in memory.
pub fn render(market: &[SecurityRecord], portfolio: &[PortfolioRow]) -> Result<Vec<u8>, WriteError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    workbook.push_worksheet(market_sheet(market, &styles)?);
    workbook.push_worksheet(portfolio_sheet(portfolio, &styles)?);
    Ok(workbook.save_to_buffer()?)
}

fn persist_atomically(bytes: &[u8], path: &Path) -> Result<(), WriteError> {
    let persist_err = |source: std::io::Error| WriteError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(persist_err)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".biashara-")
        .suffix(".xlsx.tmp")
        .tempfile_in(dir)
        .map_err(persist_err)?;
    staged.write_all(bytes).map_err(persist_err)?;
    staged.as_file().sync_all().map_err(persist_err)?;

    // The temp file is removed on drop if the rename fails.
    staged.persist(path).map_err(|e| persist_err(e.error))?;
    Ok(())
}

fn market_sheet(records: &[SecurityRecord], styles: &Styles) -> Result<Worksheet, WriteError> {
    let mut ws = Worksheet::new();
    ws.set_name(layout::MARKET_SHEET)?;

    for (col, (title, width)) in market::HEADERS.iter().enumerate() {
        let col = col as u16;
        ws.write_string_with_format(market::HEADER_ROW, col, *title, &styles.header)?;
        ws.set_column_width(col, *width)?;
    }
    ws.set_freeze_panes(market::FIRST_DATA_ROW, 0)?;
    ws.set_screen_gridlines(false);

    for (i, record) in records.iter().enumerate() {
        let row = market::FIRST_DATA_ROW + i as RowNum;
        let striped = is_striped(row);
        let change_style = if record.is_gain() {
            &styles.gain_pct
        } else {
            &styles.loss_pct
        };

        ws.write_string_with_format(
            row,
            market::TICKER,
            &record.ticker,
            &styles.row(&styles.ticker, striped),
        )?;
        ws.write_string_with_format(
            row,
            market::COMPANY,
            &record.company,
            &styles.row(&styles.data, striped),
        )?;
        ws.write_string_with_format(
            row,
            market::SECTOR,
            &record.sector,
            &styles.row(&styles.data, striped),
        )?;
        ws.write_number_with_format(
            row,
            market::PRICE,
            to_f64(record.price),
            &styles.row(&styles.money, striped),
        )?;
        ws.write_number_with_format(
            row,
            market::CHANGE,
            to_f64(record.change_pct / Decimal::ONE_HUNDRED),
            &styles.row(change_style, striped),
        )?;
        ws.write_number_with_format(
            row,
            market::VOLUME,
            record.volume as f64,
            &styles.row(&styles.count, striped),
        )?;
        ws.write_string_with_format(
            row,
            market::LAST_UPDATED,
            record.updated_at.format("%Y-%m-%d %H:%M %:z").to_string(),
            &styles.row(&styles.data, striped),
        )?;
    }

    Ok(ws)
}

fn portfolio_sheet(rows: &[PortfolioRow], styles: &Styles) -> Result<Worksheet, WriteError> {
    let mut ws = Worksheet::new();
    ws.set_name(layout::PORTFOLIO_SHEET)?;

    ws.merge_range(
        portfolio::TITLE_ROW,
        0,
        portfolio::TITLE_ROW,
        portfolio::LAST_COL,
        portfolio::TITLE,
        &styles.title,
    )?;
    ws.merge_range(
        portfolio::NOTE_ROW,
        0,
        portfolio::NOTE_ROW,
        portfolio::LAST_COL,
        portfolio::NOTE,
        &styles.note,
    )?;

    for (col, (title, width)) in portfolio::HEADERS.iter().enumerate() {
        let col = col as u16;
        ws.write_string_with_format(portfolio::HEADER_ROW, col, *title, &styles.header)?;
        ws.set_column_width(col, *width)?;
    }
    ws.set_freeze_panes(portfolio::FIRST_DATA_ROW, 0)?;
    ws.set_screen_gridlines(false);

    for (i, item) in rows.iter().enumerate() {
        let row = portfolio::FIRST_DATA_ROW + i as RowNum;
        write_holding(&mut ws, row, item, styles)?;
    }

    for i in rows.len()..portfolio::MIN_ROWS {
        let row = portfolio::FIRST_DATA_ROW + i as RowNum;
        write_blank_row(&mut ws, row, i + 1, styles)?;
    }

    Ok(ws)
}

fn write_holding(
    ws: &mut Worksheet,
    row: RowNum,
    item: &PortfolioRow,
    styles: &Styles,
) -> Result<(), WriteError> {
    let striped = is_striped(row);
    let formulas = PortfolioFormulas::for_row(row);
    let valuation = item.valuation.as_ref();

    ws.write_number_with_format(
        row,
        portfolio::NUMBER,
        item.position as f64,
        &styles.row(&styles.centered, striped),
    )?;
    ws.write_string_with_format(
        row,
        portfolio::TICKER,
        &item.entry.ticker,
        &styles.row(&styles.ticker, striped),
    )?;

    match item.entry.shares_owned {
        Some(shares) => ws.write_number_with_format(
            row,
            portfolio::SHARES,
            shares as f64,
            &styles.row(&styles.count, striped),
        )?,
        None => ws.write_blank(row, portfolio::SHARES, &styles.row(&styles.count, striped))?,
    };
    match item.entry.buy_price {
        Some(price) => ws.write_number_with_format(
            row,
            portfolio::BUY_PRICE,
            to_f64(price),
            &styles.row(&styles.money, striped),
        )?,
        None => ws.write_blank(row, portfolio::BUY_PRICE, &styles.row(&styles.money, striped))?,
    };

    let derived: [(u16, String, Option<String>, &Format); 5] = [
        (
            portfolio::COMPANY,
            formulas.company(),
            valuation.map(|v| v.company.clone()),
            &styles.data,
        ),
        (
            portfolio::CURRENT_PRICE,
            formulas.current_price(),
            valuation.map(|v| v.current_price.to_string()),
            &styles.money,
        ),
        (
            portfolio::CURRENT_VALUE,
            formulas.current_value(),
            valuation.and_then(|v| v.current_value).map(|d| d.to_string()),
            &styles.money,
        ),
        (
            portfolio::GAIN_LOSS,
            formulas.gain_loss(),
            valuation.and_then(|v| v.gain_loss).map(|d| d.to_string()),
            &styles.signed_money,
        ),
        (
            portfolio::GAIN_LOSS_PCT,
            formulas.gain_loss_pct(),
            valuation
                .and_then(|v| v.gain_loss_pct)
                .map(|pct| (pct / Decimal::ONE_HUNDRED).normalize().to_string()),
            &styles.signed_pct,
        ),
    ];

    // Unavailable values cache "" like the formula's own fallback, so readers
    // that do not recalculate never see a zero.
    for (col, text, cached, format) in derived {
        let formula = Formula::new(text).set_result(cached.unwrap_or_default());
        ws.write_formula_with_format(row, col, formula, &styles.row(format, striped))?;
    }

    Ok(())
}

fn write_blank_row(
    ws: &mut Worksheet,
    row: RowNum,
    number: usize,
    styles: &Styles,
) -> Result<(), WriteError> {
    let striped = is_striped(row);
    ws.write_number_with_format(
        row,
        portfolio::NUMBER,
        number as f64,
        &styles.row(&styles.centered, striped),
    )?;
    if striped {
        for col in portfolio::TICKER..=portfolio::LAST_COL {
            ws.write_blank(row, col, &styles.row(&styles.data, true))?;
        }
    }
    Ok(())
}

/// Even spreadsheet rows (odd zero-based rows) get the light fill.
fn is_striped(row: RowNum) -> bool {
    row % 2 == 1
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
