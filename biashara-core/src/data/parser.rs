//! Market page parser.
//!
//! The source site is a server-rendered Nuxt application. All stock data is
//! embedded in `<script id="__NUXT_DATA__">` as a flat JSON reference array:
//! objects hold *indices* into that array instead of values.
//!
//! ```text
//! nuxt[4]  = {"status": 5, "message": 6, "data": 7}
//! nuxt[7]  = [8, 28, 45, ...]                  stock object indices
//! nuxt[8]  = {"symbol": 10, "close": 25, "sector": 20, ...}
//! nuxt[10] = "ABSA"
//! nuxt[20] = {"name": 21}
//! nuxt[21] = "Banking"
//! ```
//!
//! Failures are split in two. A page whose overall shape is unrecognised
//! fails the whole run with [`StructureChangedError`]. A single stock entry
//! that cannot be read becomes a [`RowParseError`] and is skipped.

use super::provider::RawPage;
use crate::domain::SecurityRecord;
use chrono::FixedOffset;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Position of the page-state object that points at the stock list.
const STATE_INDEX: usize = 4;

/// Minimum length of an all-integer array accepted by the fallback search.
const MIN_FALLBACK_LIST_LEN: usize = 30;

/// Renderings the source uses for "no change today".
const UNCHANGED_MARKERS: &[&str] = &["-", "\u{2013}", "\u{2014}", "unch", "unchanged", "n/c"];

/// The page no longer looks like the market page we know how to read.
#[derive(Debug, Error)]
#[error("source page structure changed: {0}")]
pub struct StructureChangedError(pub String);

/// One stock entry that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row_index}: {reason}")]
pub struct RowParseError {
    /// Zero-based position of the entry in the page's stock list.
    pub row_index: usize,
    pub reason: String,
}

impl RowParseError {
    fn new(row_index: usize, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            reason: reason.into(),
        }
    }
}

/// Records in page order plus every row that was skipped.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub records: Vec<SecurityRecord>,
    pub row_errors: Vec<RowParseError>,
}

/// Parse the market page into security records.
///
/// `offset` is the zone used to stamp `updated_at` on every record.
pub fn parse(page: &RawPage, offset: FixedOffset) -> Result<ParseOutput, StructureChangedError> {
    let nuxt = extract_nuxt_data(&page.body)?;
    let stock_list = find_stock_list(&nuxt).ok_or_else(|| {
        StructureChangedError("could not locate stock list in __NUXT_DATA__".into())
    })?;

    debug!(entries = stock_list.len(), "stock list located");

    let updated_at = page.fetched_at.with_timezone(&offset);
    let mut output = ParseOutput::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (row_index, pointer) in stock_list.iter().enumerate() {
        let row = RowReader {
            nuxt: &nuxt,
            row_index,
        };

        let parsed = row.object(pointer).and_then(|obj| row.record(obj, updated_at));
        let record = match parsed {
            Ok(record) => record,
            Err(e) => {
                output.row_errors.push(e);
                continue;
            }
        };

        if let Some(first) = seen.get(&record.ticker) {
            output.row_errors.push(RowParseError::new(
                row_index,
                format!("duplicate ticker {} (first seen at row {first})", record.ticker),
            ));
            continue;
        }
        seen.insert(record.ticker.clone(), row_index);

        debug!(
            ticker = %record.ticker,
            price = %record.price,
            change_pct = %record.change_pct,
            "parsed"
        );
        output.records.push(record);
    }

    if output.records.is_empty() {
        return Err(StructureChangedError(format!(
            "no securities could be read from {} stock entries",
            stock_list.len()
        )));
    }

    Ok(output)
}

/// Pull the JSON reference array out of the page.
fn extract_nuxt_data(body: &str) -> Result<Vec<Value>, StructureChangedError> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("script#__NUXT_DATA__")
        .map_err(|e| StructureChangedError(format!("invalid selector: {e:?}")))?;

    let script = document.select(&selector).next().ok_or_else(|| {
        StructureChangedError("__NUXT_DATA__ script tag not found".into())
    })?;
    let payload: String = script.text().collect();

    let value: Value = serde_json::from_str(&payload)
        .map_err(|e| StructureChangedError(format!("__NUXT_DATA__ is not valid JSON: {e}")))?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(StructureChangedError(format!(
            "__NUXT_DATA__ root is {}, expected an array",
            json_kind(&other)
        ))),
    }
}

/// Locate the array of stock-object indices.
///
/// The primary path follows `nuxt[4]["data"]`. When the page state moves,
/// fall back to the first long all-integer array, which survives minor
/// layout shifts.
fn find_stock_list(nuxt: &[Value]) -> Option<&Vec<Value>> {
    let primary = nuxt
        .get(STATE_INDEX)
        .and_then(Value::as_object)
        .and_then(|state| state.get("data"))
        .and_then(Value::as_u64)
        .and_then(|idx| nuxt.get(idx as usize))
        .and_then(Value::as_array);

    if let Some(list) = primary {
        return Some(list);
    }

    nuxt.iter().filter_map(Value::as_array).find(|items| {
        items.len() >= MIN_FALLBACK_LIST_LEN && items.iter().all(|v| v.is_u64())
    })
}

struct RowReader<'a> {
    nuxt: &'a [Value],
    row_index: usize,
}

impl<'a> RowReader<'a> {
    fn err(&self, reason: impl Into<String>) -> RowParseError {
        RowParseError::new(self.row_index, reason)
    }

    fn deref(&self, pointer: &Value) -> Option<&'a Value> {
        pointer
            .as_u64()
            .and_then(|idx| self.nuxt.get(idx as usize))
    }

    fn object(&self, pointer: &Value) -> Result<&'a Map<String, Value>, RowParseError> {
        let target = self
            .deref(pointer)
            .ok_or_else(|| self.err(format!("dangling stock pointer {pointer}")))?;
        target
            .as_object()
            .ok_or_else(|| self.err(format!("unexpected row shape: {}", json_kind(target))))
    }

    /// Value behind `key`, treating a dangling index or `null` as absent.
    fn field(&self, obj: &Map<String, Value>, key: &str) -> Option<&'a Value> {
        obj.get(key)
            .and_then(|pointer| self.deref(pointer))
            .filter(|v| !v.is_null())
    }

    fn text(&self, obj: &Map<String, Value>, key: &str) -> String {
        match self.field(obj, key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other @ Value::Number(_)) => other.to_string(),
            _ => String::new(),
        }
    }

    fn sector(&self, obj: &Map<String, Value>) -> String {
        self.field(obj, "sector")
            .and_then(Value::as_object)
            .map(|sector| self.text(sector, "name"))
            .unwrap_or_default()
    }

    fn record(
        &self,
        obj: &Map<String, Value>,
        updated_at: chrono::DateTime<FixedOffset>,
    ) -> Result<SecurityRecord, RowParseError> {
        let ticker = self.text(obj, "symbol").to_uppercase();
        if ticker.is_empty() {
            return Err(self.err("missing symbol"));
        }

        let close = self
            .field(obj, "close")
            .ok_or_else(|| self.err(format!("{ticker}: missing close price")))?;
        let price = parse_decimal(close)
            .ok_or_else(|| self.err(format!("{ticker}: non-numeric close price {close}")))?;
        if price.is_sign_negative() && !price.is_zero() {
            return Err(self.err(format!("{ticker}: negative close price {price}")));
        }

        let volume = match self.field(obj, "volume") {
            None => 0,
            Some(v) => parse_volume(v)
                .ok_or_else(|| self.err(format!("{ticker}: non-numeric volume {v}")))?,
        };

        let change_pct = match self.field(obj, "change_percent") {
            Some(v) => parse_change(v)
                .ok_or_else(|| self.err(format!("{ticker}: unreadable change {v}")))?,
            None => {
                let previous = self
                    .field(obj, "previous_price")
                    .and_then(parse_decimal)
                    .filter(|p| !p.is_zero())
                    .ok_or_else(|| {
                        self.err(format!("{ticker}: no change indicator or previous price"))
                    })?;
                if previous.is_sign_negative() {
                    return Err(self.err(format!("{ticker}: negative previous price {previous}")));
                }
                price
                    .checked_sub(previous)
                    .and_then(|diff| diff.checked_div(previous))
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                    .map(|pct| pct.round_dp(2))
                    .ok_or_else(|| {
                        self.err(format!("{ticker}: change from {previous} to {price} overflows"))
                    })?
            }
        };

        Ok(SecurityRecord {
            company: self.text(obj, "company_name"),
            sector: self.sector(obj),
            ticker,
            price,
            change_pct,
            volume,
            updated_at,
        })
    }
}

/// Parse a number rendered either as JSON or as text with thousands separators.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => decimal_from_str(&n.to_string()),
        Value::String(s) => decimal_from_str(&strip_separators(s)),
        _ => None,
    }
}

/// Parse a signed percentage change. Explicit unchanged markers map to zero;
/// anything else unreadable is `None`, never a silent zero.
pub fn parse_change(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(_) => parse_decimal(value),
        Value::String(s) => {
            let trimmed = s.trim();
            if UNCHANGED_MARKERS
                .iter()
                .any(|marker| trimmed.eq_ignore_ascii_case(marker))
            {
                return Some(Decimal::ZERO);
            }
            let body = trimmed.trim_end_matches('%').trim();
            let body = body.strip_prefix('+').unwrap_or(body);
            decimal_from_str(&strip_separators(body))
        }
        _ => None,
    }
}

fn parse_volume(value: &Value) -> Option<u64> {
    if let Some(v) = value.as_u64() {
        return Some(v);
    }
    let d = parse_decimal(value)?;
    if d.is_sign_negative() || !d.fract().is_zero() {
        return None;
    }
    d.to_u64()
}

fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect()
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixture::{NuxtPage, StockFixture};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn eat() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn page(body: String) -> RawPage {
        RawPage {
            url: "https://example.com/nse".into(),
            body,
            fetched_at: Utc.with_ymd_and_hms(2024, 6, 3, 7, 0, 0).unwrap(),
        }
    }

    #[test]
    fn parses_basic_rows() {
        let body = NuxtPage::new()
            .stock(StockFixture::new("SCOM", "Safaricom Plc", 30.0, 29.5, 1_250_000).sector("Telecommunication"))
            .stock(StockFixture::new("EQTY", "Equity Group Holdings", 42.25, 42.25, 300_000).sector("Banking"))
            .html();

        let out = parse(&page(body), eat()).unwrap();
        assert!(out.row_errors.is_empty(), "{:?}", out.row_errors);
        assert_eq!(out.records.len(), 2);

        let scom = &out.records[0];
        assert_eq!(scom.ticker, "SCOM");
        assert_eq!(scom.company, "Safaricom Plc");
        assert_eq!(scom.sector, "Telecommunication");
        assert_eq!(scom.price, dec!(30));
        assert_eq!(scom.change_pct, dec!(1.69));
        assert_eq!(scom.volume, 1_250_000);
        assert_eq!(scom.updated_at.offset(), &eat());
        assert_eq!(scom.updated_at.format("%H:%M").to_string(), "10:00");

        assert_eq!(out.records[1].change_pct, dec!(0));
    }

    #[test]
    fn missing_script_is_structure_change() {
        let err = parse(&page("<html><body><table></table></body></html>".into()), eat()).unwrap_err();
        assert!(err.to_string().contains("__NUXT_DATA__"));
    }

    #[test]
    fn non_json_payload_is_structure_change() {
        let body = r#"<script id="__NUXT_DATA__">window.__NUXT__={}</script>"#.to_string();
        assert!(parse(&page(body), eat()).is_err());
    }

    #[test]
    fn object_root_is_structure_change() {
        let body = r#"<script id="__NUXT_DATA__">{"data": []}</script>"#.to_string();
        let err = parse(&page(body), eat()).unwrap_err();
        assert!(err.to_string().contains("expected an array"));
    }

    #[test]
    fn missing_stock_list_is_structure_change() {
        let body = r#"<script id="__NUXT_DATA__">[1, 2, 3]</script>"#.to_string();
        let err = parse(&page(body), eat()).unwrap_err();
        assert!(err.to_string().contains("stock list"));
    }

    #[test]
    fn fallback_finds_long_integer_list() {
        let mut builder = NuxtPage::new().without_data_pointer();
        for i in 0..MIN_FALLBACK_LIST_LEN {
            builder = builder.stock(StockFixture::new(&format!("T{i:02}"), "Co", 10.0, 10.0, 1));
        }
        let out = parse(&page(builder.html()), eat()).unwrap();
        assert_eq!(out.records.len(), MIN_FALLBACK_LIST_LEN);
    }

    #[test]
    fn malformed_row_is_skipped_not_fatal() {
        let body = NuxtPage::new()
            .stock(StockFixture::new("ABSA", "Absa Bank Kenya", 14.0, 13.9, 1000))
            .stock(StockFixture::new("BAD", "Broken", 0.0, 1.0, 0).close(json!("n/a")))
            .raw(json!("not an object"))
            .stock(StockFixture::new("KCB", "KCB Group", 38.5, 38.0, 5000))
            .html();

        let out = parse(&page(body), eat()).unwrap();
        let tickers: Vec<_> = out.records.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, ["ABSA", "KCB"]);
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.row_errors[0].row_index, 1);
        assert!(out.row_errors[0].reason.contains("non-numeric close"));
        assert_eq!(out.row_errors[1].row_index, 2);
        assert!(out.row_errors[1].reason.contains("unexpected row shape"));
    }

    #[test]
    fn duplicate_ticker_keeps_first() {
        let body = NuxtPage::new()
            .stock(StockFixture::new("SCOM", "Safaricom", 30.0, 30.0, 1))
            .stock(StockFixture::new("SCOM", "Safaricom again", 31.0, 30.0, 1))
            .html();

        let out = parse(&page(body), eat()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].company, "Safaricom");
        assert_eq!(out.row_errors.len(), 1);
        assert!(out.row_errors[0].reason.contains("duplicate ticker SCOM"));
    }

    #[test]
    fn string_numbers_with_thousands_separators() {
        let body = NuxtPage::new()
            .stock(
                StockFixture::new("BAT", "BAT Kenya", 0.0, 0.0, 0)
                    .close(json!("1,234.50"))
                    .volume(json!("2,500,000"))
                    .change(json!("+1.25%")),
            )
            .html();

        let out = parse(&page(body), eat()).unwrap();
        let bat = &out.records[0];
        assert_eq!(bat.price, dec!(1234.50));
        assert_eq!(bat.volume, 2_500_000);
        assert_eq!(bat.change_pct, dec!(1.25));
    }

    #[test]
    fn explicit_unchanged_marker_is_zero() {
        assert_eq!(parse_change(&json!("-")), Some(Decimal::ZERO));
        assert_eq!(parse_change(&json!("UNCH")), Some(Decimal::ZERO));
        assert_eq!(parse_change(&json!("-0.40%")), Some(dec!(-0.40)));
        assert_eq!(parse_change(&json!(2.5)), Some(dec!(2.5)));
        assert_eq!(parse_change(&json!("abc")), None);
        assert_eq!(parse_change(&json!("")), None);
    }

    fn with_good_row(stock: StockFixture) -> String {
        NuxtPage::new()
            .stock(StockFixture::new("ABSA", "Absa Bank Kenya", 14.0, 14.0, 1))
            .stock(stock)
            .html()
    }

    #[test]
    fn missing_previous_price_is_row_error_not_zero() {
        let body = with_good_row(
            StockFixture::new("NMG", "Nation Media", 15.0, 0.0, 10).previous(Value::Null),
        );

        let out = parse(&page(body), eat()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert!(out.row_errors[0].reason.contains("no change indicator"));
    }

    #[test]
    fn extreme_change_is_row_error() {
        let body = with_good_row(
            StockFixture::new("HUGE", "Huge Ltd", 0.0, 0.0, 1)
                .close(json!("50000000000000000000000000000"))
                .previous(json!("0.5")),
        );

        let out = parse(&page(body), eat()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].ticker, "ABSA");
        assert_eq!(out.row_errors.len(), 1);
        assert!(out.row_errors[0].reason.contains("overflows"));
    }

    #[test]
    fn negative_previous_price_is_row_error() {
        let body = with_good_row(
            StockFixture::new("NEG", "Negative Ltd", 10.0, 0.0, 1).previous(json!(-2.5)),
        );

        let out = parse(&page(body), eat()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert!(out.row_errors[0].reason.contains("negative previous price"));
    }

    #[test]
    fn page_with_no_readable_rows_is_structure_change() {
        let body = NuxtPage::new()
            .raw(json!(12))
            .raw(json!("x"))
            .html();
        let err = parse(&page(body), eat()).unwrap_err();
        assert!(err.to_string().contains("from 2 stock entries"));
    }

    #[test]
    fn missing_volume_means_no_trades() {
        let body = with_good_row(
            StockFixture::new("EGAD", "Eaagads", 12.0, 12.0, 0).volume(Value::Null),
        );

        let out = parse(&page(body), eat()).unwrap();
        assert_eq!(out.records[1].volume, 0);
    }

    #[test]
    fn negative_volume_is_rejected() {
        let body = with_good_row(
            StockFixture::new("EGAD", "Eaagads", 12.0, 12.0, 0).volume(json!(-5)),
        );

        let out = parse(&page(body), eat()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert!(out.row_errors[0].reason.contains("volume"));
    }

    #[test]
    fn blank_symbol_is_row_error() {
        let body = with_good_row(StockFixture::new("  ", "Nobody", 1.0, 1.0, 0));

        let out = parse(&page(body), eat()).unwrap();
        assert_eq!(out.row_errors[0].reason, "missing symbol");
    }
}
