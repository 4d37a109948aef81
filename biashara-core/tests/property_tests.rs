//! Property tests for parsing and reconciliation.
//!
//! Uses proptest to verify:
//! 1. Parsed tickers are unique and all come from the page
//! 2. Reconciliation keeps every portfolio row, in order
//! 3. The Market sheet is sorted by ticker

use biashara_core::data::fixture::{NuxtPage, StockFixture};
use biashara_core::data::{parse, RawPage};
use biashara_core::domain::{PortfolioEntry, SecurityRecord};
use biashara_core::reconcile::reconcile;
use chrono::{FixedOffset, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_ticker() -> impl Strategy<Value = String> {
    "[A-Z]{2,5}"
}

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..2000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_record() -> impl Strategy<Value = SecurityRecord> {
    (arb_ticker(), 1u32..100_000).prop_map(|(ticker, cents)| SecurityRecord {
        company: format!("{ticker} Holdings"),
        ticker,
        sector: "Investment".into(),
        price: Decimal::new(cents.into(), 2),
        change_pct: Decimal::ZERO,
        volume: 0,
        updated_at: FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 3, 10, 0, 0)
            .unwrap(),
    })
}

fn arb_entry() -> impl Strategy<Value = PortfolioEntry> {
    (arb_ticker(), proptest::option::of(0u64..10_000), proptest::option::of(0u32..100_000)).prop_map(
        |(ticker, shares_owned, cents)| PortfolioEntry {
            ticker,
            shares_owned,
            buy_price: cents.map(|c| Decimal::new(c.into(), 2)),
        },
    )
}

// ── 1. Parser output ─────────────────────────────────────────────────

proptest! {
    /// Tickers are pairwise unique, drawn from the page, and every distinct
    /// well-formed symbol is kept.
    #[test]
    fn parsed_tickers_unique_subset(
        stocks in prop::collection::vec((arb_ticker(), arb_price(), arb_price()), 1..40)
    ) {
        let mut page = NuxtPage::new();
        for (symbol, close, previous) in &stocks {
            page = page.stock(StockFixture::new(symbol, "Listed Co", *close, *previous, 100));
        }
        let raw = RawPage {
            url: "https://example.com/nse".into(),
            body: page.html(),
            fetched_at: Utc.with_ymd_and_hms(2024, 6, 3, 7, 0, 0).unwrap(),
        };

        let out = parse(&raw, FixedOffset::east_opt(3 * 3600).unwrap()).unwrap();

        let on_page: HashSet<&str> = stocks.iter().map(|(s, _, _)| s.as_str()).collect();
        let parsed: HashSet<&str> = out.records.iter().map(|r| r.ticker.as_str()).collect();
        prop_assert_eq!(parsed.len(), out.records.len());
        prop_assert!(parsed.is_subset(&on_page));
        prop_assert_eq!(parsed.len(), on_page.len());
        prop_assert_eq!(out.records.len() + out.row_errors.len(), stocks.len());
    }
}

// ── 2. Reconciliation order ──────────────────────────────────────────

proptest! {
    /// One output row per entry, same order, nothing invented.
    #[test]
    fn reconcile_preserves_portfolio(
        records in prop::collection::vec(arb_record(), 0..20),
        entries in prop::collection::vec(arb_entry(), 0..30),
    ) {
        let mut seen = HashSet::new();
        let records: Vec<_> = records.into_iter().filter(|r| seen.insert(r.ticker.clone())).collect();

        let view = reconcile(&records, &entries);

        prop_assert_eq!(view.portfolio.len(), entries.len());
        for (i, (row, entry)) in view.portfolio.iter().zip(&entries).enumerate() {
            prop_assert_eq!(row.position, i + 1);
            prop_assert_eq!(&row.entry, entry);
            prop_assert_eq!(row.is_priced(), seen.contains(&entry.ticker));
        }

        let unmatched = entries.iter().filter(|e| !seen.contains(&e.ticker)).count();
        prop_assert_eq!(view.warnings.len(), unmatched);
    }

    /// The Market sheet holds every record exactly once, sorted by ticker.
    #[test]
    fn market_sorted_and_complete(records in prop::collection::vec(arb_record(), 0..30)) {
        let view = reconcile(&records, &[]);

        prop_assert_eq!(view.market.len(), records.len());
        for pair in view.market.windows(2) {
            prop_assert!(pair[0].ticker.to_lowercase() <= pair[1].ticker.to_lowercase());
        }
    }
}
