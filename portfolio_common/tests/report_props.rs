use chrono::NaiveDate;
use portfolio_common::report::percent_change;
use portfolio_common::tickers::DEFAULT_HEADER_LABEL;
use portfolio_common::{CurrencyAmount, ReportExtras, ReportFormatError, format_report_on, map_tickers};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

fn arb_cents() -> impl Strategy<Value = i64> {
    -1_000_000_000i64..1_000_000_000i64
}

fn arb_amount_text() -> impl Strategy<Value = String> {
    arb_cents().prop_map(|c| CurrencyAmount::from_value(Decimal::new(c, 2)).as_str().to_string())
}

fn arb_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(DEFAULT_HEADER_LABEL.to_string()),
        Just(String::new()),
        Just("   ".to_string()),
        "[A-Z]{1,5}",
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

proptest! {
    #[test]
    fn mapper_never_keeps_header_or_blanks(column in proptest::collection::vec(arb_cell(), 0..40)) {
        let mapped = map_tickers(&column, DEFAULT_HEADER_LABEL);
        for symbol in &mapped {
            prop_assert_ne!(symbol.as_str(), DEFAULT_HEADER_LABEL);
            prop_assert!(!symbol.as_str().is_empty());
        }
        let distinct: BTreeSet<&str> = column
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && *c != DEFAULT_HEADER_LABEL)
            .collect();
        prop_assert_eq!(mapped.len(), distinct.len());
    }

    #[test]
    fn amount_text_round_trips_to_same_value(cents in arb_cents()) {
        let value = Decimal::new(cents, 2);
        let rendered = CurrencyAmount::from_value(value);
        let parsed = CurrencyAmount::parse(rendered.as_str()).unwrap();
        prop_assert_eq!(parsed.value(), value);
    }

    #[test]
    fn report_is_deterministic(
        date in arb_date(),
        previous in arb_amount_text(),
        current in arb_amount_text(),
    ) {
        let extras = ReportExtras::default();
        let first = format_report_on(date, &previous, &current, &extras);
        let swapped_first = format_report_on(date, &current, &previous, &extras);
        let second = format_report_on(date, &previous, &current, &extras);
        let swapped_second = format_report_on(date, &current, &previous, &extras);
        prop_assert_eq!(first, second);
        prop_assert_eq!(swapped_first, swapped_second);
    }

    #[test]
    fn zero_previous_is_always_division_by_zero(current in arb_amount_text(), date in arb_date()) {
        let result = format_report_on(date, "$0.00", &current, &ReportExtras::default());
        prop_assert_eq!(result, Err(ReportFormatError::DivisionByZero));
    }

    #[test]
    fn percent_has_at_most_two_decimals(a in arb_cents(), b in arb_cents()) {
        prop_assume!(a != 0);
        let previous = CurrencyAmount::from_value(Decimal::new(a, 2));
        let current = CurrencyAmount::from_value(Decimal::new(b, 2));
        let pct = percent_change(&previous, &current).unwrap();
        prop_assert!(pct.normalize().scale() <= 2);
    }
}
