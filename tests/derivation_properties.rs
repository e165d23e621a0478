use portald::calc::{
    aggregate_attendance, attendance_percentage, is_eligible, AttendanceRecord,
};
use portald::currency::{format_budget, inr_to_usd, parse_budget, usd_to_inr, ExchangeRate};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = AttendanceRecord> {
    (1u32..500).prop_flat_map(|total| {
        (0..=total).prop_map(move |attended| {
            AttendanceRecord::new("subject", total, attended).expect("attended <= total")
        })
    })
}

proptest! {
    #[test]
    fn percentage_is_bounded(total in 1u32..10_000, frac in 0.0f64..=1.0) {
        let attended = ((total as f64) * frac).floor() as u32;
        let p = attendance_percentage(attended, total).expect("valid input");
        prop_assert!(p <= 100);
    }

    #[test]
    fn percentage_is_monotonic_in_attended(total in 1u32..2_000, a in 0u32..2_000) {
        let a = a.min(total - 1);
        let lo = attendance_percentage(a, total).expect("lo");
        let hi = attendance_percentage(a + 1, total).expect("hi");
        prop_assert!(lo <= hi);
    }

    #[test]
    fn percentage_matches_float_rounding_away_from_ties(total in 1u32..5_000, a in 0u32..5_000) {
        let a = a.min(total);
        let exact = (a as f64) / (total as f64) * 100.0;
        prop_assume!((exact.fract() - 0.5).abs() > 1e-6);
        let p = attendance_percentage(a, total).expect("valid");
        prop_assert_eq!(p as f64, exact.round());
    }

    #[test]
    fn eligibility_is_threshold_comparison(p in 0u32..=100, t in 0u32..=100) {
        prop_assert_eq!(is_eligible(p, t), p >= t);
    }

    #[test]
    fn aggregate_is_order_independent(
        records in prop::collection::vec(record_strategy(), 1..12),
        seed in any::<u64>(),
    ) {
        let forward = aggregate_attendance(&records).expect("non-empty totals");
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        let k = (seed as usize) % rotated.len();
        rotated.rotate_left(k);

        prop_assert_eq!(aggregate_attendance(&reversed).expect("reversed"), forward);
        prop_assert_eq!(aggregate_attendance(&rotated).expect("rotated"), forward);
    }

    #[test]
    fn usd_round_trip_is_exact_for_whole_dollars(usd in 0u32..10_000_000, rate in 1.0f64..500.0) {
        let rate = ExchangeRate::new(rate).expect("rate");
        let usd = usd as f64;
        prop_assert_eq!(inr_to_usd(usd_to_inr(usd, rate), rate), usd);
    }

    #[test]
    fn inr_round_trip_is_within_half_a_dollar(inr in 0u32..100_000_000, rate in 1.0f64..500.0) {
        let rate = ExchangeRate::new(rate).expect("rate");
        let inr = inr as f64;
        let back = usd_to_inr(inr_to_usd(inr, rate), rate);
        prop_assert!((back - inr).abs() <= rate.value() / 2.0 + 0.5);
    }

    #[test]
    fn formatted_budget_parses_back(amount in 0u64..1_000_000_000_000) {
        let text = format_budget(amount as f64);
        prop_assert!(text.starts_with('$'));
        prop_assert_eq!(parse_budget(&text).expect("formatted text parses"), amount as f64);
    }
}

#[test]
fn documented_examples() {
    let records = vec![
        AttendanceRecord::new("a", 48, 42).expect("record"),
        AttendanceRecord::new("b", 40, 26).expect("record"),
    ];
    let agg = aggregate_attendance(&records).expect("aggregate");
    assert_eq!(
        (agg.total_classes, agg.total_attended, agg.overall_percentage),
        (88, 68, 77)
    );

    let rate = ExchangeRate::new(90.22).expect("rate");
    assert_eq!(usd_to_inr(450_000.0, rate), 40_599_000.0);
    assert!((inr_to_usd(40_599_000.0, rate) - 450_000.0).abs() <= 1.0);
    assert_eq!(format_budget(450_000.0), "$450,000");
}
