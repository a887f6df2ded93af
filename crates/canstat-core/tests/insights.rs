use canstat_core::insights::{
    detect_movers, detect_trend_breaks, run_all, scan_correlations, BreakDirection,
    CorrelationOptions, CorrelationSign, MoverDirection, MoverOptions, SeriesTable,
    TrendBreakOptions,
};
use canstat_core::InsightConfig;
use canstat_parser::CanonicalRecord;

fn series(source: &str, variable: &str, points: &[(i32, f64)]) -> Vec<CanonicalRecord> {
    points
        .iter()
        .map(|(year, value)| CanonicalRecord {
            source_id: source.into(),
            table_id: "1".into(),
            table_title: None,
            topic: "Test".into(),
            variable: variable.into(),
            year: *year,
            year_label: year.to_string(),
            value: *value,
        })
        .collect()
}

fn wavy(start: i32, len: i32) -> Vec<(i32, f64)> {
    (0..len)
        .map(|i| (start + i, f64::from(i) * 1.5 + f64::from(i % 3)))
        .collect()
}

#[test]
fn identical_series_from_different_sources_correlate() {
    let mut records = series("CAN-A", "alkohol", &wavy(2000, 10));
    records.extend(series("CAN-B", "alkohol", &wavy(2000, 10)));

    let edges = scan_correlations(
        &SeriesTable::from_records(&records),
        &CorrelationOptions::default(),
    );

    assert_eq!(edges.len(), 1);
    let edge = &edges[0];
    assert!((edge.correlation - 1.0).abs() < 1e-9);
    assert!(edge.p_value < 1e-6);
    assert_eq!(edge.overlap_years, 10);
    assert_eq!((edge.year_min, edge.year_max), (2000, 2009));
    assert_eq!(edge.direction, CorrelationSign::Positive);
    assert_eq!(edge.left.series_id, "CAN-A|1|alkohol");
    assert_eq!(edge.right.series_id, "CAN-B|1|alkohol");
}

#[test]
fn same_source_pairs_are_never_compared() {
    let mut records = series("CAN-A", "alkohol", &wavy(2000, 10));
    records.extend(series("CAN-A", "tobak", &wavy(2000, 10)));

    let edges = scan_correlations(
        &SeriesTable::from_records(&records),
        &CorrelationOptions::default(),
    );

    assert!(edges.is_empty());
}

#[test]
fn short_overlap_and_constant_series_are_skipped() {
    let mut records = series("CAN-A", "alkohol", &wavy(2000, 12));
    records.extend(series("CAN-B", "late", &wavy(2005, 12)));
    let flat: Vec<(i32, f64)> = (2000..2012).map(|y| (y, 7.0)).collect();
    records.extend(series("CAN-C", "flat", &flat));

    let edges = scan_correlations(
        &SeriesTable::from_records(&records),
        &CorrelationOptions::default(),
    );

    assert!(edges.is_empty());
}

#[test]
fn inverse_series_correlate_negatively_and_respect_top_n() {
    let up = wavy(2000, 12);
    let down: Vec<(i32, f64)> = up.iter().map(|(y, v)| (*y, 100.0 - v)).collect();
    let mut records = series("CAN-A", "up", &up);
    records.extend(series("CAN-B", "down", &down));
    records.extend(series("CAN-C", "up_again", &up));

    let table = SeriesTable::from_records(&records);
    let all = scan_correlations(&table, &CorrelationOptions::default());
    assert_eq!(all.len(), 3);
    assert!(all
        .iter()
        .any(|edge| edge.direction == CorrelationSign::Negative));

    let options = CorrelationOptions {
        top_n: 2,
        ..CorrelationOptions::default()
    };
    assert_eq!(scan_correlations(&table, &options).len(), 2);
}

#[test]
fn step_series_breaks_at_the_step() {
    let points: Vec<(i32, f64)> = (0..20)
        .map(|i| (2000 + i, if i < 10 { 0.0 } else { 100.0 }))
        .collect();
    let records = series("CAN-A", "step", &points);

    let breaks = detect_trend_breaks(
        &SeriesTable::from_records(&records),
        &TrendBreakOptions::default(),
    );

    assert_eq!(breaks.len(), 1);
    let found = &breaks[0];
    assert_eq!(found.break_year, 2010);
    assert_eq!(found.direction, BreakDirection::Increase);
    assert_eq!(found.change_pct, 0.0);
    assert_eq!(found.mean_before, 0.0);
    assert_eq!(found.mean_after, 100.0);
    assert!(found.t_statistic < -3.0);
    assert!(found.p_value < 1e-6);
    assert_eq!(found.year_range, "2000-2019");
}

#[test]
fn noisy_drop_is_reported_as_decrease() {
    let points: Vec<(i32, f64)> = (0..16)
        .map(|i| {
            let noise = if i % 2 == 0 { 0.5 } else { -0.5 };
            (1990 + i, if i < 8 { 50.0 + noise } else { 20.0 + noise })
        })
        .collect();
    let records = series("CAN-A", "drop", &points);

    let breaks = detect_trend_breaks(
        &SeriesTable::from_records(&records),
        &TrendBreakOptions::default(),
    );

    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].break_year, 1998);
    assert_eq!(breaks[0].direction, BreakDirection::Decrease);
    assert!(breaks[0].t_statistic > 3.0);
    assert!((breaks[0].change_pct + 60.0).abs() < 1e-9);
}

#[test]
fn short_and_flat_series_have_no_breaks() {
    let short: Vec<(i32, f64)> = (0..9).map(|i| (2000 + i, f64::from(i))).collect();
    let flat: Vec<(i32, f64)> = (0..20).map(|i| (2000 + i, 4.0)).collect();
    let mut records = series("CAN-A", "short", &short);
    records.extend(series("CAN-A", "flat", &flat));

    let breaks = detect_trend_breaks(
        &SeriesTable::from_records(&records),
        &TrendBreakOptions::default(),
    );

    assert!(breaks.is_empty());
}

#[test]
fn flat_history_with_jump_is_a_rising_mover() {
    let points: Vec<(i32, f64)> = (0..15)
        .map(|i| (2005 + i, if i < 10 { 10.0 } else { 50.0 }))
        .collect();
    let records = series("CAN-A", "jump", &points);

    let movers = detect_movers(&SeriesTable::from_records(&records), &MoverOptions::default());

    assert_eq!(movers.len(), 1);
    let mover = &movers[0];
    assert!(mover.z_score > 2.0);
    assert_eq!(mover.direction, MoverDirection::Rising);
    assert_eq!(mover.recent_mean, 50.0);
    assert_eq!(mover.historical_mean, 10.0);
    assert_eq!(mover.latest_year, 2019);
}

#[test]
fn quiet_series_are_not_movers() {
    let steady: Vec<(i32, f64)> = (0..15).map(|i| (2005 + i, 10.0)).collect();
    let too_short: Vec<(i32, f64)> = (0..9).map(|i| (2005 + i, f64::from(i * i))).collect();
    let mut records = series("CAN-A", "steady", &steady);
    records.extend(series("CAN-A", "short", &too_short));

    let movers = detect_movers(&SeriesTable::from_records(&records), &MoverOptions::default());

    assert!(movers.is_empty());
}

#[test]
fn negligible_shift_off_a_flat_history_is_not_a_mover() {
    let points: Vec<(i32, f64)> = (0..15)
        .map(|i| (2005 + i, if i < 10 { 100.0 } else { 100.001 }))
        .collect();
    let records = series("CAN-A", "flat", &points);
    let table = SeriesTable::from_records(&records);

    assert!(detect_movers(&table, &MoverOptions::default()).is_empty());

    let sensitive = MoverOptions {
        min_relative_change: 0.0,
        ..MoverOptions::default()
    };
    assert_eq!(detect_movers(&table, &sensitive).len(), 1);
}

#[test]
fn first_value_wins_when_a_year_repeats() {
    let mut records = series("CAN-A", "x", &[(2001, 1.0), (2002, 2.0)]);
    let mut suffixed = series("CAN-A", "x", &[(2001, 9.0)]);
    suffixed[0].year_label = "2001a".into();
    records.extend(suffixed);

    let table = SeriesTable::from_records(&records);
    let only = table.iter().next().expect("one series");

    assert_eq!(table.len(), 1);
    assert_eq!(only.values(), vec![1.0, 2.0]);
}

#[test]
fn empty_input_yields_empty_report() {
    let report = run_all(&[], &InsightConfig::default());
    assert!(report.correlations.is_empty());
    assert!(report.trend_breaks.is_empty());
    assert!(report.movers.is_empty());
}
