use canstat_core::integrity::{deduplicate, find_conflicts};
use canstat_parser::CanonicalRecord;

fn record(variable: &str, year: i32, label: &str, value: f64) -> CanonicalRecord {
    CanonicalRecord {
        source_id: "CAN-233".into(),
        table_id: "1".into(),
        table_title: Some("Tabell 1. Andel som använt cannabis".into()),
        topic: "Skolelevers drogvanor".into(),
        variable: variable.into(),
        year,
        year_label: label.into(),
        value,
    }
}

#[test]
fn deduplicate_keeps_first_occurrence_in_order() {
    let records = vec![
        record("pojkar", 2019, "2019", 4.0),
        record("flickor", 2019, "2019", 3.0),
        record("pojkar", 2019, "2019", 4.0),
        record("pojkar", 2020, "2020", 5.0),
        record("flickor", 2019, "2019", 3.0),
    ];

    let deduped = deduplicate(records);

    let keys: Vec<(&str, i32)> = deduped.iter().map(|r| (r.variable.as_str(), r.year)).collect();
    assert_eq!(keys, vec![("pojkar", 2019), ("flickor", 2019), ("pojkar", 2020)]);
}

#[test]
fn deduplicate_is_idempotent() {
    let records = vec![
        record("a", 2001, "2001", 1.0),
        record("a", 2001, "2001", 1.0),
        record("a", 2001, "2001a", 1.0),
        record("a", 2001, "2001", -0.0),
        record("a", 2001, "2001", 0.0),
    ];

    let once = deduplicate(records);
    let twice = deduplicate(once.clone());

    assert_eq!(once, twice);
    assert_eq!(once.len(), 3);
}

#[test]
fn conflicts_are_reported_without_touching_records() {
    let records = vec![
        record("andel", 2012, "2012", 10.0),
        record("andel", 2012, "2012", 11.0),
        record("andel", 2012, "2012a", 12.0),
        record("antal", 2012, "2012", 400.0),
    ];

    let report = find_conflicts(&records);

    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicting_rows(), 2);
    let conflict = &report.sample(10)[0];
    assert_eq!(conflict.key.variable, "andel");
    assert_eq!(conflict.key.year_label, "2012");
    assert_eq!(conflict.values, vec![10.0, 11.0]);
}

#[test]
fn distinct_year_labels_are_not_conflicts() {
    let records = vec![
        record("andel", 2012, "2012", 10.0),
        record("andel", 2012, "2012b", 12.0),
    ];
    assert!(find_conflicts(&records).is_empty());
}
