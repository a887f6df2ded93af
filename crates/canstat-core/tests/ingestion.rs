use std::collections::BTreeSet;

use canstat_core::ingestion::{ingest_sources, SheetStatus, SourceStatus};
use canstat_core::workbook::{MemoryWorkbooks, SheetGrid};
use canstat_core::{PipelineConfig, PipelineError, SourceSpec};
use canstat_parser::{Cell, SheetErrorKind};

fn text(value: &str) -> Cell {
    Cell::text(value)
}

fn num(value: f64) -> Cell {
    Cell::Number(value)
}

fn long_sheet() -> SheetGrid {
    SheetGrid::new(
        "1",
        vec![
            vec![text("Tabell 1. Alkoholkonsumtion bland elever i årskurs 9")],
            vec![],
            vec![text("År"), text("Pojkar"), text("Flickor")],
            vec![text("2018"), num(10.0), num(12.0)],
            vec![text("2019"), num(11.0), text("..")],
            vec![num(2020.0), num(12.0), num(14.0)],
        ],
    )
}

fn wide_sheet() -> SheetGrid {
    SheetGrid::new(
        "2",
        vec![
            vec![text("Tabell 2. Försäljning av alkohol per invånare")],
            vec![Cell::Empty, num(2018.0), num(2019.0), num(2020.0)],
            vec![text("Totalt"), num(8.0), num(8.5), num(9.0)],
            vec![text("  Vin"), num(3.0), num(3.5), text("–")],
            vec![text("Källa: Systembolaget")],
        ],
    )
}

fn contents_sheet(name: &str) -> SheetGrid {
    SheetGrid::new(
        name,
        vec![
            vec![text("Innehåll")],
            vec![text("Tabell 1"), num(2018.0), num(2019.0), num(2020.0)],
            vec![text("Tabell 2"), num(1.0), num(2.0), num(3.0)],
        ],
    )
}

fn config(sources: Vec<SourceSpec>) -> PipelineConfig {
    PipelineConfig {
        sources,
        ..PipelineConfig::default()
    }
}

fn survey_source() -> SourceSpec {
    let mut source = SourceSpec::new("CAN-TEST", "survey.xlsx", "Skolelevers drogvanor");
    source.skip_sheets.push("Innehåll".to_string());
    source
}

#[test]
fn two_sheet_workbook_normalizes_end_to_end() {
    let workbooks = MemoryWorkbooks::new().with_workbook(
        "survey.xlsx",
        vec![
            contents_sheet("TK1"),
            contents_sheet("Innehåll"),
            long_sheet(),
            wide_sheet(),
        ],
    );

    let batch = ingest_sources(&config(vec![survey_source()]), &workbooks).expect("ingest");

    assert_eq!(batch.records.len(), 10);
    let variables: BTreeSet<&str> = batch.records.iter().map(|r| r.variable.as_str()).collect();
    assert_eq!(
        variables,
        BTreeSet::from(["flickor", "pojkar", "totalt", "totalt__vin"])
    );
    assert!(batch.conflicts.is_empty());

    let statuses: Vec<SheetStatus> = batch.sheets.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            SheetStatus::Excluded,
            SheetStatus::Excluded,
            SheetStatus::Parsed,
            SheetStatus::Parsed
        ]
    );
    assert_eq!(batch.sheets[2].shape, Some("long"));
    assert_eq!(batch.sheets[3].shape, Some("wide"));

    let wine: Vec<(i32, f64)> = batch
        .records
        .iter()
        .filter(|r| r.variable == "totalt__vin")
        .map(|r| (r.year, r.value))
        .collect();
    assert_eq!(wine, vec![(2018, 3.0), (2019, 3.5)]);

    let summary = &batch.summary;
    assert_eq!(summary.sources_parsed, 1);
    assert_eq!(summary.sheets_parsed, 2);
    assert_eq!(summary.sheets_excluded, 2);
    assert_eq!(summary.records_kept, 10);
    assert_eq!(summary.duplicates_removed, 0);
    assert_eq!(summary.year_min, Some(2018));
    assert_eq!(summary.year_max, Some(2020));
    assert_eq!(summary.distinct_variables, 4);
}

#[test]
fn substance_map_prefixes_long_sheets_only() {
    let mut source = survey_source();
    source
        .substance_map
        .insert("1".to_string(), "Cannabis".to_string());
    source
        .substance_map
        .insert("2".to_string(), "Alkohol".to_string());
    let workbooks =
        MemoryWorkbooks::new().with_workbook("survey.xlsx", vec![long_sheet(), wide_sheet()]);

    let batch = ingest_sources(&config(vec![source]), &workbooks).expect("ingest");

    for record in &batch.records {
        match record.table_id.as_str() {
            "1" => assert!(record.variable.starts_with("Cannabis__"), "{}", record.variable),
            _ => assert!(!record.variable.contains("Alkohol"), "{}", record.variable),
        }
    }
}

#[test]
fn bad_sheets_and_missing_files_are_skipped_and_counted() {
    let broken = SheetGrid::new("3", vec![vec![text("Endast text")], vec![text("mer text")]]);
    let sparse = SheetGrid::new(
        "4",
        vec![
            vec![text("Tabell 4")],
            vec![Cell::Empty, num(2018.0), num(2019.0)],
            vec![text("Totalt"), num(1.0), num(2.0)],
        ],
    );
    let workbooks = MemoryWorkbooks::new().with_workbook(
        "survey.xlsx",
        vec![long_sheet(), broken, sparse],
    );
    let sources = vec![
        survey_source(),
        SourceSpec::new("CAN-MISSING", "missing.xlsx", "Saknas"),
    ];

    let batch = ingest_sources(&config(sources), &workbooks).expect("ingest");

    assert_eq!(batch.records.len(), 5);
    assert_eq!(batch.summary.sheets_failed, 2);
    assert_eq!(
        batch.summary.failures_by_kind.get(&SheetErrorKind::UnparseableSheet),
        Some(&1)
    );
    assert_eq!(
        batch.summary.failures_by_kind.get(&SheetErrorKind::NoYearColumns),
        Some(&1)
    );
    assert_eq!(batch.summary.sources_missing, 1);
    assert_eq!(batch.sources[1].status, SourceStatus::Missing);
}

#[test]
fn identical_workbooks_under_two_sources_both_contribute() {
    let workbooks = MemoryWorkbooks::new()
        .with_workbook("a.xlsx", vec![long_sheet()])
        .with_workbook("b.xlsx", vec![long_sheet()]);
    let sources = vec![
        SourceSpec::new("CAN-A", "a.xlsx", "Topic"),
        SourceSpec::new("CAN-B", "b.xlsx", "Topic"),
    ];

    let batch = ingest_sources(&config(sources), &workbooks).expect("ingest");

    assert_eq!(batch.sources[0].status, SourceStatus::Parsed);
    assert_eq!(batch.sources[1].status, SourceStatus::Parsed);
    assert_eq!(batch.sources[0].content_hash, batch.sources[1].content_hash);
    let from_b = batch.records.iter().filter(|r| r.source_id == "CAN-B").count();
    assert_eq!(from_b, 5);
    assert_eq!(batch.records.len(), 10);
    assert_eq!(batch.summary.duplicates_removed, 0);
}

#[test]
fn repeated_sheets_collapse_and_conflicts_are_kept() {
    let mut duplicate_rows = long_sheet().rows;
    duplicate_rows.push(vec![text("2018"), num(99.0), num(12.0)]);
    let repeated = SheetGrid::new("5", duplicate_rows);
    let workbooks = MemoryWorkbooks::new().with_workbook("survey.xlsx", vec![repeated]);

    let batch = ingest_sources(&config(vec![survey_source()]), &workbooks).expect("ingest");

    // 5 original records, plus pojkar 2018 = 99; flickor 2018 = 12 is an exact duplicate.
    assert_eq!(batch.summary.records_emitted, 7);
    assert_eq!(batch.records.len(), 6);
    assert_eq!(batch.conflicts.len(), 1);
    let conflict = &batch.conflicts.conflicts[0];
    assert_eq!(conflict.key.variable, "pojkar");
    assert_eq!(conflict.key.year, 2018);
    assert_eq!(conflict.values, vec![10.0, 99.0]);
}

#[test]
fn zero_records_is_fatal() {
    let workbooks = MemoryWorkbooks::new().with_workbook("survey.xlsx", vec![contents_sheet("TK2")]);

    let err = ingest_sources(&config(vec![survey_source()]), &workbooks).expect_err("no records");

    assert!(matches!(err, PipelineError::ZeroOutput { sources: 1, .. }));
}
