use calamine::Data;
use canstat_core::workbook::{cell_from_data, FileWorkbooks, MemoryWorkbooks, SheetGrid, WorkbookSource};
use canstat_core::{PipelineError, SourceSpec};
use canstat_parser::Cell;

#[test]
fn calamine_values_become_closed_cells() {
    assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
    assert_eq!(cell_from_data(&Data::Int(2019)), Cell::Number(2019.0));
    assert_eq!(cell_from_data(&Data::Float(12.5)), Cell::Number(12.5));
    assert_eq!(
        cell_from_data(&Data::String("2019a".into())),
        Cell::Text("2019a".into())
    );
    assert_eq!(cell_from_data(&Data::String(String::new())), Cell::Empty);
    assert_eq!(cell_from_data(&Data::Bool(true)), Cell::Text("true".into()));
}

#[test]
fn missing_workbook_file_is_reported() {
    let workbooks = FileWorkbooks::new(std::env::temp_dir().join("canstat-does-not-exist"));
    let source = SourceSpec::new("CAN-404", "missing.xlsx", "Saknas");

    let err = workbooks.load(&source).expect_err("missing file");

    match err {
        PipelineError::MissingSourceFile { source_id, path } => {
            assert_eq!(source_id, "CAN-404");
            assert!(path.ends_with("missing.xlsx"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn memory_workbooks_hash_by_content() {
    let sheet = SheetGrid::new("1", vec![vec![Cell::text("År"), Cell::Number(1.0)]]);
    let workbooks = MemoryWorkbooks::new()
        .with_workbook("a.xlsx", vec![sheet.clone()])
        .with_workbook("b.xlsx", vec![sheet])
        .with_workbook("c.xlsx", vec![SheetGrid::new("1", vec![])]);

    let load = |file: &str| {
        workbooks
            .load(&SourceSpec::new("CAN", file, "Topic"))
            .expect("load")
            .content_hash
    };

    assert_eq!(load("a.xlsx"), load("b.xlsx"));
    assert_ne!(load("a.xlsx"), load("c.xlsx"));
}
