use std::path::Path;

use canstat_core::config::is_reserved_sheet;
use canstat_core::{PipelineConfig, PipelineError};

#[test]
fn bundled_registry_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/sources.toml");
    let config = PipelineConfig::load(&path).expect("load registry");

    assert_eq!(config.sources.len(), 7);
    assert!(config.publications_dir.ends_with("Publikationer"));
    assert!(config.publications_dir.is_absolute());

    let prices = config.source("CAN-233").expect("CAN-233");
    assert_eq!(prices.substance_for("1"), Some("hashish"));
    assert_eq!(prices.substance_for("21"), None);
    assert!(prices.skips_sheet("Innehåll"));
    assert!(!prices.skips_sheet("1"));

    let survey = config.source("CAN-239").expect("CAN-239");
    assert!(survey.skips_sheet("Tabellförteckning 2025"));
    assert!(survey.substance_map.is_empty());
}

#[test]
fn defaults_fill_missing_fields() {
    let config = PipelineConfig::from_toml_str(
        r#"
            [[sources]]
            id = "CAN-1"
            file = "one.xlsx"
            topic = "One"

            [insights.movers]
            window = 3
        "#,
    )
    .expect("parse");

    assert_eq!(config.detection_window, 8);
    assert_eq!(config.insights.movers.window, 3);
    assert_eq!(config.insights.movers.min_history, 5);
    assert_eq!(config.insights.correlation.min_overlap, 10);
    assert_eq!(config.insights.correlation.top_n, 50);
    assert_eq!(config.insights.trend_breaks.t_floor, 3.0);
    assert!(config.sources[0].skip_sheets.is_empty());
}

#[test]
fn reserved_sheet_pattern_ignores_case_and_spacing() {
    for name in ["TK1", "tk 12", "TK  3b"] {
        assert!(is_reserved_sheet(name), "{name}");
    }
    for name in ["TK", "Tabell 1", "1", "ATK1"] {
        assert!(!is_reserved_sheet(name), "{name}");
    }
}

#[test]
fn malformed_config_is_a_config_error() {
    let err = PipelineConfig::from_toml_str("sources = 3").expect_err("bad config");
    assert!(matches!(err, PipelineError::Config(_)));
}
