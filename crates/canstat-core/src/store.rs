use std::str::FromStr;

use canstat_parser::CanonicalRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Row, Sqlite, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::catalog::{CatalogEntry, CatalogTables, VariableIndexEntry};
use crate::error::Result;
use crate::insights::{CorrelationEdge, InsightReport, MoverRecord, TrendBreak};

pub type DbPool = Pool<Sqlite>;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://can_data.sqlite";

// Rows per INSERT statement; keeps bound parameters well under SQLite's limit.
const INSERT_CHUNK: usize = 500;

const TIMESERIES_DDL: &str = r#"
    CREATE TABLE timeseries (
        source_id   TEXT    NOT NULL,
        table_id    TEXT    NOT NULL,
        table_title TEXT,
        topic       TEXT    NOT NULL,
        variable    TEXT    NOT NULL,
        year        INTEGER NOT NULL,
        year_label  TEXT    NOT NULL,
        value       REAL    NOT NULL
    )
"#;

const TIMESERIES_INDEX: &str =
    "CREATE INDEX idx_timeseries_series ON timeseries (source_id, table_id, variable, year)";

const CATALOG_DDL: &str = r#"
    CREATE TABLE catalog (
        source_id   TEXT    NOT NULL,
        table_id    TEXT    NOT NULL,
        table_title TEXT,
        topic       TEXT    NOT NULL,
        variables   INTEGER NOT NULL,
        year_min    INTEGER NOT NULL,
        year_max    INTEGER NOT NULL,
        records     INTEGER NOT NULL,
        PRIMARY KEY (source_id, table_id)
    )
"#;

const VARIABLES_DDL: &str = r#"
    CREATE TABLE variables (
        source_id TEXT    NOT NULL,
        table_id  TEXT    NOT NULL,
        variable  TEXT    NOT NULL,
        year_min  INTEGER NOT NULL,
        year_max  INTEGER NOT NULL,
        value_min REAL    NOT NULL,
        value_max REAL    NOT NULL,
        records   INTEGER NOT NULL,
        PRIMARY KEY (source_id, table_id, variable)
    )
"#;

const CORRELATIONS_DDL: &str = r#"
    CREATE TABLE insight_correlations (
        series_1      TEXT    NOT NULL,
        source_1      TEXT    NOT NULL,
        table_1       TEXT    NOT NULL,
        title_1       TEXT,
        variable_1    TEXT    NOT NULL,
        series_2      TEXT    NOT NULL,
        source_2      TEXT    NOT NULL,
        table_2       TEXT    NOT NULL,
        title_2       TEXT,
        variable_2    TEXT    NOT NULL,
        correlation   REAL    NOT NULL,
        p_value       REAL    NOT NULL,
        overlap_years INTEGER NOT NULL,
        year_min      INTEGER NOT NULL,
        year_max      INTEGER NOT NULL,
        direction     TEXT    NOT NULL
    )
"#;

const TREND_BREAKS_DDL: &str = r#"
    CREATE TABLE insight_trend_breaks (
        series_id   TEXT    NOT NULL,
        source_id   TEXT    NOT NULL,
        table_id    TEXT    NOT NULL,
        table_title TEXT,
        variable    TEXT    NOT NULL,
        break_year  INTEGER NOT NULL,
        mean_before REAL    NOT NULL,
        mean_after  REAL    NOT NULL,
        change_pct  REAL    NOT NULL,
        t_statistic REAL    NOT NULL,
        p_value     REAL    NOT NULL,
        direction   TEXT    NOT NULL,
        year_range  TEXT    NOT NULL
    )
"#;

const MOVERS_DDL: &str = r#"
    CREATE TABLE insight_movers (
        series_id       TEXT    NOT NULL,
        source_id       TEXT    NOT NULL,
        table_id        TEXT    NOT NULL,
        table_title     TEXT,
        variable        TEXT    NOT NULL,
        recent_mean     REAL    NOT NULL,
        historical_mean REAL    NOT NULL,
        z_score         REAL    NOT NULL,
        direction       TEXT    NOT NULL,
        latest_year     INTEGER NOT NULL
    )
"#;

const SNAPSHOT_RUNS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS snapshot_runs (
        run_id     TEXT    NOT NULL,
        stage      TEXT    NOT NULL,
        created_at TEXT    NOT NULL,
        table_name TEXT    NOT NULL,
        row_count  INTEGER NOT NULL,
        PRIMARY KEY (run_id, table_name)
    )
"#;

/// Identifies one wholesale rewrite of a set of tables.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReceipt {
    pub run_id: Uuid,
    pub stage: &'static str,
    pub created_at: DateTime<Utc>,
    pub row_counts: Vec<(&'static str, usize)>,
}

/// Opens (creating if needed) the SQLite store behind `database_url`. A single
/// connection keeps in-memory databases alive and writes serialized.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Replaces `timeseries`, `catalog` and `variables` in one transaction.
pub async fn write_snapshot(
    pool: &DbPool,
    records: &[CanonicalRecord],
    tables: &CatalogTables,
) -> Result<SnapshotReceipt> {
    let mut tx = pool.begin().await?;

    recreate(&mut tx, "timeseries", TIMESERIES_DDL).await?;
    sqlx::query(TIMESERIES_INDEX).execute(&mut *tx).await?;
    recreate(&mut tx, "catalog", CATALOG_DDL).await?;
    recreate(&mut tx, "variables", VARIABLES_DDL).await?;

    insert_timeseries(&mut tx, records).await?;
    insert_catalog(&mut tx, &tables.catalog).await?;
    insert_variables(&mut tx, &tables.variables).await?;

    let receipt = SnapshotReceipt {
        run_id: Uuid::new_v4(),
        stage: "ingest",
        created_at: Utc::now(),
        row_counts: vec![
            ("timeseries", records.len()),
            ("catalog", tables.catalog.len()),
            ("variables", tables.variables.len()),
        ],
    };
    record_run(&mut tx, &receipt).await?;
    tx.commit().await?;

    info!(run_id = %receipt.run_id, rows = records.len(), "snapshot written");
    Ok(receipt)
}

/// Replaces the three insight tables in one transaction. Empty results still
/// produce empty tables.
pub async fn write_insights(pool: &DbPool, report: &InsightReport) -> Result<SnapshotReceipt> {
    let mut tx = pool.begin().await?;

    recreate(&mut tx, "insight_correlations", CORRELATIONS_DDL).await?;
    recreate(&mut tx, "insight_trend_breaks", TREND_BREAKS_DDL).await?;
    recreate(&mut tx, "insight_movers", MOVERS_DDL).await?;

    insert_correlations(&mut tx, &report.correlations).await?;
    insert_trend_breaks(&mut tx, &report.trend_breaks).await?;
    insert_movers(&mut tx, &report.movers).await?;

    let receipt = SnapshotReceipt {
        run_id: Uuid::new_v4(),
        stage: "insights",
        created_at: Utc::now(),
        row_counts: vec![
            ("insight_correlations", report.correlations.len()),
            ("insight_trend_breaks", report.trend_breaks.len()),
            ("insight_movers", report.movers.len()),
        ],
    };
    record_run(&mut tx, &receipt).await?;
    tx.commit().await?;

    info!(run_id = %receipt.run_id, "insights written");
    Ok(receipt)
}

pub async fn load_timeseries(pool: &DbPool) -> Result<Vec<CanonicalRecord>> {
    let rows = sqlx::query(
        r#"
            SELECT source_id, table_id, table_title, topic, variable, year, year_label, value
            FROM timeseries
            ORDER BY source_id, table_id, variable, year, rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(CanonicalRecord {
                source_id: row.try_get("source_id")?,
                table_id: row.try_get("table_id")?,
                table_title: row.try_get("table_title")?,
                topic: row.try_get("topic")?,
                variable: row.try_get("variable")?,
                year: row.try_get("year")?,
                year_label: row.try_get("year_label")?,
                value: row.try_get("value")?,
            })
        })
        .collect()
}

pub async fn load_catalog(pool: &DbPool) -> Result<Vec<CatalogEntry>> {
    let rows = sqlx::query(
        r#"
            SELECT source_id, table_id, table_title, topic, variables, year_min, year_max, records
            FROM catalog
            ORDER BY source_id, table_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(CatalogEntry {
                source_id: row.try_get("source_id")?,
                table_id: row.try_get("table_id")?,
                table_title: row.try_get("table_title")?,
                topic: row.try_get("topic")?,
                variables: row.try_get("variables")?,
                year_min: row.try_get("year_min")?,
                year_max: row.try_get("year_max")?,
                records: row.try_get("records")?,
            })
        })
        .collect()
}

/// Row counts recorded by run `run_id`, by table.
pub async fn run_row_counts(pool: &DbPool, run_id: Uuid) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        r#"
            SELECT table_name, row_count
            FROM snapshot_runs
            WHERE run_id = ?1
            ORDER BY table_name
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| Ok((row.try_get("table_name")?, row.try_get("row_count")?)))
        .collect()
}

async fn recreate(tx: &mut Transaction<'_, Sqlite>, table: &str, ddl: &str) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
        .execute(&mut **tx)
        .await?;
    sqlx::query(ddl).execute(&mut **tx).await?;
    Ok(())
}

async fn record_run(tx: &mut Transaction<'_, Sqlite>, receipt: &SnapshotReceipt) -> Result<()> {
    sqlx::query(SNAPSHOT_RUNS_DDL).execute(&mut **tx).await?;

    let run_id = receipt.run_id.to_string();
    let created_at = receipt.created_at.to_rfc3339();
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT INTO snapshot_runs (run_id, stage, created_at, table_name, row_count) ",
    );
    builder.push_values(receipt.row_counts.iter(), |mut row, (table, count)| {
        row.push_bind(run_id.clone())
            .push_bind(receipt.stage)
            .push_bind(created_at.clone())
            .push_bind(*table)
            .push_bind(*count as i64);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_timeseries(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[CanonicalRecord],
) -> Result<()> {
    for chunk in records.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO timeseries (source_id, table_id, table_title, topic, variable, year, year_label, value) ",
        );
        builder.push_values(chunk, |mut row, record| {
            row.push_bind(record.source_id.clone())
                .push_bind(record.table_id.clone())
                .push_bind(record.table_title.clone())
                .push_bind(record.topic.clone())
                .push_bind(record.variable.clone())
                .push_bind(record.year)
                .push_bind(record.year_label.clone())
                .push_bind(record.value);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_catalog(tx: &mut Transaction<'_, Sqlite>, entries: &[CatalogEntry]) -> Result<()> {
    for chunk in entries.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO catalog (source_id, table_id, table_title, topic, variables, year_min, year_max, records) ",
        );
        builder.push_values(chunk, |mut row, entry| {
            row.push_bind(entry.source_id.clone())
                .push_bind(entry.table_id.clone())
                .push_bind(entry.table_title.clone())
                .push_bind(entry.topic.clone())
                .push_bind(entry.variables)
                .push_bind(entry.year_min)
                .push_bind(entry.year_max)
                .push_bind(entry.records);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_variables(
    tx: &mut Transaction<'_, Sqlite>,
    entries: &[VariableIndexEntry],
) -> Result<()> {
    for chunk in entries.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO variables (source_id, table_id, variable, year_min, year_max, value_min, value_max, records) ",
        );
        builder.push_values(chunk, |mut row, entry| {
            row.push_bind(entry.source_id.clone())
                .push_bind(entry.table_id.clone())
                .push_bind(entry.variable.clone())
                .push_bind(entry.year_min)
                .push_bind(entry.year_max)
                .push_bind(entry.value_min)
                .push_bind(entry.value_max)
                .push_bind(entry.records);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_correlations(
    tx: &mut Transaction<'_, Sqlite>,
    edges: &[CorrelationEdge],
) -> Result<()> {
    for chunk in edges.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"INSERT INTO insight_correlations (
                series_1, source_1, table_1, title_1, variable_1,
                series_2, source_2, table_2, title_2, variable_2,
                correlation, p_value, overlap_years, year_min, year_max, direction
            ) "#,
        );
        builder.push_values(chunk, |mut row, edge| {
            row.push_bind(edge.left.series_id.clone())
                .push_bind(edge.left.source_id.clone())
                .push_bind(edge.left.table_id.clone())
                .push_bind(edge.left.table_title.clone())
                .push_bind(edge.left.variable.clone())
                .push_bind(edge.right.series_id.clone())
                .push_bind(edge.right.source_id.clone())
                .push_bind(edge.right.table_id.clone())
                .push_bind(edge.right.table_title.clone())
                .push_bind(edge.right.variable.clone())
                .push_bind(edge.correlation)
                .push_bind(edge.p_value)
                .push_bind(edge.overlap_years as i64)
                .push_bind(edge.year_min)
                .push_bind(edge.year_max)
                .push_bind(edge.direction.as_str());
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_trend_breaks(
    tx: &mut Transaction<'_, Sqlite>,
    breaks: &[TrendBreak],
) -> Result<()> {
    for chunk in breaks.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"INSERT INTO insight_trend_breaks (
                series_id, source_id, table_id, table_title, variable, break_year,
                mean_before, mean_after, change_pct, t_statistic, p_value, direction, year_range
            ) "#,
        );
        builder.push_values(chunk, |mut row, found| {
            row.push_bind(found.series.series_id.clone())
                .push_bind(found.series.source_id.clone())
                .push_bind(found.series.table_id.clone())
                .push_bind(found.series.table_title.clone())
                .push_bind(found.series.variable.clone())
                .push_bind(found.break_year)
                .push_bind(found.mean_before)
                .push_bind(found.mean_after)
                .push_bind(found.change_pct)
                .push_bind(found.t_statistic)
                .push_bind(found.p_value)
                .push_bind(found.direction.as_str())
                .push_bind(found.year_range.clone());
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_movers(tx: &mut Transaction<'_, Sqlite>, movers: &[MoverRecord]) -> Result<()> {
    for chunk in movers.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"INSERT INTO insight_movers (
                series_id, source_id, table_id, table_title, variable,
                recent_mean, historical_mean, z_score, direction, latest_year
            ) "#,
        );
        builder.push_values(chunk, |mut row, mover| {
            row.push_bind(mover.series.series_id.clone())
                .push_bind(mover.series.source_id.clone())
                .push_bind(mover.series.table_id.clone())
                .push_bind(mover.series.table_title.clone())
                .push_bind(mover.series.variable.clone())
                .push_bind(mover.recent_mean)
                .push_bind(mover.historical_mean)
                .push_bind(mover.z_score)
                .push_bind(mover.direction.as_str())
                .push_bind(mover.latest_year);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}
