//! `splice import`: parse a delta file, reconcile it against the statistics
//! store, and upsert the resulting absolute points.

use anyhow::{Context, Result};
use serde_json::json;
use splice_db::PgAnchorStore;
use splice_engine::ReconcileOptions;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

pub async fn run_import(
    csv: PathBuf,
    timezone: String,
    delimiter: String,
    decimal_comma: bool,
    connection_record: bool,
    dry_run: bool,
) -> Result<()> {
    let opts = super::build_ingest_options(&timezone, &delimiter, decimal_comma)?;
    let rows = splice_ingest::parse_csv_file(&csv, &opts).map_err(super::ingest_failure)?;
    let rows_in = rows.len();
    info!(rows = rows_in, file = %csv.display(), "parsed delta rows");

    if rows.is_empty() {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "dry_run": dry_run,
                "rows_in": 0,
                "rows_written": 0,
                "series": {},
            }))?
        );
        return Ok(());
    }

    let pool = splice_db::connect_from_env().await?;

    // The engine is synchronous and the store adapter blocks on the pool,
    // so the whole reconciliation runs on a blocking thread.
    let store = PgAnchorStore::new(pool.clone(), tokio::runtime::Handle::current());
    let options = ReconcileOptions { connection_record };
    let reconciled =
        tokio::task::spawn_blocking(move || splice_engine::reconcile(&rows, &store, options))
            .await
            .context("reconcile worker panicked")?
            .map_err(anyhow::Error::from)?;

    let import_id = Uuid::new_v4();
    let mut rows_written = 0u64;
    if !dry_run {
        for (series_id, points) in &reconciled {
            let persisted =
                splice_db::insert_reconciled_points(&pool, series_id, points, Some(import_id))
                    .await?;
            info!(
                series_id = %series_id,
                rows = persisted.rows_written,
                "persisted reconciled points"
            );
            rows_written += persisted.rows_written;
        }
    }

    let per_series: serde_json::Map<String, serde_json::Value> = reconciled
        .iter()
        .map(|(series_id, points)| (series_id.clone(), json!(points.len())))
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "import_id": import_id,
            "dry_run": dry_run,
            "rows_in": rows_in,
            "rows_written": rows_written,
            "series": per_series,
        }))?
    );

    Ok(())
}
