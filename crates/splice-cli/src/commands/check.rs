//! `splice check`: parse a delta file and report per-series windows without
//! touching the statistics store.
//!
//! Exits non-zero when any series would be rejected by the engine's ordering
//! precondition, using the same error the engine would raise.

use anyhow::Result;
use splice_engine::{ensure_strictly_ascending, group_by_series, ReconcileError, SeriesWindow};
use std::path::PathBuf;

pub fn run_check(
    csv: PathBuf,
    timezone: String,
    delimiter: String,
    decimal_comma: bool,
) -> Result<()> {
    let opts = super::build_ingest_options(&timezone, &delimiter, decimal_comma)?;
    let rows = splice_ingest::parse_csv_file(&csv, &opts).map_err(super::ingest_failure)?;
    let batches = group_by_series(&rows);

    let mut first_err: Option<ReconcileError> = None;
    for batch in &batches {
        // Batches produced by group_by_series are never empty.
        let Some(window) = SeriesWindow::from_rows(&batch.series_id, &batch.rows) else {
            continue;
        };
        let sorted = ensure_strictly_ascending(&batch.series_id, &batch.rows);
        println!(
            "series={} rows={} oldest={} newest={} sorted={}",
            window.series_id,
            batch.rows.len(),
            window.oldest_import,
            window.newest_import,
            sorted.is_ok()
        );
        if let Err(e) = sorted {
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }

    println!("series_total={} rows_total={}", batches.len(), rows.len());

    match first_err {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
