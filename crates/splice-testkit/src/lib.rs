//! splice-testkit
//!
//! Shared fixtures for scenario tests: an in-memory anchor store, delta-row
//! builders and CSV fixture files. Not for production use.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};

use splice_engine::{AnchorRecord, AnchorStore, DeltaRow, StoreError};

/// In-memory [`AnchorStore`] over per-series ordered maps.
///
/// Also counts queries so scenarios can assert the engine stopped issuing
/// store reads after the first failing series.
#[derive(Debug, Default)]
pub struct MemoryAnchorStore {
    series: BTreeMap<String, BTreeMap<DateTime<Utc>, AnchorRecord>>,
    queries: Mutex<u64>,
}

impl MemoryAnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one absolute record for a series.
    pub fn insert(&mut self, series_id: &str, at: DateTime<Utc>, sum: f64, state: f64) {
        self.series
            .entry(series_id.to_string())
            .or_default()
            .insert(at, AnchorRecord::new(at, sum, state));
    }

    /// Insert a record whose sum/state may be absent upstream. Missing
    /// values normalize to `0.0` here, at the store boundary, exactly as the
    /// production store does.
    pub fn insert_partial(
        &mut self,
        series_id: &str,
        at: DateTime<Utc>,
        sum: Option<f64>,
        state: Option<f64>,
    ) {
        self.insert(series_id, at, sum.unwrap_or(0.0), state.unwrap_or(0.0));
    }

    /// Number of store queries issued so far.
    pub fn query_count(&self) -> u64 {
        *self.queries.lock().unwrap()
    }

    fn count(&self) {
        *self.queries.lock().unwrap() += 1;
    }
}

impl AnchorStore for MemoryAnchorStore {
    fn newest(&self, series_id: &str) -> Result<Option<AnchorRecord>, StoreError> {
        self.count();
        Ok(self
            .series
            .get(series_id)
            .and_then(|m| m.values().next_back().copied()))
    }

    fn before(
        &self,
        series_id: &str,
        ts: DateTime<Utc>,
    ) -> Result<Option<AnchorRecord>, StoreError> {
        self.count();
        Ok(self
            .series
            .get(series_id)
            .and_then(|m| m.range(..ts).next_back().map(|(_, r)| *r)))
    }

    fn at_or_after(
        &self,
        series_id: &str,
        ts: DateTime<Utc>,
    ) -> Result<Option<AnchorRecord>, StoreError> {
        self.count();
        Ok(self
            .series
            .get(series_id)
            .and_then(|m| m.range(ts..).next().map(|(_, r)| *r)))
    }
}

/// A fixed, readable base instant for scenarios: 2024-03-01 10:00:00 UTC.
pub fn base_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

/// Build hourly delta rows for one series starting at `start`.
pub fn hourly_rows(series_id: &str, start: DateTime<Utc>, deltas: &[f64]) -> Vec<DeltaRow> {
    deltas
        .iter()
        .enumerate()
        .map(|(i, d)| DeltaRow::new(series_id, start + Duration::hours(i as i64), *d))
        .collect()
}

/// Write CSV text into a fresh temp directory and return the handle plus the
/// file path. The directory lives as long as the returned guard.
pub fn csv_fixture(contents: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create fixture dir")?;
    let path = dir.path().join("rows.csv");
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}
