use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Minimum lead of an older reference over the batch's oldest import,
/// in seconds. A reference exactly this far back is valid (boundary
/// inclusive); anything closer is rejected.
pub const REFERENCE_LEAD_SECS: i64 = 3_600;

/// One signed increment at a specific timestamp, relative to the immediately
/// preceding sample of its series.
///
/// Rows for a given series must be strictly ascending by `at` with no
/// duplicate timestamps. The engine validates this and rejects violations
/// with [`ReconcileError::UnsortedInput`]; it never re-sorts on the caller's
/// behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaRow {
    pub series_id: String,
    /// Timezone-resolved UTC instant.
    pub at: DateTime<Utc>,
    pub delta: f64,
}

impl DeltaRow {
    pub fn new(series_id: impl Into<String>, at: DateTime<Utc>, delta: f64) -> Self {
        Self {
            series_id: series_id.into(),
            at,
            delta,
        }
    }
}

/// One absolute data point already persisted for a series.
///
/// Missing `sum`/`state` values are normalized to `0.0` at the store
/// boundary; inside the engine both fields are always present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub at: DateTime<Utc>,
    pub sum: f64,
    pub state: f64,
}

impl AnchorRecord {
    pub fn new(at: DateTime<Utc>, sum: f64, state: f64) -> Self {
        Self { at, sum, state }
    }
}

/// How the resolved anchor relates to the import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceType {
    /// Anchor strictly precedes the batch; reconstruction proceeds by
    /// forward accumulation.
    Older,
    /// Anchor is at-or-after the batch's newest timestamp; reconstruction
    /// proceeds by backward attenuation.
    Newer,
}

/// The `[oldest, newest]` import window of one series' delta rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesWindow {
    pub series_id: String,
    pub oldest_import: DateTime<Utc>,
    pub newest_import: DateTime<Utc>,
}

impl SeriesWindow {
    /// Derive the window as the min/max of `rows`. Returns `None` for an
    /// empty slice. Does not assume the rows are sorted.
    pub fn from_rows(series_id: &str, rows: &[DeltaRow]) -> Option<Self> {
        let first = rows.first()?;
        let mut oldest = first.at;
        let mut newest = first.at;
        for row in &rows[1..] {
            if row.at < oldest {
                oldest = row.at;
            }
            if row.at > newest {
                newest = row.at;
            }
        }
        Some(Self {
            series_id: series_id.to_string(),
            oldest_import: oldest,
            newest_import: newest,
        })
    }
}

/// The resolved anchor for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub reference: AnchorRecord,
    pub ref_type: ReferenceType,
}

/// One reconstructed absolute data point. `state` mirrors `sum` inside this
/// engine; divergent state semantics belong to upstream layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciledPoint {
    pub at: DateTime<Utc>,
    pub sum: f64,
    pub state: f64,
}

/// All delta rows of one series, in the caller's original relative order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBatch {
    pub series_id: String,
    pub rows: Vec<DeltaRow>,
}

/// Verify that `rows` are strictly ascending by timestamp (no duplicates).
///
/// Returns [`ReconcileError::UnsortedInput`] naming the first offending
/// timestamp. Callers that receive scrambled-but-valid data must sort it
/// themselves before handing it to the engine.
pub fn ensure_strictly_ascending(series_id: &str, rows: &[DeltaRow]) -> Result<(), ReconcileError> {
    for pair in rows.windows(2) {
        if pair[1].at <= pair[0].at {
            return Err(ReconcileError::UnsortedInput {
                series_id: series_id.to_string(),
                at: pair[1].at,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn window_is_min_max_regardless_of_order() {
        let rows = vec![
            DeltaRow::new("s", ts(12, 0), 1.0),
            DeltaRow::new("s", ts(10, 0), 2.0),
            DeltaRow::new("s", ts(11, 0), 3.0),
        ];
        let w = SeriesWindow::from_rows("s", &rows).unwrap();
        assert_eq!(w.oldest_import, ts(10, 0));
        assert_eq!(w.newest_import, ts(12, 0));
    }

    #[test]
    fn window_of_empty_slice_is_none() {
        assert!(SeriesWindow::from_rows("s", &[]).is_none());
    }

    #[test]
    fn strictly_ascending_accepts_sorted_rows() {
        let rows = vec![
            DeltaRow::new("s", ts(10, 0), 1.0),
            DeltaRow::new("s", ts(11, 0), 2.0),
        ];
        assert!(ensure_strictly_ascending("s", &rows).is_ok());
    }

    #[test]
    fn strictly_ascending_rejects_out_of_order_rows() {
        let rows = vec![
            DeltaRow::new("s", ts(11, 0), 1.0),
            DeltaRow::new("s", ts(10, 0), 2.0),
        ];
        let err = ensure_strictly_ascending("s", &rows).unwrap_err();
        assert!(matches!(err, ReconcileError::UnsortedInput { .. }));
    }

    #[test]
    fn strictly_ascending_rejects_duplicate_timestamps() {
        let rows = vec![
            DeltaRow::new("s", ts(10, 0), 1.0),
            DeltaRow::new("s", ts(10, 0), 2.0),
        ];
        let err = ensure_strictly_ascending("s", &rows).unwrap_err();
        match err {
            ReconcileError::UnsortedInput { series_id, at } => {
                assert_eq!(series_id, "s");
                assert_eq!(at, ts(10, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
