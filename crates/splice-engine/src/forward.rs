//! Forward accumulator: reconstruction from an older reference.

use crate::error::ReconcileError;
use crate::types::{ensure_strictly_ascending, DeltaRow, ReconciledPoint};

/// Convert deltas into an absolute series by adding onto an anchor known to
/// be strictly before the batch.
///
/// Running totals start at the anchor's values; each row contributes its
/// delta to both `sum` and `state` and emits one point at the row's
/// timestamp. Output length and order equal input length and order.
///
/// Pure f64 accumulation: intermediate precision loss is inherent to
/// floating arithmetic and is not corrected here.
pub fn accumulate(
    rows: &[DeltaRow],
    anchor_sum: f64,
    anchor_state: f64,
) -> Result<Vec<ReconciledPoint>, ReconcileError> {
    let series_id = rows.first().map(|r| r.series_id.as_str()).unwrap_or("");
    ensure_strictly_ascending(series_id, rows)?;

    let mut sum = anchor_sum;
    let mut state = anchor_state;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        sum += row.delta;
        state += row.delta;
        out.push(ReconciledPoint {
            at: row.at,
            sum,
            state,
        });
    }
    Ok(out)
}
