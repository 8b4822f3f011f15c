//! Backward attenuator: reconstruction from a newer reference.

use crate::error::ReconcileError;
use crate::types::{ensure_strictly_ascending, DeltaRow, ReconciledPoint};

/// Convert deltas into an absolute series by subtracting from an anchor
/// known to be at-or-after the batch.
///
/// The anchor represents the value *after* all deltas in the batch have
/// already been applied, so reconstruction walks backward in time undoing
/// each delta: for each row, newest first, the emitted point carries the
/// value immediately preceding that row's contribution. The result is then
/// reversed back into ascending time order.
///
/// Length-preserving: no point is fabricated at the anchor's own timestamp.
/// A connection record at the anchor, if wanted, is an orchestrator option.
pub fn attenuate(
    rows: &[DeltaRow],
    anchor_sum: f64,
    anchor_state: f64,
) -> Result<Vec<ReconciledPoint>, ReconcileError> {
    let series_id = rows.first().map(|r| r.series_id.as_str()).unwrap_or("");
    ensure_strictly_ascending(series_id, rows)?;

    let mut sum = anchor_sum;
    let mut state = anchor_state;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows.iter().rev() {
        sum -= row.delta;
        state -= row.delta;
        out.push(ReconciledPoint {
            at: row.at,
            sum,
            state,
        });
    }
    out.reverse();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::accumulate;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn hourly(deltas: &[f64]) -> Vec<DeltaRow> {
        let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        deltas
            .iter()
            .enumerate()
            .map(|(i, d)| DeltaRow::new("s", start + Duration::hours(i as i64), *d))
            .collect()
    }

    #[test]
    fn backward_pass_yields_ascending_pre_contribution_values() {
        // Anchor 100.0 sits at/after the last delta's timestamp.
        let rows = hourly(&[10.0, 20.0, 30.0]);
        let out = attenuate(&rows, 100.0, 100.0).unwrap();
        let sums: Vec<f64> = out.iter().map(|p| p.sum).collect();
        assert_eq!(sums, vec![40.0, 50.0, 70.0]);
        assert!(out.windows(2).all(|w| w[0].at < w[1].at));
    }

    #[test]
    fn output_length_equals_input_length() {
        let rows = hourly(&[1.0, 2.0, 3.0, 4.0]);
        let out = attenuate(&rows, 10.0, 10.0).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn attenuation_inverts_forward_accumulation() {
        // The first emitted point carries the value before any delta in the
        // batch applied, so forward accumulation restarted from it must land
        // back on the anchor.
        let deltas = [10.0, 20.0, 30.0];
        let rows = hourly(&deltas);
        let anchor = 100.0;

        let back = attenuate(&rows, anchor, anchor).unwrap();
        let start = back[0].sum;
        let fwd = accumulate(&rows, start, start).unwrap();
        assert_eq!(fwd.last().unwrap().sum, anchor);
    }

    #[test]
    fn state_mirrors_sum() {
        let rows = hourly(&[2.5, 2.5]);
        let out = attenuate(&rows, 10.0, 10.0).unwrap();
        for p in &out {
            assert_eq!(p.sum, p.state);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = attenuate(&[], 10.0, 10.0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn unsorted_rows_are_a_hard_error() {
        let mut rows = hourly(&[1.0, 2.0]);
        rows.reverse();
        let err = attenuate(&rows, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, ReconcileError::UnsortedInput { .. }));
    }
}
