//! Reconciliation orchestrator.
//!
//! Groups raw delta rows by series, locates one anchor per series, dispatches
//! to the matching accumulator and assembles the per-series absolute record
//! lists. All-or-nothing: the first per-series failure aborts the whole
//! batch, so an import either fully succeeds or fully fails with a precise,
//! attributable error.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::backward::attenuate;
use crate::error::ReconcileError;
use crate::forward::accumulate;
use crate::locator::locate;
use crate::store::AnchorStore;
use crate::types::{DeltaRow, ReconciledPoint, ReferenceType, SeriesBatch, SeriesWindow};

/// Orchestrator-level knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// When the reference is newer than the batch and sits strictly after
    /// the last row, also emit one point at the anchor's own timestamp
    /// carrying the anchor's values, connecting the reconstructed series to
    /// the stored one. Off by default; the attenuator itself is always
    /// length-preserving.
    pub connection_record: bool,
}

/// Group a flat row list into per-series batches, first-appearance order.
///
/// Relative row order within each series is preserved exactly as given, so
/// the sortedness check downstream sees what the caller saw.
pub fn group_by_series(rows: &[DeltaRow]) -> Vec<SeriesBatch> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<SeriesBatch> = Vec::new();
    for row in rows {
        match index.get(&row.series_id) {
            Some(&i) => groups[i].rows.push(row.clone()),
            None => {
                index.insert(row.series_id.clone(), groups.len());
                groups.push(SeriesBatch {
                    series_id: row.series_id.clone(),
                    rows: vec![row.clone()],
                });
            }
        }
    }
    groups
}

/// Reconcile a flat batch of delta rows against the anchor store.
///
/// Convenience wrapper: [`group_by_series`] followed by
/// [`reconcile_batches`].
pub fn reconcile(
    rows: &[DeltaRow],
    store: &dyn AnchorStore,
    options: ReconcileOptions,
) -> Result<BTreeMap<String, Vec<ReconciledPoint>>, ReconcileError> {
    reconcile_batches(&group_by_series(rows), store, options)
}

/// Reconcile pre-grouped per-series batches against the anchor store.
///
/// Series are processed sequentially in the given order; the first failure
/// (locator or conversion precondition) is returned as-is and nothing is
/// partially committed. A batch with zero rows is skipped with a diagnostic,
/// not an error — upstream filtering may legitimately empty a series out.
pub fn reconcile_batches(
    batches: &[SeriesBatch],
    store: &dyn AnchorStore,
    options: ReconcileOptions,
) -> Result<BTreeMap<String, Vec<ReconciledPoint>>, ReconcileError> {
    let mut out: BTreeMap<String, Vec<ReconciledPoint>> = BTreeMap::new();

    for batch in batches {
        let window = match SeriesWindow::from_rows(&batch.series_id, &batch.rows) {
            Some(window) => window,
            None => {
                debug!(
                    series_id = %batch.series_id,
                    "no delta rows left after upstream filtering; skipping series"
                );
                continue;
            }
        };

        let reconciliation = locate(
            store,
            &batch.series_id,
            window.oldest_import,
            window.newest_import,
        )?;

        let reference = reconciliation.reference;
        let mut points = match reconciliation.ref_type {
            ReferenceType::Older => accumulate(&batch.rows, reference.sum, reference.state)?,
            ReferenceType::Newer => attenuate(&batch.rows, reference.sum, reference.state)?,
        };

        if options.connection_record
            && reconciliation.ref_type == ReferenceType::Newer
            && reference.at > window.newest_import
        {
            points.push(ReconciledPoint {
                at: reference.at,
                sum: reference.sum,
                state: reference.state,
            });
        }

        out.insert(batch.series_id.clone(), points);
    }

    Ok(out)
}
