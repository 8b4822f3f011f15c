//! Reference locator.
//!
//! Given a series id and the batch's `[oldest, newest]` import window, query
//! the anchor store and return exactly one classified anchor or a typed
//! failure. Branch order matters: an older candidate is always preferred
//! over a newer one, because forward accumulation from a known starting
//! point is the primary, less error-prone reconstruction path.

use chrono::{DateTime, Duration, Utc};

use crate::error::ReconcileError;
use crate::store::AnchorStore;
use crate::types::{AnchorRecord, Reconciliation, ReferenceType, REFERENCE_LEAD_SECS};

/// Locate and classify the anchor for one series.
///
/// Evaluated strictly in order; the first successful branch wins:
///
/// 1. No record at all for the series → [`ReconcileError::NoDataForSeries`].
/// 2. Remember the store's newest timestamp (needed by branch 4).
/// 3. Newest record strictly before `oldest_import`: at least one hour back
///    → older reference (exactly one hour is valid); closer →
///    [`ReconcileError::ReferenceTooRecent`].
/// 4. No such record and the whole batch lies at-or-after everything on file
///    → [`ReconcileError::ImportEntirelyNewerThanStore`].
/// 5. Newest record strictly before `newest_import`: more than one hour back
///    → older reference; closer → [`ReconcileError::ReferenceTooRecent`].
/// 6. Oldest record at-or-after `newest_import` → newer reference (equality
///    with the batch edge is a valid connection anchor); none →
///    [`ReconcileError::CompleteOverlapNoReference`].
pub fn locate(
    store: &dyn AnchorStore,
    series_id: &str,
    oldest_import: DateTime<Utc>,
    newest_import: DateTime<Utc>,
) -> Result<Reconciliation, ReconcileError> {
    let query = |r: Result<Option<AnchorRecord>, _>| {
        r.map_err(|source| ReconcileError::Store {
            series_id: series_id.to_string(),
            source,
        })
    };

    // 1. A series with nothing on file cannot anchor a delta import.
    let newest_in_store = match query(store.newest(series_id))? {
        Some(record) => record,
        None => {
            return Err(ReconcileError::NoDataForSeries {
                series_id: series_id.to_string(),
            })
        }
    };

    // 3. Preferred: an anchor strictly before the batch, clear of the
    //    exclusion buffer.
    if let Some(candidate) = query(store.before(series_id, oldest_import))? {
        let lead = oldest_import - candidate.at;
        if lead >= Duration::seconds(REFERENCE_LEAD_SECS) {
            return Ok(Reconciliation {
                reference: candidate,
                ref_type: ReferenceType::Older,
            });
        }
        return Err(ReconcileError::ReferenceTooRecent {
            series_id: series_id.to_string(),
            reference_at: candidate.at,
            boundary_at: oldest_import,
        });
    }

    // 4. Nothing precedes the batch. If nothing follows it either, the
    //    import floats entirely past the store with no anchor to splice to.
    if newest_in_store.at <= oldest_import {
        return Err(ReconcileError::ImportEntirelyNewerThanStore {
            series_id: series_id.to_string(),
            newest_in_store: newest_in_store.at,
            oldest_import,
        });
    }

    // 5. Narrower search anchored at the batch's newest edge. A hit here is
    //    a record inside the batch window (branch 3 ruled out anything
    //    before the oldest edge).
    if let Some(candidate) = query(store.before(series_id, newest_import))? {
        let lead = newest_import - candidate.at;
        if lead > Duration::seconds(REFERENCE_LEAD_SECS) {
            return Ok(Reconciliation {
                reference: candidate,
                ref_type: ReferenceType::Older,
            });
        }
        return Err(ReconcileError::ReferenceTooRecent {
            series_id: series_id.to_string(),
            reference_at: candidate.at,
            boundary_at: newest_import,
        });
    }

    // 6. Last resort: connect backward from a record at-or-after the batch.
    match query(store.at_or_after(series_id, newest_import))? {
        Some(candidate) => Ok(Reconciliation {
            reference: candidate,
            ref_type: ReferenceType::Newer,
        }),
        None => Err(ReconcileError::CompleteOverlapNoReference {
            series_id: series_id.to_string(),
            oldest_import,
            newest_import,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Minimal in-process store: a sorted list of records for one series.
    struct ListStore {
        records: Vec<AnchorRecord>,
    }

    impl ListStore {
        fn new(mut records: Vec<AnchorRecord>) -> Self {
            records.sort_by_key(|r| r.at);
            Self { records }
        }
    }

    impl AnchorStore for ListStore {
        fn newest(&self, _series_id: &str) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Ok(self.records.last().copied())
        }

        fn before(
            &self,
            _series_id: &str,
            ts: DateTime<Utc>,
        ) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Ok(self.records.iter().rev().find(|r| r.at < ts).copied())
        }

        fn at_or_after(
            &self,
            _series_id: &str,
            ts: DateTime<Utc>,
        ) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Ok(self.records.iter().find(|r| r.at >= ts).copied())
        }
    }

    struct FailingStore;

    impl AnchorStore for FailingStore {
        fn newest(&self, _series_id: &str) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Err(crate::StoreError::new("connection refused"))
        }

        fn before(
            &self,
            _series_id: &str,
            _ts: DateTime<Utc>,
        ) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Err(crate::StoreError::new("connection refused"))
        }

        fn at_or_after(
            &self,
            _series_id: &str,
            _ts: DateTime<Utc>,
        ) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Err(crate::StoreError::new("connection refused"))
        }
    }

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn anchor(at: DateTime<Utc>) -> AnchorRecord {
        AnchorRecord::new(at, 100.0, 100.0)
    }

    #[test]
    fn empty_store_is_no_data_for_series() {
        let store = ListStore::new(vec![]);
        let err = locate(&store, "s", ts(10, 0, 0), ts(12, 0, 0)).unwrap_err();
        assert!(matches!(err, ReconcileError::NoDataForSeries { .. }));
    }

    #[test]
    fn record_two_hours_before_batch_is_older_reference() {
        // Scenario: store has one record at T-2h; batch spans [T, T+1h].
        let store = ListStore::new(vec![anchor(ts(8, 0, 0))]);
        let rec = locate(&store, "s", ts(10, 0, 0), ts(11, 0, 0)).unwrap();
        assert_eq!(rec.ref_type, ReferenceType::Older);
        assert_eq!(rec.reference.at, ts(8, 0, 0));
    }

    #[test]
    fn record_half_hour_before_batch_is_too_recent() {
        let store = ListStore::new(vec![anchor(ts(9, 30, 0))]);
        let err = locate(&store, "s", ts(10, 0, 0), ts(11, 0, 0)).unwrap_err();
        match err {
            ReconcileError::ReferenceTooRecent {
                reference_at,
                boundary_at,
                ..
            } => {
                assert_eq!(reference_at, ts(9, 30, 0));
                assert_eq!(boundary_at, ts(10, 0, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn exactly_one_hour_before_is_valid_boundary_inclusive() {
        let store = ListStore::new(vec![anchor(ts(9, 0, 0))]);
        let rec = locate(&store, "s", ts(10, 0, 0), ts(11, 0, 0)).unwrap();
        assert_eq!(rec.ref_type, ReferenceType::Older);
    }

    #[test]
    fn fifty_nine_fifty_nine_before_is_rejected() {
        let store = ListStore::new(vec![anchor(ts(9, 0, 1))]);
        let err = locate(&store, "s", ts(10, 0, 0), ts(11, 0, 0)).unwrap_err();
        assert!(matches!(err, ReconcileError::ReferenceTooRecent { .. }));
    }

    #[test]
    fn batch_entirely_after_store_with_no_headroom_fails() {
        // Store's only record sits exactly at the batch's oldest edge, so
        // `before(oldest)` misses and `newest_in_store <= oldest_import`.
        let store = ListStore::new(vec![anchor(ts(10, 0, 0))]);
        let err = locate(&store, "s", ts(10, 0, 0), ts(12, 0, 0)).unwrap_err();
        match err {
            ReconcileError::ImportEntirelyNewerThanStore {
                newest_in_store,
                oldest_import,
                ..
            } => {
                assert_eq!(newest_in_store, ts(10, 0, 0));
                assert_eq!(oldest_import, ts(10, 0, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn in_window_record_far_from_newest_edge_is_older_reference() {
        // No record precedes the batch, but one sits inside the window more
        // than an hour from the newest edge: branch 5 accepts it.
        let store = ListStore::new(vec![anchor(ts(10, 30, 0))]);
        let rec = locate(&store, "s", ts(10, 0, 0), ts(13, 0, 0)).unwrap();
        assert_eq!(rec.ref_type, ReferenceType::Older);
        assert_eq!(rec.reference.at, ts(10, 30, 0));
    }

    #[test]
    fn in_window_record_exactly_one_hour_from_newest_edge_is_rejected() {
        // Branch 5 requires strictly more than one hour of lead.
        let store = ListStore::new(vec![anchor(ts(12, 0, 0))]);
        let err = locate(&store, "s", ts(11, 30, 0), ts(13, 0, 0)).unwrap_err();
        assert!(matches!(err, ReconcileError::ReferenceTooRecent { .. }));
    }

    #[test]
    fn record_at_newest_edge_is_newer_connection_anchor() {
        // Equality with `newest_import` is a valid connection anchor. The
        // batch's oldest edge predates the record, so branches 3-5 miss.
        let store = ListStore::new(vec![anchor(ts(12, 0, 0))]);
        let rec = locate(&store, "s", ts(11, 30, 0), ts(12, 0, 0)).unwrap();
        assert_eq!(rec.ref_type, ReferenceType::Newer);
        assert_eq!(rec.reference.at, ts(12, 0, 0));
    }

    #[test]
    fn record_after_batch_is_newer_reference() {
        let store = ListStore::new(vec![anchor(ts(14, 0, 0))]);
        let rec = locate(&store, "s", ts(11, 30, 0), ts(12, 0, 0)).unwrap();
        assert_eq!(rec.ref_type, ReferenceType::Newer);
    }

    #[test]
    fn older_candidate_wins_over_newer_when_both_exist() {
        let store = ListStore::new(vec![anchor(ts(8, 0, 0)), anchor(ts(14, 0, 0))]);
        let rec = locate(&store, "s", ts(10, 0, 0), ts(12, 0, 0)).unwrap();
        assert_eq!(rec.ref_type, ReferenceType::Older);
        assert_eq!(rec.reference.at, ts(8, 0, 0));
    }

    /// Store whose answers changed between queries (e.g. concurrent purge):
    /// `newest` still reports a record but both edge searches come up empty.
    struct DriftedStore;

    impl AnchorStore for DriftedStore {
        fn newest(&self, _series_id: &str) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Ok(Some(anchor(ts(11, 0, 0))))
        }

        fn before(
            &self,
            _series_id: &str,
            _ts: DateTime<Utc>,
        ) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Ok(None)
        }

        fn at_or_after(
            &self,
            _series_id: &str,
            _ts: DateTime<Utc>,
        ) -> Result<Option<AnchorRecord>, crate::StoreError> {
            Ok(None)
        }
    }

    #[test]
    fn no_anchor_on_either_side_is_complete_overlap() {
        let err = locate(&DriftedStore, "s", ts(10, 0, 0), ts(12, 0, 0)).unwrap_err();
        match err {
            ReconcileError::CompleteOverlapNoReference {
                oldest_import,
                newest_import,
                ..
            } => {
                assert_eq!(oldest_import, ts(10, 0, 0));
                assert_eq!(newest_import, ts(12, 0, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn store_failure_is_attributed_to_the_series() {
        let err = locate(&FailingStore, "s1", ts(10, 0, 0), ts(11, 0, 0)).unwrap_err();
        match err {
            ReconcileError::Store { series_id, source } => {
                assert_eq!(series_id, "s1");
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
