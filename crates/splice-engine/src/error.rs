use std::fmt;

use chrono::{DateTime, Utc};

use crate::store::StoreError;

/// Terminal reconciliation failures, each attributed to a specific series.
///
/// Every variant carries the series id plus the boundary timestamps involved
/// so the caller can produce an actionable message without re-querying
/// anything. Nothing here is retried: the first failure aborts the whole
/// batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// The series has no persisted records at all; a delta import without
    /// any anchor is impossible.
    NoDataForSeries { series_id: String },

    /// A candidate anchor exists but violates the 1-hour exclusion buffer
    /// relative to the batch edge it was compared against.
    ReferenceTooRecent {
        series_id: String,
        reference_at: DateTime<Utc>,
        boundary_at: DateTime<Utc>,
    },

    /// The batch's oldest timestamp is at or after everything on file and no
    /// "before" anchor could be found.
    ImportEntirelyNewerThanStore {
        series_id: String,
        newest_in_store: DateTime<Utc>,
        oldest_import: DateTime<Utc>,
    },

    /// Neither a valid "before" nor "at-or-after" anchor exists; the batch's
    /// range is fully enmeshed with stored data.
    CompleteOverlapNoReference {
        series_id: String,
        oldest_import: DateTime<Utc>,
        newest_import: DateTime<Utc>,
    },

    /// A series' delta rows are not strictly ascending by timestamp.
    /// `at` is the first timestamp that breaks the order.
    UnsortedInput {
        series_id: String,
        at: DateTime<Utc>,
    },

    /// Upstream parsing failure surfaced into the engine's input.
    InvalidTimestampFormat { series_id: String, raw: String },

    /// An anchor-store query failed while locating a reference for this
    /// series. Transport-level; never retried here.
    Store {
        series_id: String,
        source: StoreError,
    },
}

impl ReconcileError {
    /// The series this failure is attributed to.
    pub fn series_id(&self) -> &str {
        match self {
            ReconcileError::NoDataForSeries { series_id }
            | ReconcileError::ReferenceTooRecent { series_id, .. }
            | ReconcileError::ImportEntirelyNewerThanStore { series_id, .. }
            | ReconcileError::CompleteOverlapNoReference { series_id, .. }
            | ReconcileError::UnsortedInput { series_id, .. }
            | ReconcileError::InvalidTimestampFormat { series_id, .. }
            | ReconcileError::Store { series_id, .. } => series_id,
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::NoDataForSeries { series_id } => {
                write!(
                    f,
                    "series '{series_id}': no persisted records exist; cannot anchor a delta import"
                )
            }
            ReconcileError::ReferenceTooRecent {
                series_id,
                reference_at,
                boundary_at,
            } => {
                write!(
                    f,
                    "series '{series_id}': reference at {reference_at} is within one hour of \
                     batch edge {boundary_at}"
                )
            }
            ReconcileError::ImportEntirelyNewerThanStore {
                series_id,
                newest_in_store,
                oldest_import,
            } => {
                write!(
                    f,
                    "series '{series_id}': batch starting {oldest_import} lies entirely after \
                     newest stored record {newest_in_store}; no anchor before the batch"
                )
            }
            ReconcileError::CompleteOverlapNoReference {
                series_id,
                oldest_import,
                newest_import,
            } => {
                write!(
                    f,
                    "series '{series_id}': batch [{oldest_import}, {newest_import}] fully \
                     overlaps stored data; no usable anchor on either side"
                )
            }
            ReconcileError::UnsortedInput { series_id, at } => {
                write!(
                    f,
                    "series '{series_id}': delta rows not strictly ascending at {at}"
                )
            }
            ReconcileError::InvalidTimestampFormat { series_id, raw } => {
                write!(
                    f,
                    "series '{series_id}': unparseable timestamp '{raw}'"
                )
            }
            ReconcileError::Store { series_id, source } => {
                write!(f, "series '{series_id}': anchor store query failed: {source}")
            }
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}
