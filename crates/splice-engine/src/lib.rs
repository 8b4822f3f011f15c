//! splice-engine
//!
//! Delta reconciliation engine: turns per-series signed increments into
//! absolute cumulative statistics that splice smoothly onto values already
//! persisted in a long-term statistics store.
//!
//! Architectural decisions:
//! - One classified anchor per series before any conversion happens
//! - Older anchors always win over newer ones (forward accumulation is the
//!   primary reconstruction path)
//! - Anchors inside the 1-hour exclusion buffer are rejected, not nudged
//! - Unsorted input is a hard error, never silently re-sorted
//! - First per-series failure aborts the whole batch (no partial results)
//!
//! Deterministic, pure logic. The only IO is read-only queries through the
//! [`AnchorStore`] trait supplied by the caller.

mod backward;
mod error;
mod forward;
mod locator;
mod orchestrator;
mod store;
mod types;

pub use backward::attenuate;
pub use error::ReconcileError;
pub use forward::accumulate;
pub use locator::locate;
pub use orchestrator::{group_by_series, reconcile, reconcile_batches, ReconcileOptions};
pub use store::{AnchorStore, StoreError};
pub use types::{
    ensure_strictly_ascending, AnchorRecord, DeltaRow, Reconciliation, ReconciledPoint,
    ReferenceType, SeriesBatch, SeriesWindow, REFERENCE_LEAD_SECS,
};
