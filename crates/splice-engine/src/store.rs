//! Anchor-store boundary.
//!
//! This module defines **only** the read contract the engine needs from the
//! long-term statistics store. No SQL, no caching, no write path belongs
//! here. Concrete implementations live outside the engine (`splice-db` for
//! Postgres, `splice-testkit` for the in-memory store used by tests).

use std::fmt;

use chrono::{DateTime, Utc};

use crate::types::AnchorRecord;

/// Transport-level failure from a concrete store implementation.
///
/// Deliberately opaque: the engine does not distinguish connection loss from
/// query errors, it only attributes the failure to the series being located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Read-only view of the long-term statistics store.
///
/// Implementations must be object-safe so callers can hold a
/// `&dyn AnchorStore` without knowing the concrete type, and `Send + Sync`
/// so per-series work can move across threads. All three queries are
/// blocking; the engine adds no timeout or cancellation semantics of its
/// own.
pub trait AnchorStore: Send + Sync {
    /// Most recent record overall for a series.
    fn newest(&self, series_id: &str) -> Result<Option<AnchorRecord>, StoreError>;

    /// Newest record with `at < ts`.
    fn before(&self, series_id: &str, ts: DateTime<Utc>)
        -> Result<Option<AnchorRecord>, StoreError>;

    /// Oldest record with `at >= ts`.
    fn at_or_after(
        &self,
        series_id: &str,
        ts: DateTime<Utc>,
    ) -> Result<Option<AnchorRecord>, StoreError>;
}
