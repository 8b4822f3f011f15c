//! Timestamp resolution at the ingest boundary.
//!
//! The engine works exclusively in UTC. Source files carry either offset-
//! aware RFC 3339 timestamps or naive local timestamps that must be resolved
//! in a caller-supplied IANA timezone. Resolution is strict: a local time
//! that is ambiguous (fall-back DST transition) or nonexistent (spring-
//! forward gap) is an error, not a guess.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ingest_csv::IngestError;

/// Naive formats accepted for local timestamps, tried in order.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%d.%m.%Y %H:%M"];

/// Why a raw timestamp string could not be turned into a UTC instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalTimeError {
    /// The string matches none of the accepted formats.
    Unparseable,
    /// The local time occurs twice in the given timezone (DST fall-back).
    Ambiguous,
    /// The local time does not occur in the given timezone (DST gap).
    Nonexistent,
}

/// Resolve an IANA timezone name (e.g. `"Europe/Berlin"`).
pub fn parse_timezone(name: &str) -> Result<Tz, IngestError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| IngestError::UnknownTimezone(name.trim().to_string()))
}

/// Turn a raw timestamp string into a UTC instant.
///
/// Offset-aware RFC 3339 input is honored as-is; naive input is interpreted
/// in `tz` and must map to exactly one instant there.
pub fn resolve_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Utc>, LocalTimeError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or(LocalTimeError::Unparseable)?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) => Err(LocalTimeError::Ambiguous),
        LocalResult::None => Err(LocalTimeError::Nonexistent),
    }
}
