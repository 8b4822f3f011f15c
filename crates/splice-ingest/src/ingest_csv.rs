//! CSV/TSV ingestion of delta rows.
//!
//! Converts a delimited file (or in-memory text) into
//! [`splice_engine::DeltaRow`] values ready for reconciliation.
//!
//! ## Column contract (case-insensitive, order-independent)
//!
//! | Column         | Type / example       | Notes                             |
//! |----------------|----------------------|-----------------------------------|
//! | `statistic_id` | `sensor.energy`      | Series identifier                 |
//! | `start`        | `2024-03-01 10:00`   | Naive local or RFC 3339           |
//! | `delta`        | `10.5`               | Signed; `10,5` in comma mode      |
//!
//! There is no skip-and-continue mode here: structural problems fail the
//! whole file and field-level problems fail with the offending row number,
//! field name and raw value. Rows come back in file order; the engine
//! validates per-series ordering itself.

use std::fmt;
use std::path::Path;

use chrono_tz::Tz;

use splice_engine::{DeltaRow, ReconcileError};

use crate::timezone::{resolve_timestamp, LocalTimeError};

const COL_SERIES: &str = "statistic_id";
const COL_START: &str = "start";
const COL_DELTA: &str = "delta";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced by delimited-file parsing in this module.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// An I/O or CSV-library error.
    Io(String),
    /// The header row is missing a required column.
    MissingColumn(String),
    /// A record field could not be parsed into the expected type.
    ParseField {
        row: usize,
        field: &'static str,
        raw: String,
    },
    /// The timezone name supplied for naive timestamps is not a known IANA
    /// zone.
    UnknownTimezone(String),
    /// A `start` value could not be resolved to a single UTC instant.
    InvalidTimestamp {
        row: usize,
        series_id: String,
        raw: String,
        kind: LocalTimeError,
    },
}

impl IngestError {
    /// Surface an invalid-timestamp row in the engine's own error taxonomy.
    pub fn as_reconcile_error(&self) -> Option<ReconcileError> {
        match self {
            IngestError::InvalidTimestamp {
                series_id, raw, ..
            } => Some(ReconcileError::InvalidTimestampFormat {
                series_id: series_id.clone(),
                raw: raw.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(msg) => write!(f, "csv io error: {msg}"),
            IngestError::MissingColumn(col) => {
                write!(f, "csv missing required header column: '{col}'")
            }
            IngestError::ParseField { row, field, raw } => {
                write!(
                    f,
                    "csv row {row}: cannot parse field '{field}' from value '{raw}'"
                )
            }
            IngestError::UnknownTimezone(name) => {
                write!(f, "unknown IANA timezone: '{name}'")
            }
            IngestError::InvalidTimestamp {
                row,
                series_id,
                raw,
                kind,
            } => {
                let why = match kind {
                    LocalTimeError::Unparseable => "unparseable",
                    LocalTimeError::Ambiguous => "ambiguous in the given timezone",
                    LocalTimeError::Nonexistent => "nonexistent in the given timezone",
                };
                write!(
                    f,
                    "csv row {row} (series '{series_id}'): timestamp '{raw}' is {why}"
                )
            }
        }
    }
}

impl std::error::Error for IngestError {}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Parsing knobs for one source file.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Field delimiter, `b','` or `b'\t'`.
    pub delimiter: u8,
    /// Treat `,` as the decimal separator and `.` as a thousands separator
    /// in the `delta` column (`1.234,5` reads as `1234.5`).
    pub decimal_comma: bool,
    /// Timezone used to resolve naive `start` timestamps.
    pub timezone: Tz,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            decimal_comma: false,
            timezone: chrono_tz::UTC,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a delimited file at `path` into delta rows.
///
/// See [`parse_csv_str`] for the full contract.
pub fn parse_csv_file(path: &Path, opts: &IngestOptions) -> Result<Vec<DeltaRow>, IngestError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| IngestError::Io(format!("read '{}': {e}", path.display())))?;
    parse_csv_str(&text, opts)
}

/// Parse delimited text into delta rows (useful for tests without touching
/// the filesystem).
pub fn parse_csv_str(src: &str, opts: &IngestOptions) -> Result<Vec<DeltaRow>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .trim(csv::Trim::All)
        .from_reader(src.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| IngestError::Io(e.to_string()))?
        .clone();

    let col = |name: &str| -> Result<usize, IngestError> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
    };

    let series_idx = col(COL_SERIES)?;
    let start_idx = col(COL_START)?;
    let delta_idx = col(COL_DELTA)?;

    let mut out = Vec::new();
    // 1-based data rows, header = 0.
    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let record = record.map_err(|e| IngestError::Io(format!("row {row}: {e}")))?;

        let field = |idx: usize, name: &'static str| -> Result<&str, IngestError> {
            record.get(idx).ok_or(IngestError::ParseField {
                row,
                field: name,
                raw: String::new(),
            })
        };

        let series_id = field(series_idx, COL_SERIES)?.to_string();
        if series_id.is_empty() {
            return Err(IngestError::ParseField {
                row,
                field: COL_SERIES,
                raw: String::new(),
            });
        }

        let start_raw = field(start_idx, COL_START)?;
        let at = resolve_timestamp(start_raw, opts.timezone).map_err(|kind| {
            IngestError::InvalidTimestamp {
                row,
                series_id: series_id.clone(),
                raw: start_raw.to_string(),
                kind,
            }
        })?;

        let delta_raw = field(delta_idx, COL_DELTA)?;
        let delta: f64 = normalize_decimal(delta_raw, opts.decimal_comma)
            .parse()
            .map_err(|_| IngestError::ParseField {
                row,
                field: COL_DELTA,
                raw: delta_raw.to_string(),
            })?;

        out.push(DeltaRow::new(series_id, at, delta));
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize a numeric string for parsing. In decimal-comma mode `.` is a
/// thousands separator and `,` the decimal point.
fn normalize_decimal(raw: &str, decimal_comma: bool) -> String {
    if decimal_comma {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
