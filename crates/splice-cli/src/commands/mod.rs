//! Command handler modules for the `splice` binary.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod check;
pub mod import;

use anyhow::Result;
use splice_ingest::{IngestError, IngestOptions};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI `--delimiter` string into the raw byte the reader expects.
pub fn parse_delimiter(delimiter: &str) -> Result<u8> {
    match delimiter.trim().to_lowercase().as_str() {
        "comma" => Ok(b','),
        "tab" => Ok(b'\t'),
        other => anyhow::bail!("invalid --delimiter '{}'. expected one of: comma | tab", other),
    }
}

/// Assemble [`IngestOptions`] from the shared import/check flags.
pub fn build_ingest_options(
    timezone: &str,
    delimiter: &str,
    decimal_comma: bool,
) -> Result<IngestOptions> {
    let timezone = splice_ingest::parse_timezone(timezone).map_err(ingest_failure)?;
    Ok(IngestOptions {
        delimiter: parse_delimiter(delimiter)?,
        decimal_comma,
        timezone,
    })
}

/// Surface an ingest failure to the operator.
///
/// Bad timestamp rows are reported through the reconciliation error taxonomy
/// so `import` and `check` fail with the same wording as an engine abort;
/// everything else (I/O, missing columns, bad numbers) keeps its own message.
pub fn ingest_failure(err: IngestError) -> anyhow::Error {
    match err.as_reconcile_error() {
        Some(engine_err) => anyhow::Error::from(engine_err),
        None => anyhow::Error::from(err),
    }
}
