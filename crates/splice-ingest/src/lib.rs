//! splice-ingest
//!
//! Upstream row extraction for the reconciliation engine: CSV/TSV files to
//! [`splice_engine::DeltaRow`] values, including column validation and
//! timezone resolution of naive timestamps. It is the **read** side only:
//! no anchor queries, no accumulation, no persistence.

mod ingest_csv;
mod timezone;

pub use ingest_csv::{parse_csv_file, parse_csv_str, IngestError, IngestOptions};
pub use timezone::{parse_timezone, resolve_timestamp, LocalTimeError};
