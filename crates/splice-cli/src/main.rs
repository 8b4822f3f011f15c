//! `splice` binary entry point.
//!
//! This file is intentionally thin: it parses the command line, sets up
//! tracing and the dev `.env.local`, and dispatches into `commands`. All
//! command logic lives in the submodules.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "StatSplice delta reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a delta CSV against the statistics store and persist the result
    Import {
        /// Path to the delta CSV/TSV file
        #[arg(long)]
        csv: PathBuf,

        /// IANA timezone for naive timestamps (e.g. Europe/Berlin)
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Field delimiter: comma | tab
        #[arg(long, default_value = "comma")]
        delimiter: String,

        /// Treat ',' as the decimal separator and '.' as thousands grouping
        #[arg(long, default_value_t = false)]
        decimal_comma: bool,

        /// Append a bridging point at the anchor timestamp for backward imports
        #[arg(long, default_value_t = false)]
        connection_record: bool,

        /// Reconcile but do not write anything to the store
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Parse a delta CSV and report per-series windows without touching the store
    Check {
        /// Path to the delta CSV/TSV file
        #[arg(long)]
        csv: PathBuf,

        /// IANA timezone for naive timestamps
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Field delimiter: comma | tab
        #[arg(long, default_value = "comma")]
        delimiter: String,

        /// Treat ',' as the decimal separator and '.' as thousands grouping
        #[arg(long, default_value_t = false)]
        decimal_comma: bool,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations to the statistics database
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Import {
            csv,
            timezone,
            delimiter,
            decimal_comma,
            connection_record,
            dry_run,
        } => {
            commands::import::run_import(
                csv,
                timezone,
                delimiter,
                decimal_comma,
                connection_record,
                dry_run,
            )
            .await
        }

        Commands::Check {
            csv,
            timezone,
            delimiter,
            decimal_comma,
        } => commands::check::run_check(csv, timezone, delimiter, decimal_comma),

        Commands::Db { cmd } => {
            let pool = splice_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = splice_db::status(&pool).await?;
                    println!("db_ok={} has_statistics_table={}", s.ok, s.has_statistics_table);
                }
                DbCmd::Migrate => {
                    splice_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
