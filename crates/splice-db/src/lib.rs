//! splice-db
//!
//! Postgres-backed statistics store: connection bootstrap, embedded
//! migrations, the three anchor queries the engine depends on, and the
//! write path for reconciled points. Row decoding is where absent
//! `sum`/`state` values normalize to `0.0` — the engine never sees an
//! `Option` here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use splice_engine::{AnchorRecord, AnchorStore, ReconciledPoint, StoreError};

pub const ENV_DB_URL: &str = "SPLICE_DATABASE_URL";

/// Connect to Postgres using `SPLICE_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='statistics'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_statistics_table: exists,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStatus {
    pub ok: bool,
    pub has_statistics_table: bool,
}

// ---------------------------------------------------------------------------
// Anchor queries
// ---------------------------------------------------------------------------

type StatisticTuple = (DateTime<Utc>, Option<f64>, Option<f64>);

fn to_anchor((at, sum, state): StatisticTuple) -> AnchorRecord {
    AnchorRecord::new(at, sum.unwrap_or(0.0), state.unwrap_or(0.0))
}

/// Most recent record overall for a series.
pub async fn newest_statistic(pool: &PgPool, series_id: &str) -> Result<Option<AnchorRecord>> {
    let row: Option<StatisticTuple> = sqlx::query_as(
        r#"
        select at, sum, state
        from statistics
        where series_id = $1
        order by at desc
        limit 1
        "#,
    )
    .bind(series_id)
    .fetch_optional(pool)
    .await
    .context("newest-statistic query failed")?;

    Ok(row.map(to_anchor))
}

/// Newest record strictly before `ts`.
pub async fn statistic_before(
    pool: &PgPool,
    series_id: &str,
    ts: DateTime<Utc>,
) -> Result<Option<AnchorRecord>> {
    let row: Option<StatisticTuple> = sqlx::query_as(
        r#"
        select at, sum, state
        from statistics
        where series_id = $1 and at < $2
        order by at desc
        limit 1
        "#,
    )
    .bind(series_id)
    .bind(ts)
    .fetch_optional(pool)
    .await
    .context("statistic-before query failed")?;

    Ok(row.map(to_anchor))
}

/// Oldest record at-or-after `ts`.
pub async fn statistic_at_or_after(
    pool: &PgPool,
    series_id: &str,
    ts: DateTime<Utc>,
) -> Result<Option<AnchorRecord>> {
    let row: Option<StatisticTuple> = sqlx::query_as(
        r#"
        select at, sum, state
        from statistics
        where series_id = $1 and at >= $2
        order by at asc
        limit 1
        "#,
    )
    .bind(series_id)
    .bind(ts)
    .fetch_optional(pool)
    .await
    .context("statistic-at-or-after query failed")?;

    Ok(row.map(to_anchor))
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Summary of one persisted import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistSummary {
    pub import_id: Uuid,
    pub rows_written: u64,
}

/// Upsert reconciled points for one series inside a single transaction.
///
/// Idempotent per `(series_id, at)`: re-running an import overwrites the
/// same keys with the same values.
pub async fn insert_reconciled_points(
    pool: &PgPool,
    series_id: &str,
    points: &[ReconciledPoint],
    import_id: Option<Uuid>,
) -> Result<PersistSummary> {
    let import_id = import_id.unwrap_or_else(Uuid::new_v4);

    let mut tx = pool.begin().await.context("begin statistics tx failed")?;
    let mut rows_written = 0u64;
    for point in points {
        sqlx::query(
            r#"
            insert into statistics (series_id, at, sum, state)
            values ($1, $2, $3, $4)
            on conflict (series_id, at)
            do update set sum = excluded.sum, state = excluded.state
            "#,
        )
        .bind(series_id)
        .bind(point.at)
        .bind(point.sum)
        .bind(point.state)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("upsert statistic {series_id} @ {}", point.at))?;
        rows_written += 1;
    }
    tx.commit().await.context("commit statistics tx failed")?;

    Ok(PersistSummary {
        import_id,
        rows_written,
    })
}

// ---------------------------------------------------------------------------
// Blocking adapter for the synchronous engine
// ---------------------------------------------------------------------------

/// [`AnchorStore`] over a live Postgres pool.
///
/// The engine treats store queries as blocking I/O, so each trait method
/// blocks on the async query via a runtime handle. Must be driven from a
/// thread that is not itself executing on the runtime (the CLI calls the
/// engine inside `spawn_blocking`).
pub struct PgAnchorStore {
    pool: PgPool,
    rt: tokio::runtime::Handle,
}

impl PgAnchorStore {
    pub fn new(pool: PgPool, rt: tokio::runtime::Handle) -> Self {
        Self { pool, rt }
    }

    fn run<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T, StoreError> {
        self.rt
            .block_on(fut)
            .map_err(|e| StoreError::new(format!("{e:#}")))
    }
}

impl AnchorStore for PgAnchorStore {
    fn newest(&self, series_id: &str) -> Result<Option<AnchorRecord>, StoreError> {
        self.run(newest_statistic(&self.pool, series_id))
    }

    fn before(
        &self,
        series_id: &str,
        ts: DateTime<Utc>,
    ) -> Result<Option<AnchorRecord>, StoreError> {
        self.run(statistic_before(&self.pool, series_id, ts))
    }

    fn at_or_after(
        &self,
        series_id: &str,
        ts: DateTime<Utc>,
    ) -> Result<Option<AnchorRecord>, StoreError> {
        self.run(statistic_at_or_after(&self.pool, series_id, ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn absent_sum_and_state_normalize_to_zero() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let anchor = to_anchor((at, None, None));
        assert_eq!(anchor.sum, 0.0);
        assert_eq!(anchor.state, 0.0);

        let anchor = to_anchor((at, Some(12.5), None));
        assert_eq!(anchor.sum, 12.5);
        assert_eq!(anchor.state, 0.0);
    }
}
