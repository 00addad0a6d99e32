//! Processing-run rows: the idempotence anchor for scheduled resolution.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lgk_schemas::WaiverProcessingRun;
use sqlx::postgres::PgRow;
use sqlx::Row;

fn row_to_run(row: &PgRow) -> Result<WaiverProcessingRun> {
    Ok(WaiverProcessingRun {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        season: row.try_get("season")?,
        week: row.try_get("week")?,
        window_start_at: row.try_get("window_start_at")?,
        claims_found: row.try_get("claims_found")?,
        claims_successful: row.try_get("claims_successful")?,
        ran_at: row.try_get("ran_at")?,
    })
}

/// Insert a run row for the window; `None` means a prior run already owns
/// `(league, season, week, window_start_at)` and this attempt must no-op.
pub async fn try_create(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    season: i32,
    week: i32,
    window_start_at: DateTime<Utc>,
) -> Result<Option<WaiverProcessingRun>> {
    let row = sqlx::query(
        r#"
        insert into waiver_processing_runs (league_id, season, week, window_start_at)
        values ($1, $2, $3, $4)
        on conflict (league_id, season, week, window_start_at) do nothing
        returning id, league_id, season, week, window_start_at,
                  claims_found, claims_successful, ran_at
        "#,
    )
    .bind(league_id)
    .bind(season)
    .bind(week)
    .bind(window_start_at)
    .fetch_optional(exec)
    .await
    .context("run try_create failed")?;

    row.as_ref().map(row_to_run).transpose()
}

pub async fn update_results(
    exec: impl sqlx::PgExecutor<'_>,
    run_id: i64,
    claims_found: i32,
    claims_successful: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        update waiver_processing_runs
        set claims_found = $2, claims_successful = $3
        where id = $1
        "#,
    )
    .bind(run_id)
    .bind(claims_found)
    .bind(claims_successful)
    .execute(exec)
    .await
    .context("run update_results failed")?;
    Ok(())
}

/// Remove a run row so the window can be retried. Unnecessary when the run
/// row was created inside the processing transaction (rollback erases it);
/// kept for callers that manage runs outside a wrapping transaction.
pub async fn delete(exec: impl sqlx::PgExecutor<'_>, run_id: i64) -> Result<()> {
    sqlx::query("delete from waiver_processing_runs where id = $1")
        .bind(run_id)
        .execute(exec)
        .await
        .context("run delete failed")?;
    Ok(())
}
