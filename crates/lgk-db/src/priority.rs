//! Waiver priority rows: one per (league, roster, season), priority 1 best.
//!
//! For an active season the priorities form a contiguous permutation of
//! `1..=N`. `rotate_priority` and `ensure_roster_priority` preserve that
//! invariant; both must run inside the league's waiver lock.

use anyhow::{Context, Result};
use lgk_schemas::WaiverPriority;
use sqlx::postgres::PgRow;
use sqlx::Row;

fn row_to_priority(row: &PgRow) -> Result<WaiverPriority> {
    Ok(WaiverPriority {
        league_id: row.try_get("league_id")?,
        roster_id: row.try_get("roster_id")?,
        season: row.try_get("season")?,
        priority: row.try_get("priority")?,
    })
}

pub async fn get_by_roster(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    roster_id: i64,
    season: i32,
) -> Result<Option<WaiverPriority>> {
    let row = sqlx::query(
        r#"
        select league_id, roster_id, season, priority
        from waiver_priority
        where league_id = $1 and roster_id = $2 and season = $3
        "#,
    )
    .bind(league_id)
    .bind(roster_id)
    .bind(season)
    .fetch_optional(exec)
    .await
    .context("priority get_by_roster failed")?;

    row.as_ref().map(row_to_priority).transpose()
}

/// Full league order, best first.
pub async fn get_by_league(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    season: i32,
) -> Result<Vec<WaiverPriority>> {
    let rows = sqlx::query(
        r#"
        select league_id, roster_id, season, priority
        from waiver_priority
        where league_id = $1 and season = $2
        order by priority asc
        "#,
    )
    .bind(league_id)
    .bind(season)
    .fetch_all(exec)
    .await
    .context("priority get_by_league failed")?;

    rows.iter().map(row_to_priority).collect()
}

pub async fn get_max_priority(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    season: i32,
) -> Result<i32> {
    let (max,): (i32,) = sqlx::query_as(
        r#"
        select coalesce(max(priority), 0)
        from waiver_priority
        where league_id = $1 and season = $2
        "#,
    )
    .bind(league_id)
    .bind(season)
    .fetch_one(exec)
    .await
    .context("get_max_priority failed")?;

    Ok(max)
}

/// Create the row lazily at last place if the roster has none yet. Returns
/// the live priority either way.
pub async fn ensure_roster_priority(
    conn: &mut sqlx::PgConnection,
    league_id: i64,
    roster_id: i64,
    season: i32,
) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        insert into waiver_priority (league_id, roster_id, season, priority)
        values (
            $1, $2, $3,
            (select coalesce(max(priority), 0) + 1
             from waiver_priority
             where league_id = $1 and season = $3)
        )
        on conflict (league_id, roster_id, season) do nothing
        returning priority
        "#,
    )
    .bind(league_id)
    .bind(roster_id)
    .bind(season)
    .fetch_optional(&mut *conn)
    .await
    .context("ensure_roster_priority insert failed")?;

    if let Some((priority,)) = row {
        return Ok(priority);
    }

    let existing = get_by_roster(&mut *conn, league_id, roster_id, season)
        .await?
        .context("ensure_roster_priority: row vanished after conflict")?;
    Ok(existing.priority)
}

/// Season bootstrap: priorities 1..=N in the given roster order. Idempotent;
/// rosters that already hold a priority are left untouched. Returns the
/// number of rows created.
pub async fn initialize_for_league(
    conn: &mut sqlx::PgConnection,
    league_id: i64,
    season: i32,
    roster_ids: &[i64],
) -> Result<i64> {
    let mut created = 0;
    for roster_id in roster_ids {
        let res = sqlx::query(
            r#"
            insert into waiver_priority (league_id, roster_id, season, priority)
            values (
                $1, $2, $3,
                (select coalesce(max(priority), 0) + 1
                 from waiver_priority
                 where league_id = $1 and season = $3)
            )
            on conflict (league_id, roster_id, season) do nothing
            "#,
        )
        .bind(league_id)
        .bind(roster_id)
        .bind(season)
        .execute(&mut *conn)
        .await
        .context("priority initialize_for_league failed")?;
        created += res.rows_affected() as i64;
    }
    Ok(created)
}

/// Send a roster to the back of the line: every roster strictly behind its
/// previous slot moves up one, then the roster takes the last slot. The
/// priority set stays a permutation of `1..=N`.
pub async fn rotate_priority(
    conn: &mut sqlx::PgConnection,
    league_id: i64,
    season: i32,
    roster_id: i64,
) -> Result<()> {
    let previous = get_by_roster(&mut *conn, league_id, roster_id, season)
        .await?
        .context("rotate_priority: roster has no priority row")?
        .priority;

    sqlx::query(
        r#"
        update waiver_priority
        set priority = priority - 1
        where league_id = $1 and season = $2 and priority > $3
        "#,
    )
    .bind(league_id)
    .bind(season)
    .bind(previous)
    .execute(&mut *conn)
    .await
    .context("rotate_priority shift failed")?;

    sqlx::query(
        r#"
        update waiver_priority
        set priority = (select count(*) from waiver_priority
                        where league_id = $1 and season = $2)
        where league_id = $1 and season = $2 and roster_id = $3
        "#,
    )
    .bind(league_id)
    .bind(season)
    .bind(roster_id)
    .execute(&mut *conn)
    .await
    .context("rotate_priority move-to-last failed")?;

    Ok(())
}
