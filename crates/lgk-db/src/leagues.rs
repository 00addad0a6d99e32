//! League and roster reads (consumed from the wider platform schema).

use anyhow::{Context, Result};
use lgk_schemas::{League, LeagueSettings, Roster, WaiverType};
use sqlx::postgres::PgRow;
use sqlx::Row;

fn row_to_league(row: &PgRow) -> Result<League> {
    Ok(League {
        id: row.try_get("id")?,
        season: row.try_get("season")?,
        current_week: row.try_get("current_week")?,
        active_league_season_id: row.try_get("active_league_season_id")?,
        settings: LeagueSettings {
            waiver_type: WaiverType::parse(&row.try_get::<String, _>("waiver_type")?)?,
            faab_budget: row.try_get("faab_budget")?,
            waiver_day: row.try_get("waiver_day")?,
            waiver_hour: row.try_get("waiver_hour")?,
            waiver_period_days: row.try_get("waiver_period_days")?,
            roster_size: row.try_get("roster_size")?,
            timezone: row.try_get("timezone")?,
        },
    })
}

fn row_to_roster(row: &PgRow) -> Result<Roster> {
    Ok(Roster {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        user_id: row.try_get("user_id")?,
        roster_number: row.try_get("roster_number")?,
        is_benched: row.try_get("is_benched")?,
    })
}

pub async fn find_league(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
) -> Result<Option<League>> {
    let row = sqlx::query(
        r#"
        select id, season, current_week, active_league_season_id,
               waiver_type, faab_budget, waiver_day, waiver_hour,
               waiver_period_days, roster_size, timezone
        from leagues
        where id = $1
        "#,
    )
    .bind(league_id)
    .fetch_optional(exec)
    .await
    .context("find_league failed")?;

    row.as_ref().map(row_to_league).transpose()
}

/// The roster `user_id` controls in this league, if any.
pub async fn find_roster_for_user(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    user_id: i64,
) -> Result<Option<Roster>> {
    let row = sqlx::query(
        r#"
        select id, league_id, user_id, roster_number, is_benched
        from rosters
        where league_id = $1 and user_id = $2
        "#,
    )
    .bind(league_id)
    .bind(user_id)
    .fetch_optional(exec)
    .await
    .context("find_roster_for_user failed")?;

    row.as_ref().map(row_to_roster).transpose()
}

/// All rosters of a league in display order.
pub async fn list_rosters(exec: impl sqlx::PgExecutor<'_>, league_id: i64) -> Result<Vec<Roster>> {
    let rows = sqlx::query(
        r#"
        select id, league_id, user_id, roster_number, is_benched
        from rosters
        where league_id = $1
        order by roster_number asc
        "#,
    )
    .bind(league_id)
    .fetch_all(exec)
    .await
    .context("list_rosters failed")?;

    rows.iter().map(row_to_roster).collect()
}
