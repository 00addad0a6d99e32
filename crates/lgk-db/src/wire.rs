//! The waiver wire: recently-dropped players whose acquisition is gated
//! behind a claim until `waiver_expires_at`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lgk_schemas::WaiverWireEntry;
use sqlx::postgres::PgRow;
use sqlx::Row;

fn row_to_entry(row: &PgRow) -> Result<WaiverWireEntry> {
    Ok(WaiverWireEntry {
        league_id: row.try_get("league_id")?,
        player_id: row.try_get("player_id")?,
        dropped_by_roster_id: row.try_get("dropped_by_roster_id")?,
        waiver_expires_at: row.try_get("waiver_expires_at")?,
        season: row.try_get("season")?,
        week: row.try_get("week")?,
    })
}

/// Put a player on the wire. A re-drop refreshes the expiry and provenance.
pub async fn add_player(
    exec: impl sqlx::PgExecutor<'_>,
    entry: &WaiverWireEntry,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into waiver_wire (
          league_id, player_id, dropped_by_roster_id, waiver_expires_at, season, week
        ) values ($1, $2, $3, $4, $5, $6)
        on conflict (league_id, player_id) do update
            set dropped_by_roster_id = excluded.dropped_by_roster_id,
                waiver_expires_at = excluded.waiver_expires_at,
                season = excluded.season,
                week = excluded.week
        "#,
    )
    .bind(entry.league_id)
    .bind(entry.player_id)
    .bind(entry.dropped_by_roster_id)
    .bind(entry.waiver_expires_at)
    .bind(entry.season)
    .bind(entry.week)
    .execute(exec)
    .await
    .context("wire add_player failed")?;
    Ok(())
}

pub async fn remove_player(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    player_id: i64,
) -> Result<()> {
    sqlx::query("delete from waiver_wire where league_id = $1 and player_id = $2")
        .bind(league_id)
        .bind(player_id)
        .execute(exec)
        .await
        .context("wire remove_player failed")?;
    Ok(())
}

/// Whether the player is currently gated (entry exists and has not expired).
pub async fn is_on_waivers(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    player_id: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let (gated,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1 from waiver_wire
            where league_id = $1 and player_id = $2 and waiver_expires_at > $3
        )
        "#,
    )
    .bind(league_id)
    .bind(player_id)
    .bind(now)
    .fetch_one(exec)
    .await
    .context("is_on_waivers failed")?;

    Ok(gated)
}

pub async fn get_player_expiration(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    player_id: i64,
) -> Result<Option<DateTime<Utc>>> {
    let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
        r#"
        select waiver_expires_at from waiver_wire
        where league_id = $1 and player_id = $2
        "#,
    )
    .bind(league_id)
    .bind(player_id)
    .fetch_optional(exec)
    .await
    .context("get_player_expiration failed")?;

    Ok(row.map(|(t,)| t))
}

pub async fn get_by_league(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
) -> Result<Vec<WaiverWireEntry>> {
    let rows = sqlx::query(
        r#"
        select league_id, player_id, dropped_by_roster_id, waiver_expires_at, season, week
        from waiver_wire
        where league_id = $1
        order by waiver_expires_at asc, player_id asc
        "#,
    )
    .bind(league_id)
    .fetch_all(exec)
    .await
    .context("wire get_by_league failed")?;

    rows.iter().map(row_to_entry).collect()
}

/// Drop expired entries (their gate is gone). Returns the number removed.
pub async fn remove_expired(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let res = sqlx::query(
        r#"
        delete from waiver_wire
        where league_id = $1 and waiver_expires_at <= $2
        "#,
    )
    .bind(league_id)
    .bind(now)
    .execute(exec)
    .await
    .context("wire remove_expired failed")?;

    Ok(res.rows_affected() as i64)
}
