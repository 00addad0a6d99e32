//! Roster membership: who owns which player within a league-season.
//!
//! `add_player` is the one write that can legitimately race with actors
//! outside the waiver lock (trades, commissioner moves). The unique index
//! `uq_roster_players_season_player` arbitrates; a loss surfaces as
//! [`RosterWriteError::OwnershipConflict`] so the processor can fail a
//! single candidate instead of the whole run.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};

use crate::is_unique_violation;

#[derive(Debug)]
pub enum RosterWriteError {
    /// Another roster already owns the player in this league-season.
    OwnershipConflict,
    Db(anyhow::Error),
}

impl std::fmt::Display for RosterWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OwnershipConflict => write!(f, "player is already owned in this league-season"),
            Self::Db(e) => write!(f, "roster write failed: {e}"),
        }
    }
}

impl std::error::Error for RosterWriteError {}

/// The roster currently owning `player_id`, if any.
pub async fn find_owner(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    player_id: i64,
    league_season_id: i64,
) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        select roster_id from roster_players
        where league_id = $1 and player_id = $2 and league_season_id = $3
        "#,
    )
    .bind(league_id)
    .bind(player_id)
    .bind(league_season_id)
    .fetch_optional(exec)
    .await
    .context("find_owner failed")?;

    Ok(row.map(|(id,)| id))
}

pub async fn find_by_roster_and_player(
    exec: impl sqlx::PgExecutor<'_>,
    roster_id: i64,
    player_id: i64,
) -> Result<bool> {
    let (owned,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1 from roster_players
            where roster_id = $1 and player_id = $2
        )
        "#,
    )
    .bind(roster_id)
    .bind(player_id)
    .fetch_one(exec)
    .await
    .context("find_by_roster_and_player failed")?;

    Ok(owned)
}

/// Insert an ownership row. Loses to `uq_roster_players_season_player` with
/// a typed [`RosterWriteError::OwnershipConflict`].
pub async fn add_player(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    league_season_id: i64,
    roster_id: i64,
    player_id: i64,
    acquired_type: &str,
) -> Result<(), RosterWriteError> {
    let res = sqlx::query(
        r#"
        insert into roster_players (league_id, league_season_id, roster_id, player_id, acquired_type)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(league_id)
    .bind(league_season_id)
    .bind(roster_id)
    .bind(player_id)
    .bind(acquired_type)
    .execute(exec)
    .await;

    match res {
        Ok(_) => Ok(()),
        Err(e) => {
            if is_unique_violation(&e, "uq_roster_players_season_player") {
                return Err(RosterWriteError::OwnershipConflict);
            }
            Err(RosterWriteError::Db(
                anyhow::Error::new(e).context("add_player insert failed"),
            ))
        }
    }
}

/// Remove the player from the roster. Returns false when the row was
/// already gone.
pub async fn remove_player(
    exec: impl sqlx::PgExecutor<'_>,
    roster_id: i64,
    player_id: i64,
) -> Result<bool> {
    let res = sqlx::query(
        r#"
        delete from roster_players
        where roster_id = $1 and player_id = $2
        "#,
    )
    .bind(roster_id)
    .bind(player_id)
    .execute(exec)
    .await
    .context("remove_player failed")?;

    Ok(res.rows_affected() > 0)
}

pub async fn get_player_count(exec: impl sqlx::PgExecutor<'_>, roster_id: i64) -> Result<i32> {
    let (count,): (i64,) =
        sqlx::query_as("select count(*) from roster_players where roster_id = $1")
            .bind(roster_id)
            .fetch_one(exec)
            .await
            .context("get_player_count failed")?;

    Ok(count as i32)
}

pub async fn get_player_ids_by_roster(
    exec: impl sqlx::PgExecutor<'_>,
    roster_id: i64,
) -> Result<HashSet<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("select player_id from roster_players where roster_id = $1")
            .bind(roster_id)
            .fetch_all(exec)
            .await
            .context("get_player_ids_by_roster failed")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Every owned player in the league-season, one query. The processor
/// preloads this so cross-roster ownership checks never hit the database
/// mid-round.
pub async fn get_owned_player_ids_by_league(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    league_season_id: i64,
) -> Result<HashSet<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        select player_id from roster_players
        where league_id = $1 and league_season_id = $2
        "#,
    )
    .bind(league_id)
    .bind(league_season_id)
    .fetch_all(exec)
    .await
    .context("get_owned_player_ids_by_league failed")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// As [`get_owned_player_ids_by_league`] but keeping the owning roster, for
/// callers that need to distinguish "owned by me" from "owned by someone".
pub async fn get_owned_player_map_by_league(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    league_season_id: i64,
) -> Result<HashMap<i64, i64>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        select player_id, roster_id from roster_players
        where league_id = $1 and league_season_id = $2
        "#,
    )
    .bind(league_id)
    .bind(league_season_id)
    .fetch_all(exec)
    .await
    .context("get_owned_player_map_by_league failed")?;

    Ok(rows.into_iter().collect())
}
