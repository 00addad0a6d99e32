//! FAAB budgets: per (league, roster, season), `0 <= remaining <= initial`.

use anyhow::{anyhow, Context, Result};
use lgk_schemas::FaabBudget;
use sqlx::postgres::PgRow;
use sqlx::Row;

fn row_to_budget(row: &PgRow) -> Result<FaabBudget> {
    Ok(FaabBudget {
        league_id: row.try_get("league_id")?,
        roster_id: row.try_get("roster_id")?,
        season: row.try_get("season")?,
        initial_budget: row.try_get("initial_budget")?,
        remaining_budget: row.try_get("remaining_budget")?,
    })
}

pub async fn get_by_roster(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    roster_id: i64,
    season: i32,
) -> Result<Option<FaabBudget>> {
    let row = sqlx::query(
        r#"
        select league_id, roster_id, season, initial_budget, remaining_budget
        from faab_budgets
        where league_id = $1 and roster_id = $2 and season = $3
        "#,
    )
    .bind(league_id)
    .bind(roster_id)
    .bind(season)
    .fetch_optional(exec)
    .await
    .context("budget get_by_roster failed")?;

    row.as_ref().map(row_to_budget).transpose()
}

pub async fn get_by_league(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    season: i32,
) -> Result<Vec<FaabBudget>> {
    let rows = sqlx::query(
        r#"
        select league_id, roster_id, season, initial_budget, remaining_budget
        from faab_budgets
        where league_id = $1 and season = $2
        order by roster_id asc
        "#,
    )
    .bind(league_id)
    .bind(season)
    .fetch_all(exec)
    .await
    .context("budget get_by_league failed")?;

    rows.iter().map(row_to_budget).collect()
}

/// Create the row lazily with the league default if missing. Returns the
/// live budget either way.
pub async fn ensure_roster_budget(
    conn: &mut sqlx::PgConnection,
    league_id: i64,
    roster_id: i64,
    season: i32,
    default_budget: i32,
) -> Result<FaabBudget> {
    let row = sqlx::query(
        r#"
        insert into faab_budgets (league_id, roster_id, season, initial_budget, remaining_budget)
        values ($1, $2, $3, $4, $4)
        on conflict (league_id, roster_id, season) do nothing
        returning league_id, roster_id, season, initial_budget, remaining_budget
        "#,
    )
    .bind(league_id)
    .bind(roster_id)
    .bind(season)
    .bind(default_budget)
    .fetch_optional(&mut *conn)
    .await
    .context("ensure_roster_budget insert failed")?;

    if let Some(row) = row {
        return row_to_budget(&row);
    }

    get_by_roster(&mut *conn, league_id, roster_id, season)
        .await?
        .ok_or_else(|| anyhow!("ensure_roster_budget: row vanished after conflict"))
}

/// Season bootstrap: full budgets for every roster. Idempotent. Returns the
/// number of rows created.
pub async fn initialize_for_league(
    conn: &mut sqlx::PgConnection,
    league_id: i64,
    season: i32,
    roster_ids: &[i64],
    default_budget: i32,
) -> Result<i64> {
    let res = sqlx::query(
        r#"
        insert into faab_budgets (league_id, roster_id, season, initial_budget, remaining_budget)
        select $1, roster_id, $2, $4, $4
        from unnest($3::bigint[]) as t(roster_id)
        on conflict (league_id, roster_id, season) do nothing
        "#,
    )
    .bind(league_id)
    .bind(season)
    .bind(roster_ids)
    .bind(default_budget)
    .execute(conn)
    .await
    .context("budget initialize_for_league failed")?;

    Ok(res.rows_affected() as i64)
}

/// Conditional deduction: fails (returns false) rather than driving
/// `remaining_budget` negative.
pub async fn deduct_budget(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    roster_id: i64,
    season: i32,
    amount: i32,
) -> Result<bool> {
    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        update faab_budgets
        set remaining_budget = remaining_budget - $4
        where league_id = $1 and roster_id = $2 and season = $3
          and remaining_budget >= $4
        returning remaining_budget
        "#,
    )
    .bind(league_id)
    .bind(roster_id)
    .bind(season)
    .bind(amount)
    .fetch_optional(exec)
    .await
    .context("deduct_budget failed")?;

    Ok(row.is_some())
}
