//! Roster transaction ledger: one row per add/drop/trade movement.

use anyhow::{anyhow, Context, Result};
use lgk_schemas::{RosterTransaction, TransactionType};
use sqlx::postgres::PgRow;
use sqlx::Row;

fn row_to_transaction(row: &PgRow) -> Result<RosterTransaction> {
    Ok(RosterTransaction {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        roster_id: row.try_get("roster_id")?,
        player_id: row.try_get("player_id")?,
        kind: TransactionType::parse(&row.try_get::<String, _>("type")?)?,
        season: row.try_get("season")?,
        week: row.try_get("week")?,
        related_transaction_id: row.try_get("related_transaction_id")?,
        idempotency_key: row.try_get("idempotency_key")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub league_id: i64,
    pub roster_id: i64,
    pub player_id: i64,
    pub kind: TransactionType,
    pub season: i32,
    pub week: i32,
    pub related_transaction_id: Option<i64>,
    pub idempotency_key: Option<String>,
}

/// Append a ledger row. A replayed idempotency key returns the existing row
/// instead of inserting a second one.
pub async fn create(
    conn: &mut sqlx::PgConnection,
    new: &NewTransaction,
) -> Result<RosterTransaction> {
    let row = sqlx::query(
        r#"
        insert into roster_transactions (
          league_id, roster_id, player_id, type, season, week,
          related_transaction_id, idempotency_key
        ) values ($1, $2, $3, $4, $5, $6, $7, $8)
        on conflict (league_id, roster_id, idempotency_key)
            where idempotency_key is not null
            do nothing
        returning id, league_id, roster_id, player_id, type, season, week,
                  related_transaction_id, idempotency_key, created_at
        "#,
    )
    .bind(new.league_id)
    .bind(new.roster_id)
    .bind(new.player_id)
    .bind(new.kind.as_str())
    .bind(new.season)
    .bind(new.week)
    .bind(new.related_transaction_id)
    .bind(new.idempotency_key.as_deref())
    .fetch_optional(&mut *conn)
    .await
    .context("roster transaction insert failed")?;

    if let Some(row) = row {
        return row_to_transaction(&row);
    }

    let key = new
        .idempotency_key
        .as_deref()
        .ok_or_else(|| anyhow!("transaction insert returned no row"))?;

    let row = sqlx::query(
        r#"
        select id, league_id, roster_id, player_id, type, season, week,
               related_transaction_id, idempotency_key, created_at
        from roster_transactions
        where league_id = $1 and roster_id = $2 and idempotency_key = $3
        "#,
    )
    .bind(new.league_id)
    .bind(new.roster_id)
    .bind(key)
    .fetch_one(&mut *conn)
    .await
    .context("roster transaction re-read failed")?;

    row_to_transaction(&row)
}
