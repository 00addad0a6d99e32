//! Trade invalidation: the only trade surface the waiver engine touches.
//!
//! When a claim moves a player (claimed or dropped), any open trade that
//! references that player can no longer settle; the processor expires it in
//! the same transaction and emits TRADE_INVALIDATED after commit.

use anyhow::{Context, Result};

/// Ids of open trades referencing the player.
pub async fn find_pending_by_player(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    player_id: i64,
) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        select t.id
        from trades t
        where t.league_id = $1
          and t.status in ('pending', 'accepted', 'in_review')
          and exists (
              select 1 from trade_items ti
              where ti.trade_id = t.id and ti.player_id = $2
          )
        order by t.id asc
        "#,
    )
    .bind(league_id)
    .bind(player_id)
    .fetch_all(exec)
    .await
    .context("find_pending_by_player failed")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Conditionally expire every open trade referencing any of `player_ids`.
/// Returns the expired trade ids for post-commit emission.
pub async fn expire_trades_referencing(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    player_ids: &[i64],
) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        update trades t
        set status = 'expired', updated_at = now()
        where t.league_id = $1
          and t.status in ('pending', 'accepted', 'in_review')
          and exists (
              select 1 from trade_items ti
              where ti.trade_id = t.id and ti.player_id = any($2)
          )
        returning t.id
        "#,
    )
    .bind(league_id)
    .bind(player_ids)
    .fetch_all(exec)
    .await
    .context("expire_trades_referencing failed")?;

    let mut ids: Vec<i64> = rows.into_iter().map(|(id,)| id).collect();
    ids.sort_unstable();
    Ok(ids)
}
