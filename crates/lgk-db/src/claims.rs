//! Waiver claim rows: lifecycle writes and the snapshot path used by the
//! processor.
//!
//! Idempotency contract: `create` lands on the partial unique index
//! `(league_id, roster_id, idempotency_key)` with ON CONFLICT DO NOTHING and
//! re-reads the surviving row, so a retried submit returns the original
//! claim. The pending-uniqueness rule `(roster_id, player_id) where pending`
//! surfaces as [`ClaimCreateError::DuplicatePending`].

use anyhow::{anyhow, Context, Result};
use lgk_schemas::{ClaimDetails, ClaimStatus, WaiverClaim};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::is_unique_violation;

const CLAIM_COLUMNS: &str = r#"
    id, league_id, roster_id, player_id, drop_player_id, bid_amount,
    priority_at_claim, status, season, week, claim_order, processing_run_id,
    idempotency_key, processed_at, failure_reason, created_at, updated_at
"#;

fn row_to_claim(row: &PgRow) -> Result<WaiverClaim> {
    Ok(WaiverClaim {
        id: row.try_get("id")?,
        league_id: row.try_get("league_id")?,
        roster_id: row.try_get("roster_id")?,
        player_id: row.try_get("player_id")?,
        drop_player_id: row.try_get("drop_player_id")?,
        bid_amount: row.try_get("bid_amount")?,
        priority_at_claim: row.try_get("priority_at_claim")?,
        status: ClaimStatus::parse(&row.try_get::<String, _>("status")?)?,
        season: row.try_get("season")?,
        week: row.try_get("week")?,
        claim_order: row.try_get("claim_order")?,
        processing_run_id: row.try_get("processing_run_id")?,
        idempotency_key: row.try_get("idempotency_key")?,
        processed_at: row.try_get("processed_at")?,
        failure_reason: row.try_get("failure_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewClaim {
    pub league_id: i64,
    pub roster_id: i64,
    pub player_id: i64,
    pub drop_player_id: Option<i64>,
    pub bid_amount: i32,
    pub priority_at_claim: i32,
    pub season: i32,
    pub week: i32,
    pub claim_order: i32,
    pub idempotency_key: Option<String>,
}

#[derive(Debug)]
pub enum ClaimCreateError {
    /// The roster already has a pending claim for this player.
    DuplicatePending,
    Db(anyhow::Error),
}

impl std::fmt::Display for ClaimCreateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicatePending => {
                write!(f, "a pending claim for this player already exists")
            }
            Self::Db(e) => write!(f, "claim insert failed: {e}"),
        }
    }
}

impl std::error::Error for ClaimCreateError {}

/// Insert a pending claim. A replayed idempotency key returns the existing
/// row; a pending-claim collision returns [`ClaimCreateError::DuplicatePending`].
pub async fn create(
    conn: &mut sqlx::PgConnection,
    new: &NewClaim,
) -> Result<WaiverClaim, ClaimCreateError> {
    let res = sqlx::query(&format!(
        r#"
        insert into waiver_claims (
          league_id, roster_id, player_id, drop_player_id, bid_amount,
          priority_at_claim, status, season, week, claim_order, idempotency_key
        ) values (
          $1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9, $10
        )
        on conflict (league_id, roster_id, idempotency_key)
            where idempotency_key is not null
            do nothing
        returning {CLAIM_COLUMNS}
        "#
    ))
    .bind(new.league_id)
    .bind(new.roster_id)
    .bind(new.player_id)
    .bind(new.drop_player_id)
    .bind(new.bid_amount)
    .bind(new.priority_at_claim)
    .bind(new.season)
    .bind(new.week)
    .bind(new.claim_order)
    .bind(new.idempotency_key.as_deref())
    .fetch_optional(&mut *conn)
    .await;

    let row = match res {
        Ok(row) => row,
        Err(e) => {
            if is_unique_violation(&e, "uq_claims_pending_roster_player") {
                return Err(ClaimCreateError::DuplicatePending);
            }
            return Err(ClaimCreateError::Db(
                anyhow::Error::new(e).context("claim insert failed"),
            ));
        }
    };

    match row {
        Some(row) => row_to_claim(&row).map_err(ClaimCreateError::Db),
        None => {
            // ON CONFLICT swallowed the insert: an idempotency replay.
            let key = new
                .idempotency_key
                .as_deref()
                .ok_or_else(|| ClaimCreateError::Db(anyhow!("insert returned no row")))?;
            find_by_idempotency_key(&mut *conn, new.league_id, new.roster_id, key)
                .await
                .map_err(ClaimCreateError::Db)?
                .ok_or_else(|| {
                    ClaimCreateError::Db(anyhow!("idempotency conflict but no existing claim"))
                })
        }
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub async fn find_by_id(
    exec: impl sqlx::PgExecutor<'_>,
    claim_id: i64,
) -> Result<Option<WaiverClaim>> {
    let row = sqlx::query(&format!(
        "select {CLAIM_COLUMNS} from waiver_claims where id = $1"
    ))
    .bind(claim_id)
    .fetch_optional(exec)
    .await
    .context("find_by_id failed")?;

    row.as_ref().map(row_to_claim).transpose()
}

/// Claim joined with its owning roster's user and live priority. Backs the
/// ownership checks of the management surface.
pub async fn find_by_id_with_details(
    exec: impl sqlx::PgExecutor<'_>,
    claim_id: i64,
) -> Result<Option<ClaimDetails>> {
    let row = sqlx::query(
        r#"
        select c.*, r.user_id as roster_user_id,
               coalesce(wp.priority, c.priority_at_claim) as current_priority
        from waiver_claims c
        join rosters r on r.id = c.roster_id
        left join waiver_priority wp
          on wp.league_id = c.league_id
         and wp.roster_id = c.roster_id
         and wp.season = c.season
        where c.id = $1
        "#,
    )
    .bind(claim_id)
    .fetch_optional(exec)
    .await
    .context("find_by_id_with_details failed")?;

    let Some(row) = row else { return Ok(None) };
    Ok(Some(ClaimDetails {
        claim: row_to_claim(&row)?,
        user_id: row.try_get("roster_user_id")?,
        current_priority: row.try_get("current_priority")?,
    }))
}

pub async fn find_by_idempotency_key(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    roster_id: i64,
    key: &str,
) -> Result<Option<WaiverClaim>> {
    let row = sqlx::query(&format!(
        r#"
        select {CLAIM_COLUMNS}
        from waiver_claims
        where league_id = $1 and roster_id = $2 and idempotency_key = $3
        "#
    ))
    .bind(league_id)
    .bind(roster_id)
    .bind(key)
    .fetch_optional(exec)
    .await
    .context("find_by_idempotency_key failed")?;

    row.as_ref().map(row_to_claim).transpose()
}

/// Pending claims of one roster in user-defined processing order.
pub async fn get_pending_by_roster(
    exec: impl sqlx::PgExecutor<'_>,
    roster_id: i64,
) -> Result<Vec<WaiverClaim>> {
    let rows = sqlx::query(&format!(
        r#"
        select {CLAIM_COLUMNS}
        from waiver_claims
        where roster_id = $1 and status = 'pending'
        order by claim_order asc, id asc
        "#
    ))
    .bind(roster_id)
    .fetch_all(exec)
    .await
    .context("get_pending_by_roster failed")?;

    rows.iter().map(row_to_claim).collect()
}

/// League-wide pending claims for a week joined with each roster's live
/// priority. Read path only; the processor iterates the snapshot instead.
pub async fn get_pending_by_league_with_current_priority(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    season: i32,
    week: i32,
) -> Result<Vec<ClaimDetails>> {
    let rows = sqlx::query(
        r#"
        select c.*, r.user_id as roster_user_id,
               coalesce(wp.priority, c.priority_at_claim) as current_priority
        from waiver_claims c
        join rosters r on r.id = c.roster_id
        left join waiver_priority wp
          on wp.league_id = c.league_id
         and wp.roster_id = c.roster_id
         and wp.season = c.season
        where c.league_id = $1 and c.season = $2 and c.week = $3
          and c.status = 'pending'
        order by c.roster_id asc, c.claim_order asc, c.id asc
        "#,
    )
    .bind(league_id)
    .bind(season)
    .bind(week)
    .fetch_all(exec)
    .await
    .context("get_pending_by_league_with_current_priority failed")?;

    rows.iter()
        .map(|row| {
            Ok(ClaimDetails {
                claim: row_to_claim(row)?,
                user_id: row.try_get("roster_user_id")?,
                current_priority: row.try_get("current_priority")?,
            })
        })
        .collect()
}

/// The frozen set a processing run iterates over.
pub async fn get_pending_by_processing_run(
    exec: impl sqlx::PgExecutor<'_>,
    run_id: i64,
) -> Result<Vec<WaiverClaim>> {
    let rows = sqlx::query(&format!(
        r#"
        select {CLAIM_COLUMNS}
        from waiver_claims
        where processing_run_id = $1 and status = 'pending'
        order by roster_id asc, claim_order asc, id asc
        "#
    ))
    .bind(run_id)
    .fetch_all(exec)
    .await
    .context("get_pending_by_processing_run failed")?;

    rows.iter().map(row_to_claim).collect()
}

// ---------------------------------------------------------------------------
// Snapshot & status writes
// ---------------------------------------------------------------------------

/// Tag every untagged pending claim of the week with `run_id`. Claims
/// submitted after this statement keep `processing_run_id = NULL` and wait
/// for the next run. Returns the number of claims snapshotted.
pub async fn snapshot_claims_for_processing_run(
    exec: impl sqlx::PgExecutor<'_>,
    league_id: i64,
    season: i32,
    week: i32,
    run_id: i64,
) -> Result<i64> {
    let res = sqlx::query(
        r#"
        update waiver_claims
        set processing_run_id = $4, updated_at = now()
        where league_id = $1 and season = $2 and week = $3
          and status = 'pending' and processing_run_id is null
        "#,
    )
    .bind(league_id)
    .bind(season)
    .bind(week)
    .bind(run_id)
    .execute(exec)
    .await
    .context("snapshot_claims_for_processing_run failed")?;

    Ok(res.rows_affected() as i64)
}

/// Move a claim to a terminal processor state. `processed_at` is stamped for
/// successful/failed/invalid transitions.
pub async fn update_status(
    exec: impl sqlx::PgExecutor<'_>,
    claim_id: i64,
    status: ClaimStatus,
    failure_reason: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        update waiver_claims
        set status = $2,
            failure_reason = $3,
            processed_at = case when $2 in ('successful','failed','invalid')
                                then now() else processed_at end,
            updated_at = now()
        where id = $1
        "#,
    )
    .bind(claim_id)
    .bind(status.as_str())
    .bind(failure_reason)
    .execute(exec)
    .await
    .context("update_status failed")?;
    Ok(())
}

/// Conditional cancel: only a still-pending claim flips to cancelled. A
/// `false` return means the processor (or a prior cancel) got there first.
pub async fn cancel_if_pending(exec: impl sqlx::PgExecutor<'_>, claim_id: i64) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        update waiver_claims
        set status = 'cancelled', updated_at = now()
        where id = $1 and status = 'pending'
        returning id
        "#,
    )
    .bind(claim_id)
    .fetch_optional(exec)
    .await
    .context("cancel_if_pending failed")?;

    Ok(row.is_some())
}

pub async fn update_bid(
    exec: impl sqlx::PgExecutor<'_>,
    claim_id: i64,
    bid_amount: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        update waiver_claims
        set bid_amount = $2, updated_at = now()
        where id = $1
        "#,
    )
    .bind(claim_id)
    .bind(bid_amount)
    .execute(exec)
    .await
    .context("update_bid failed")?;
    Ok(())
}

pub async fn update_drop_player(
    exec: impl sqlx::PgExecutor<'_>,
    claim_id: i64,
    drop_player_id: Option<i64>,
) -> Result<()> {
    sqlx::query(
        r#"
        update waiver_claims
        set drop_player_id = $2, updated_at = now()
        where id = $1
        "#,
    )
    .bind(claim_id)
    .bind(drop_player_id)
    .execute(exec)
    .await
    .context("update_drop_player failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Atomically rewrite `claim_order` to match `ordered_ids` (positions
/// 1..=N). The caller has already verified the ids are exactly the roster's
/// pending set.
pub async fn reorder_claims(
    exec: impl sqlx::PgExecutor<'_>,
    roster_id: i64,
    ordered_ids: &[i64],
) -> Result<()> {
    sqlx::query(
        r#"
        update waiver_claims c
        set claim_order = v.ord::int, updated_at = now()
        from unnest($2::bigint[]) with ordinality as v(id, ord)
        where c.id = v.id and c.roster_id = $1 and c.status = 'pending'
        "#,
    )
    .bind(roster_id)
    .bind(ordered_ids)
    .execute(exec)
    .await
    .context("reorder_claims failed")?;
    Ok(())
}

/// Next free `claim_order` slot for a roster-week: `max + 1`, or 1.
pub async fn get_next_claim_order(
    exec: impl sqlx::PgExecutor<'_>,
    roster_id: i64,
    season: i32,
    week: i32,
) -> Result<i32> {
    let (next,): (i32,) = sqlx::query_as(
        r#"
        select coalesce(max(claim_order), 0) + 1
        from waiver_claims
        where roster_id = $1 and season = $2 and week = $3 and status = 'pending'
        "#,
    )
    .bind(roster_id)
    .bind(season)
    .bind(week)
    .fetch_one(exec)
    .await
    .context("get_next_claim_order failed")?;

    Ok(next)
}

pub async fn has_pending_claim(
    exec: impl sqlx::PgExecutor<'_>,
    roster_id: i64,
    player_id: i64,
) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1 from waiver_claims
            where roster_id = $1 and player_id = $2 and status = 'pending'
        )
        "#,
    )
    .bind(roster_id)
    .bind(player_id)
    .fetch_one(exec)
    .await
    .context("has_pending_claim failed")?;

    Ok(exists)
}
