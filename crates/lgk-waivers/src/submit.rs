//! Claim submission.
//!
//! Preconditions are checked against the pool first so bad requests fail
//! without queueing on the league's waiver lock, then re-checked inside it;
//! everything that reads-then-writes happens under the lock.

use lgk_db::{budgets, claims, leagues, priority, roster_players, run_with_lock, LockDomain};
use lgk_schemas::events::WaiverEvent;
use lgk_schemas::{League, WaiverClaim, WaiverType};
use sqlx::PgPool;
use tracing::info;

use crate::error::WaiverError;
use crate::events::DeferredEvents;

#[derive(Debug, Clone)]
pub struct SubmitClaimInput {
    pub player_id: i64,
    pub drop_player_id: Option<i64>,
    pub bid_amount: i32,
    pub idempotency_key: Option<String>,
}

/// Load the league and resolve the week claims are currently accepted for.
pub(crate) async fn claimable_week(
    pool: &PgPool,
    league_id: i64,
) -> Result<(League, i32), WaiverError> {
    let league = leagues::find_league(pool, league_id)
        .await?
        .ok_or_else(|| WaiverError::not_found("league not found"))?;

    if league.settings.waiver_type == WaiverType::None {
        return Err(WaiverError::validation("waivers are disabled for this league"));
    }

    let week = league
        .current_week
        .filter(|w| *w > 0)
        .ok_or_else(|| {
            WaiverError::validation("waiver claims are not available before the season starts")
        })?;

    Ok((league, week))
}

pub async fn submit_claim(
    pool: &PgPool,
    league_id: i64,
    user_id: i64,
    input: SubmitClaimInput,
) -> Result<(WaiverClaim, DeferredEvents), WaiverError> {
    if input.bid_amount < 0 {
        return Err(WaiverError::validation("bid amount must not be negative"));
    }

    // Fast-fail outside the lock; re-checked inside.
    claimable_week(pool, league_id).await?;

    let roster = leagues::find_roster_for_user(pool, league_id, user_id)
        .await?
        .ok_or_else(|| WaiverError::forbidden("you do not own a roster in this league"))?;

    run_with_lock(pool, LockDomain::Waiver, league_id, move |conn| {
        Box::pin(async move {
            // Re-check under the lock: settings can change between the fast
            // path and lock acquisition.
            let (league, week) = {
                let fresh = leagues::find_league(&mut *conn, league_id)
                    .await?
                    .ok_or_else(|| WaiverError::not_found("league not found"))?;
                if fresh.settings.waiver_type == WaiverType::None {
                    return Err(WaiverError::validation(
                        "waivers are disabled for this league",
                    ));
                }
                match fresh.current_week.filter(|w| *w > 0) {
                    Some(week) => (fresh, week),
                    None => {
                        return Err(WaiverError::validation(
                            "waiver claims are not available before the season starts",
                        ))
                    }
                }
            };
            let season = league.season;

            // 1. idempotent resubmit returns the original claim untouched
            if let Some(key) = input.idempotency_key.as_deref() {
                if let Some(existing) =
                    claims::find_by_idempotency_key(&mut *conn, league_id, roster.id, key).await?
                {
                    return Ok((existing, DeferredEvents::new()));
                }
            }

            // 2. target must be unowned and not already claimed by this roster
            if roster_players::find_owner(
                &mut *conn,
                league_id,
                input.player_id,
                league.active_league_season_id,
            )
            .await?
            .is_some()
            {
                return Err(WaiverError::conflict(
                    "player is already owned in this league",
                ));
            }
            if claims::has_pending_claim(&mut *conn, roster.id, input.player_id).await? {
                return Err(WaiverError::validation(
                    "a pending claim for this player already exists",
                ));
            }

            // 3. FAAB bound check against the live budget
            if league.settings.waiver_type == WaiverType::Faab {
                let budget = budgets::ensure_roster_budget(
                    conn,
                    league_id,
                    roster.id,
                    season,
                    league.settings.faab_budget,
                )
                .await?;
                if input.bid_amount > budget.remaining_budget {
                    return Err(WaiverError::validation(
                        "bid exceeds remaining FAAB budget",
                    ));
                }
            }

            // 4. a conditional drop must still be on the roster
            if let Some(drop_id) = input.drop_player_id {
                if !roster_players::find_by_roster_and_player(&mut *conn, roster.id, drop_id)
                    .await?
                {
                    return Err(WaiverError::validation(
                        "drop player is not on your roster",
                    ));
                }
            }

            // 5. / 6. snapshot priority, take the next order slot
            let priority_at_claim =
                priority::ensure_roster_priority(conn, league_id, roster.id, season).await?;
            let claim_order =
                claims::get_next_claim_order(&mut *conn, roster.id, season, week).await?;

            // 7. insert; idempotency replays re-read inside `create`
            let claim = claims::create(
                conn,
                &claims::NewClaim {
                    league_id,
                    roster_id: roster.id,
                    player_id: input.player_id,
                    drop_player_id: input.drop_player_id,
                    bid_amount: input.bid_amount,
                    priority_at_claim,
                    season,
                    week,
                    claim_order,
                    idempotency_key: input.idempotency_key.clone(),
                },
            )
            .await
            .map_err(|e| match e {
                claims::ClaimCreateError::DuplicatePending => WaiverError::validation(
                    "a pending claim for this player already exists",
                ),
                claims::ClaimCreateError::Db(err) => WaiverError::Internal(err),
            })?;

            info!(
                league_id,
                roster_id = roster.id,
                claim_id = claim.id,
                player_id = claim.player_id,
                "waiver claim submitted"
            );

            let mut events = DeferredEvents::new();
            events.push(
                league_id,
                WaiverEvent::WaiverClaimed {
                    claim: claim.clone(),
                },
            );
            Ok((claim, events))
        })
    })
    .await
}
