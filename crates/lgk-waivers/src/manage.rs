//! Claim management: update, reorder, cancel, list.
//!
//! Ownership checks run against the pool for fast failure; the
//! read-then-write section of each operation runs under the waiver lock so
//! it can never interleave with a processing run. Cancel stays available in
//! pre-season (users clean up), the rest fail fast.

use lgk_db::{budgets, claims, leagues, roster_players, run_with_lock, LockDomain};
use lgk_schemas::events::WaiverEvent;
use lgk_schemas::{ClaimDetails, ClaimStatus, WaiverClaim, WaiverType};
use sqlx::PgPool;
use tracing::info;

use crate::error::WaiverError;
use crate::events::DeferredEvents;
use crate::submit::claimable_week;

#[derive(Debug, Clone, Default)]
pub struct UpdateClaimInput {
    pub bid_amount: Option<i32>,
    pub drop_player_id: Option<i64>,
    /// Explicitly remove the conditional drop.
    pub clear_drop: bool,
}

// ---------------------------------------------------------------------------
// Ownership lookup
// ---------------------------------------------------------------------------

/// Resolve a claim and verify it belongs to `user_id` within `league_id`.
async fn owned_claim(
    pool: &PgPool,
    league_id: i64,
    user_id: i64,
    claim_id: i64,
) -> Result<ClaimDetails, WaiverError> {
    let details = claims::find_by_id_with_details(pool, claim_id)
        .await?
        .filter(|d| d.claim.league_id == league_id)
        .ok_or_else(|| WaiverError::not_found("claim not found"))?;

    if details.user_id != user_id {
        return Err(WaiverError::forbidden("this claim belongs to another roster"));
    }

    Ok(details)
}

// ---------------------------------------------------------------------------
// update_claim
// ---------------------------------------------------------------------------

pub async fn update_claim(
    pool: &PgPool,
    league_id: i64,
    user_id: i64,
    claim_id: i64,
    input: UpdateClaimInput,
) -> Result<(WaiverClaim, DeferredEvents), WaiverError> {
    if let Some(bid) = input.bid_amount {
        if bid < 0 {
            return Err(WaiverError::validation("bid amount must not be negative"));
        }
    }

    let (league, _week) = claimable_week(pool, league_id).await?;
    let details = owned_claim(pool, league_id, user_id, claim_id).await?;
    let roster_id = details.claim.roster_id;

    run_with_lock(pool, LockDomain::Waiver, league_id, move |conn| {
        Box::pin(async move {
            let existing = claims::find_by_id(&mut *conn, claim_id)
                .await?
                .ok_or_else(|| WaiverError::not_found("claim not found"))?;
            if existing.status != ClaimStatus::Pending {
                return Err(WaiverError::validation("claim is no longer pending"));
            }

            if let Some(new_bid) = input.bid_amount {
                if league.settings.waiver_type == WaiverType::Faab {
                    let budget = budgets::ensure_roster_budget(
                        conn,
                        league_id,
                        roster_id,
                        league.season,
                        league.settings.faab_budget,
                    )
                    .await?;
                    // the claim's current bid is still available to itself
                    let available = budget.remaining_budget + existing.bid_amount;
                    if new_bid > available {
                        return Err(WaiverError::validation(
                            "bid exceeds remaining FAAB budget",
                        ));
                    }
                }
                claims::update_bid(&mut *conn, claim_id, new_bid).await?;
            }

            if let Some(drop_id) = input.drop_player_id {
                if !roster_players::find_by_roster_and_player(&mut *conn, roster_id, drop_id)
                    .await?
                {
                    return Err(WaiverError::validation(
                        "drop player is not on your roster",
                    ));
                }
                claims::update_drop_player(&mut *conn, claim_id, Some(drop_id)).await?;
            } else if input.clear_drop {
                claims::update_drop_player(&mut *conn, claim_id, None).await?;
            }

            let updated = claims::find_by_id(&mut *conn, claim_id)
                .await?
                .ok_or_else(|| WaiverError::not_found("claim not found"))?;

            let mut events = DeferredEvents::new();
            events.push(
                league_id,
                WaiverEvent::WaiverClaimUpdated {
                    claim: updated.clone(),
                },
            );
            Ok((updated, events))
        })
    })
    .await
}

// ---------------------------------------------------------------------------
// reorder_claims
// ---------------------------------------------------------------------------

/// Exact-permutation check for a reorder request: same length, no
/// duplicates, same id set as the current pending claims.
pub fn validate_reorder(current: &[i64], requested: &[i64]) -> Result<(), WaiverError> {
    if requested.len() != current.len() {
        return Err(WaiverError::validation(
            "reorder must include every pending claim exactly once",
        ));
    }

    let mut seen = std::collections::HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(WaiverError::validation("reorder contains duplicate claim ids"));
        }
    }

    let current_set: std::collections::HashSet<i64> = current.iter().copied().collect();
    if seen != current_set {
        return Err(WaiverError::validation(
            "reorder must include every pending claim exactly once",
        ));
    }

    Ok(())
}

pub async fn reorder_claims(
    pool: &PgPool,
    league_id: i64,
    user_id: i64,
    requested: Vec<i64>,
) -> Result<(Vec<WaiverClaim>, DeferredEvents), WaiverError> {
    claimable_week(pool, league_id).await?;

    let roster = leagues::find_roster_for_user(pool, league_id, user_id)
        .await?
        .ok_or_else(|| WaiverError::forbidden("you do not own a roster in this league"))?;

    run_with_lock(pool, LockDomain::Waiver, league_id, move |conn| {
        Box::pin(async move {
            let pending = claims::get_pending_by_roster(&mut *conn, roster.id).await?;
            let current: Vec<i64> = pending.iter().map(|c| c.id).collect();
            if let Err(err) = validate_reorder(&current, &requested) {
                return Err(err);
            }

            claims::reorder_claims(&mut *conn, roster.id, &requested).await?;
            let reordered = claims::get_pending_by_roster(&mut *conn, roster.id).await?;

            info!(league_id, roster_id = roster.id, "waiver claims reordered");

            let mut events = DeferredEvents::new();
            events.push(
                league_id,
                WaiverEvent::WaiverClaimsReordered {
                    roster_id: roster.id,
                    claim_ids: requested.clone(),
                },
            );
            Ok((reordered, events))
        })
    })
    .await
}

// ---------------------------------------------------------------------------
// cancel_claim
// ---------------------------------------------------------------------------

/// Cancel a pending claim. Deliberately has no pre-season gate, and the
/// status flip is conditional on `pending` so a cancel racing the processor
/// loses cleanly instead of resurrecting a settled claim.
pub async fn cancel_claim(
    pool: &PgPool,
    league_id: i64,
    user_id: i64,
    claim_id: i64,
) -> Result<(WaiverClaim, DeferredEvents), WaiverError> {
    owned_claim(pool, league_id, user_id, claim_id).await?;

    run_with_lock(pool, LockDomain::Waiver, league_id, move |conn| {
        Box::pin(async move {
            let cancelled = claims::cancel_if_pending(&mut *conn, claim_id).await?;
            if !cancelled {
                return Err(WaiverError::validation("claim is no longer pending"));
            }

            let claim = claims::find_by_id(&mut *conn, claim_id)
                .await?
                .ok_or_else(|| WaiverError::not_found("claim not found"))?;

            info!(league_id, claim_id, "waiver claim cancelled");

            let mut events = DeferredEvents::new();
            events.push(
                league_id,
                WaiverEvent::WaiverClaimCancelled {
                    claim: claim.clone(),
                },
            );
            Ok((claim, events))
        })
    })
    .await
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// The caller's pending claims in processing order.
pub async fn get_my_claims(
    pool: &PgPool,
    league_id: i64,
    user_id: i64,
) -> Result<Vec<WaiverClaim>, WaiverError> {
    let roster = leagues::find_roster_for_user(pool, league_id, user_id)
        .await?
        .ok_or_else(|| WaiverError::forbidden("you do not own a roster in this league"))?;

    Ok(claims::get_pending_by_roster(pool, roster.id).await?)
}

/// League-wide pending claims with live priorities (commissioner view).
pub async fn get_league_claims(
    pool: &PgPool,
    league_id: i64,
) -> Result<Vec<ClaimDetails>, WaiverError> {
    let league = leagues::find_league(pool, league_id)
        .await?
        .ok_or_else(|| WaiverError::not_found("league not found"))?;

    let Some(week) = league.current_week.filter(|w| *w > 0) else {
        return Ok(Vec::new());
    };

    Ok(
        claims::get_pending_by_league_with_current_priority(pool, league_id, league.season, week)
            .await?,
    )
}

#[cfg(test)]
mod tests {
    use super::validate_reorder;

    #[test]
    fn accepts_an_exact_permutation() {
        assert!(validate_reorder(&[1, 2, 3], &[3, 1, 2]).is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_reorder(&[1, 2, 3], &[1, 2]).is_err());
        assert!(validate_reorder(&[1, 2], &[1, 2, 3]).is_err());
    }

    #[test]
    fn rejects_duplicates_even_at_matching_length() {
        assert!(validate_reorder(&[1, 2, 3], &[1, 2, 2]).is_err());
    }

    #[test]
    fn rejects_foreign_claim_ids() {
        assert!(validate_reorder(&[1, 2, 3], &[1, 2, 9]).is_err());
    }

    #[test]
    fn empty_to_empty_is_fine() {
        assert!(validate_reorder(&[], &[]).is_ok());
    }
}
