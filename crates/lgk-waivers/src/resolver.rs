//! Round-based conflict resolution over a frozen claim snapshot.
//!
//! The loop is a deterministic function of the snapshot and the executor's
//! answers: rosters are visited in id order, player groups in player-id
//! order, and the comparator ends in a claim-id tiebreak. The executor is
//! the only effectful seam — Postgres in production, an in-memory stand-in
//! in tests — so every scenario in the test suite exercises exactly the
//! code that runs under the waiver lock.

use std::collections::BTreeMap;

use lgk_schemas::{WaiverClaim, WaiverType};
use tracing::warn;

use crate::compare::compare_claims;
use crate::state::ProcessingState;

// Failure reasons persisted to `waiver_claims.failure_reason` and surfaced
// in claim events.
pub const REASON_OUTBID: &str = "Outbid by another team";
pub const REASON_ALREADY_OWNED: &str = "Player already owned";
pub const REASON_DROP_GONE: &str = "Drop player no longer on roster";
pub const REASON_INSUFFICIENT_BUDGET: &str = "Insufficient FAAB budget";
pub const REASON_ROSTER_FULL: &str = "Roster full";
pub const REASON_SYSTEM_ERROR: &str = "System error during processing";
pub const REASON_UNRESOLVED: &str = "Claim was not reachable in any processing round";

// ---------------------------------------------------------------------------
// Executor seam
// ---------------------------------------------------------------------------

/// Why a single execution attempt failed.
#[derive(Debug)]
pub enum ExecuteError {
    /// The player was acquired concurrently by a roster outside this run;
    /// the next candidate in the group should be tried.
    OwnershipConflict,
    /// Anything else; the claim fails but the run continues.
    System(anyhow::Error),
}

/// Side effects recorded by a successful execution.
#[derive(Debug, Default)]
pub struct ClaimExecution {
    /// Open trades expired because they referenced a moved player.
    pub invalidated_trades: Vec<i64>,
}

/// Performs the execution steps for one winning candidate: drop, add,
/// ledger rows, budget/priority consequence, wire maintenance, trade
/// expiry. Implementations must leave the transaction usable after a
/// failure (savepoint semantics).
///
/// `rotate_to_last` is the resolver's standard-mode cue: false when the
/// winner already sits at the back of the line, where the rotation
/// statement would be a no-op and is skipped.
#[allow(async_fn_in_trait)]
pub trait ClaimExecutor {
    async fn execute_claim(
        &mut self,
        claim: &WaiverClaim,
        rotate_to_last: bool,
    ) -> Result<ClaimExecution, ExecuteError>;
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Successful { invalidated_trades: Vec<i64> },
    Failed { reason: String },
    Invalid { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub claim_id: i64,
    pub roster_id: i64,
    pub player_id: i64,
    pub resolution: Resolution,
}

impl ClaimOutcome {
    pub fn is_successful(&self) -> bool {
        matches!(self.resolution, Resolution::Successful { .. })
    }
}

// ---------------------------------------------------------------------------
// Per-claim validation
// ---------------------------------------------------------------------------

/// Validate one claim against current in-memory state. First failure
/// decides; `Ok` means the claim may compete for its player this round.
pub fn validate_claim(claim: &WaiverClaim, state: &ProcessingState) -> Result<(), &'static str> {
    let Some(roster) = state.rosters.get(&claim.roster_id) else {
        return Err(REASON_UNRESOLVED);
    };

    // Wire gate: an expired entry (or an unexpired one the claim predates)
    // admits the claim outright; otherwise cross-roster ownership blocks it.
    let wire_admits = match state.wire.get(&claim.player_id) {
        Some(expires) if *expires <= state.now => true,
        Some(expires) => claim.created_at < *expires,
        None => false,
    };
    if !wire_admits {
        if let Some(owner) = state.owned_by_league.get(&claim.player_id) {
            if *owner != claim.roster_id {
                return Err(REASON_ALREADY_OWNED);
            }
        }
    }

    if let Some(drop_id) = claim.drop_player_id {
        if !roster.owned_players.contains(&drop_id) {
            return Err(REASON_DROP_GONE);
        }
    }

    if state.waiver_type == WaiverType::Faab && claim.bid_amount > roster.remaining_budget {
        return Err(REASON_INSUFFICIENT_BUDGET);
    }

    if claim.drop_player_id.is_none() && roster.roster_count >= state.roster_size_limit {
        return Err(REASON_ROSTER_FULL);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Round loop
// ---------------------------------------------------------------------------

/// Resolve a snapshot of pending claims to terminal outcomes.
///
/// Each round: pick every roster's first unprocessed claim that survives
/// validation (invalidated ones are consumed in place, exposing the next),
/// group the survivors by target player, sort each group with the
/// comparator, execute candidates in order until one succeeds, and mark the
/// rest outbid. A round with zero processed claims ends the loop; whatever
/// is left is invalidated.
pub async fn resolve_claims<E: ClaimExecutor>(
    claims: &[WaiverClaim],
    state: &mut ProcessingState,
    executor: &mut E,
) -> Vec<ClaimOutcome> {
    // roster → claim indices in (claim_order, id) order
    let mut by_roster: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, claim) in claims.iter().enumerate() {
        by_roster.entry(claim.roster_id).or_default().push(idx);
    }
    for idxs in by_roster.values_mut() {
        idxs.sort_by_key(|&i| (claims[i].claim_order, claims[i].id));
    }

    let mut processed = vec![false; claims.len()];
    let mut outcomes: Vec<ClaimOutcome> = Vec::with_capacity(claims.len());

    loop {
        let mut progress = false;

        // a. / b. — active claim per roster, invalidating as we go
        let mut active: Vec<usize> = Vec::new();
        for idxs in by_roster.values() {
            for &idx in idxs {
                if processed[idx] {
                    continue;
                }
                let claim = &claims[idx];
                match validate_claim(claim, state) {
                    Err(reason) => {
                        processed[idx] = true;
                        progress = true;
                        outcomes.push(ClaimOutcome {
                            claim_id: claim.id,
                            roster_id: claim.roster_id,
                            player_id: claim.player_id,
                            resolution: Resolution::Invalid {
                                reason: reason.to_string(),
                            },
                        });
                        // same round: the roster's next claim is now exposed
                    }
                    Ok(()) => {
                        active.push(idx);
                        break;
                    }
                }
            }
        }

        // c. — group survivors by target player
        let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for idx in active {
            groups.entry(claims[idx].player_id).or_default().push(idx);
        }

        // d. / e. — per group: sort, execute candidates, settle the rest
        for (_player_id, mut group) in groups {
            group.sort_by(|&a, &b| {
                compare_claims(&claims[a], &claims[b], state.waiver_type, &state.rosters)
            });

            let mut won = false;
            for &idx in &group {
                let claim = &claims[idx];
                processed[idx] = true;
                progress = true;

                if won {
                    outcomes.push(ClaimOutcome {
                        claim_id: claim.id,
                        roster_id: claim.roster_id,
                        player_id: claim.player_id,
                        resolution: Resolution::Failed {
                            reason: REASON_OUTBID.to_string(),
                        },
                    });
                    continue;
                }

                let rotate_to_last = state.waiver_type == WaiverType::Standard
                    && state
                        .rosters
                        .get(&claim.roster_id)
                        .is_some_and(|r| r.current_priority < state.max_priority);

                match executor.execute_claim(claim, rotate_to_last).await {
                    Ok(execution) => {
                        state.apply_successful_claim(claim);
                        won = true;
                        outcomes.push(ClaimOutcome {
                            claim_id: claim.id,
                            roster_id: claim.roster_id,
                            player_id: claim.player_id,
                            resolution: Resolution::Successful {
                                invalidated_trades: execution.invalidated_trades,
                            },
                        });
                    }
                    Err(ExecuteError::OwnershipConflict) => {
                        // surfaced by a competing roster outside the run;
                        // the next candidate gets its shot
                        outcomes.push(ClaimOutcome {
                            claim_id: claim.id,
                            roster_id: claim.roster_id,
                            player_id: claim.player_id,
                            resolution: Resolution::Invalid {
                                reason: REASON_ALREADY_OWNED.to_string(),
                            },
                        });
                    }
                    Err(ExecuteError::System(err)) => {
                        warn!(claim_id = claim.id, error = %err, "claim execution failed");
                        outcomes.push(ClaimOutcome {
                            claim_id: claim.id,
                            roster_id: claim.roster_id,
                            player_id: claim.player_id,
                            resolution: Resolution::Failed {
                                reason: REASON_SYSTEM_ERROR.to_string(),
                            },
                        });
                    }
                }
            }
        }

        // f. — a barren round ends resolution
        if !progress {
            break;
        }
    }

    // Finalize: anything never reached becomes invalid with a diagnostic.
    for (idx, claim) in claims.iter().enumerate() {
        if !processed[idx] {
            outcomes.push(ClaimOutcome {
                claim_id: claim.id,
                roster_id: claim.roster_id,
                player_id: claim.player_id,
                resolution: Resolution::Invalid {
                    reason: REASON_UNRESOLVED.to_string(),
                },
            });
        }
    }

    outcomes
}
