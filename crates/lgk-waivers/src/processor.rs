//! `process_league_claims` — one atomic league-week resolution.
//!
//! Invoked by the scheduler (or a commissioner). The whole run is a single
//! transaction under the league's waiver lock: the run row, the snapshot,
//! every roster mutation, and every status update commit together or not at
//! all. A rollback therefore also erases the run row, leaving the window
//! free for an immediate retry. Events buffer in-transaction and flush only
//! after commit.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use lgk_db::{
    budgets, claims, leagues, priority, roster_players, run_with_lock, runs, trades, transactions,
    wire, LockDomain,
};
use lgk_schemas::events::WaiverEvent;
use lgk_schemas::{
    ClaimStatus, League, ProcessSummary, TransactionType, WaiverClaim, WaiverType, WaiverWireEntry,
};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use crate::error::WaiverError;
use crate::events::{DeferredEvents, EventSink};
use crate::resolver::{
    resolve_claims, ClaimExecution, ClaimExecutor, ClaimOutcome, ExecuteError, Resolution,
};
use crate::state::{ProcessingState, RosterProcessingState};
use crate::window::processing_window_start;

// ---------------------------------------------------------------------------
// Postgres executor
// ---------------------------------------------------------------------------

/// Executes one winning candidate inside the surrounding transaction.
///
/// Each attempt runs inside a savepoint: a failed candidate (ownership
/// conflict or a constraint firing mid-add) rolls back to the savepoint and
/// leaves the transaction usable for the next candidate.
struct PgClaimExecutor<'a> {
    conn: &'a mut PgConnection,
    league: &'a League,
    week: i32,
    now: DateTime<Utc>,
}

impl PgClaimExecutor<'_> {
    async fn execute_inner(
        &mut self,
        claim: &WaiverClaim,
        rotate_to_last: bool,
    ) -> Result<ClaimExecution, ExecuteError> {
        let league = self.league;
        let season = league.season;
        let sys = ExecuteError::System;

        // 1. conditional drop: roster out, ledger row, onto the wire
        let mut drop_transaction_id = None;
        if let Some(drop_id) = claim.drop_player_id {
            roster_players::remove_player(&mut *self.conn, claim.roster_id, drop_id)
                .await
                .map_err(sys)?;
            let drop_tx = transactions::create(
                self.conn,
                &transactions::NewTransaction {
                    league_id: league.id,
                    roster_id: claim.roster_id,
                    player_id: drop_id,
                    kind: TransactionType::Drop,
                    season,
                    week: self.week,
                    related_transaction_id: None,
                    idempotency_key: Some(format!("waiver-claim-{}-drop", claim.id)),
                },
            )
            .await
            .map_err(sys)?;
            drop_transaction_id = Some(drop_tx.id);

            wire::add_player(
                &mut *self.conn,
                &WaiverWireEntry {
                    league_id: league.id,
                    player_id: drop_id,
                    dropped_by_roster_id: Some(claim.roster_id),
                    waiver_expires_at: self.now
                        + Duration::days(i64::from(league.settings.waiver_period_days)),
                    season,
                    week: self.week,
                },
            )
            .await
            .map_err(sys)?;
        }

        // 2. acquire the target; a lost race surfaces as OwnershipConflict
        match roster_players::add_player(
            &mut *self.conn,
            league.id,
            league.active_league_season_id,
            claim.roster_id,
            claim.player_id,
            "waiver",
        )
        .await
        {
            Ok(()) => {}
            Err(roster_players::RosterWriteError::OwnershipConflict) => {
                return Err(ExecuteError::OwnershipConflict)
            }
            Err(roster_players::RosterWriteError::Db(e)) => return Err(ExecuteError::System(e)),
        }

        // 3. ledger row for the add, linked to the drop
        transactions::create(
            self.conn,
            &transactions::NewTransaction {
                league_id: league.id,
                roster_id: claim.roster_id,
                player_id: claim.player_id,
                kind: TransactionType::Add,
                season,
                week: self.week,
                related_transaction_id: drop_transaction_id,
                idempotency_key: Some(format!("waiver-claim-{}-add", claim.id)),
            },
        )
        .await
        .map_err(sys)?;

        // 4. / 5. mode-specific consequence
        match league.settings.waiver_type {
            WaiverType::Faab => {
                let deducted = budgets::deduct_budget(
                    &mut *self.conn,
                    league.id,
                    claim.roster_id,
                    season,
                    claim.bid_amount,
                )
                .await
                .map_err(sys)?;
                if !deducted {
                    return Err(ExecuteError::System(anyhow::anyhow!(
                        "FAAB deduction found insufficient funds for claim {}",
                        claim.id
                    )));
                }
            }
            WaiverType::Standard => {
                if rotate_to_last {
                    priority::rotate_priority(self.conn, league.id, season, claim.roster_id)
                        .await
                        .map_err(sys)?;
                }
            }
            WaiverType::None => {}
        }

        // 6. the claimed player leaves the wire
        wire::remove_player(&mut *self.conn, league.id, claim.player_id)
            .await
            .map_err(sys)?;

        // 7. open trades referencing a moved player expire
        let mut moved = vec![claim.player_id];
        if let Some(drop_id) = claim.drop_player_id {
            moved.push(drop_id);
        }
        let invalidated_trades =
            trades::expire_trades_referencing(&mut *self.conn, league.id, &moved)
                .await
                .map_err(sys)?;

        Ok(ClaimExecution { invalidated_trades })
    }
}

impl ClaimExecutor for PgClaimExecutor<'_> {
    async fn execute_claim(
        &mut self,
        claim: &WaiverClaim,
        rotate_to_last: bool,
    ) -> Result<ClaimExecution, ExecuteError> {
        sqlx::query("savepoint claim_exec")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| ExecuteError::System(e.into()))?;

        match self.execute_inner(claim, rotate_to_last).await {
            Ok(execution) => {
                sqlx::query("release savepoint claim_exec")
                    .execute(&mut *self.conn)
                    .await
                    .map_err(|e| ExecuteError::System(e.into()))?;
                Ok(execution)
            }
            Err(err) => {
                if let Err(rollback_err) = sqlx::query("rollback to savepoint claim_exec")
                    .execute(&mut *self.conn)
                    .await
                {
                    warn!(claim_id = claim.id, error = %rollback_err, "savepoint rollback failed");
                }
                Err(err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// State loading
// ---------------------------------------------------------------------------

async fn load_processing_state(
    conn: &mut PgConnection,
    league: &League,
    snapshot: &[WaiverClaim],
    now: DateTime<Utc>,
) -> Result<ProcessingState, WaiverError> {
    let season = league.season;
    let faab = league.settings.waiver_type == WaiverType::Faab;

    // Lazily materialize priority/budget rows for every claiming roster, in
    // roster-id order so the last-place assignments are deterministic.
    let roster_ids: BTreeSet<i64> = snapshot.iter().map(|c| c.roster_id).collect();
    for &roster_id in &roster_ids {
        priority::ensure_roster_priority(&mut *conn, league.id, roster_id, season).await?;
        if faab {
            budgets::ensure_roster_budget(
                &mut *conn,
                league.id,
                roster_id,
                season,
                league.settings.faab_budget,
            )
            .await?;
        }
    }

    let priorities: HashMap<i64, i32> = priority::get_by_league(&mut *conn, league.id, season)
        .await?
        .into_iter()
        .map(|p| (p.roster_id, p.priority))
        .collect();
    let max_priority = priority::get_max_priority(&mut *conn, league.id, season).await?;

    let budget_map: HashMap<i64, i32> = if faab {
        budgets::get_by_league(&mut *conn, league.id, season)
            .await?
            .into_iter()
            .map(|b| (b.roster_id, b.remaining_budget))
            .collect()
    } else {
        HashMap::new()
    };

    let owned_by_league = roster_players::get_owned_player_map_by_league(
        &mut *conn,
        league.id,
        league.active_league_season_id,
    )
    .await?;

    let wire_map: HashMap<i64, DateTime<Utc>> = wire::get_by_league(&mut *conn, league.id)
        .await?
        .into_iter()
        .map(|entry| (entry.player_id, entry.waiver_expires_at))
        .collect();

    let mut rosters = HashMap::with_capacity(roster_ids.len());
    for &roster_id in &roster_ids {
        let owned_players = roster_players::get_player_ids_by_roster(&mut *conn, roster_id).await?;
        let roster_count = roster_players::get_player_count(&mut *conn, roster_id).await?;
        rosters.insert(
            roster_id,
            RosterProcessingState {
                roster_id,
                current_priority: priorities.get(&roster_id).copied().unwrap_or(max_priority),
                remaining_budget: budget_map.get(&roster_id).copied().unwrap_or(0),
                owned_players,
                roster_count,
            },
        );
    }

    Ok(ProcessingState {
        waiver_type: league.settings.waiver_type,
        roster_size_limit: league.settings.roster_size,
        waiver_period_days: league.settings.waiver_period_days,
        max_priority,
        now,
        rosters,
        owned_by_league,
        wire: wire_map,
    })
}

// ---------------------------------------------------------------------------
// Processor entry point
// ---------------------------------------------------------------------------

enum RunResult {
    /// Another run already owns this window.
    Duplicate,
    Ran {
        summary: ProcessSummary,
        events: DeferredEvents,
    },
}

fn outcome_status(outcome: &ClaimOutcome) -> (ClaimStatus, Option<&str>) {
    match &outcome.resolution {
        Resolution::Successful { .. } => (ClaimStatus::Successful, None),
        Resolution::Failed { reason } => (ClaimStatus::Failed, Some(reason.as_str())),
        Resolution::Invalid { reason } => (ClaimStatus::Invalid, Some(reason.as_str())),
    }
}

/// Resolve every snapshotted pending claim for the league's current week.
///
/// Returns `{0, 0}` without touching claims when waivers are disabled, the
/// league is in pre-season, or another run already owns this hour window.
pub async fn process_league_claims(
    pool: &PgPool,
    sink: Option<&dyn EventSink>,
    league_id: i64,
    now: DateTime<Utc>,
) -> Result<ProcessSummary, WaiverError> {
    let league = leagues::find_league(pool, league_id)
        .await?
        .ok_or_else(|| WaiverError::not_found("league not found"))?;

    if league.settings.waiver_type == WaiverType::None {
        return Ok(ProcessSummary::default());
    }
    let Some(week) = league.current_week.filter(|w| *w > 0) else {
        return Ok(ProcessSummary::default());
    };

    let window_start_at = processing_window_start(now, league.settings.timezone.as_deref());

    let result = run_with_lock(pool, LockDomain::Waiver, league_id, move |conn| {
        Box::pin(async move {
            let season = league.season;

            // 1. run de-duplication: the unique window index arbitrates
            let Some(run) =
                runs::try_create(&mut *conn, league.id, season, week, window_start_at).await?
            else {
                return Ok::<RunResult, WaiverError>(RunResult::Duplicate);
            };

            // 2. freeze the snapshot
            let found =
                claims::snapshot_claims_for_processing_run(&mut *conn, league.id, season, week, run.id)
                    .await? as i32;
            let snapshot = claims::get_pending_by_processing_run(&mut *conn, run.id).await?;

            // 3. load state
            let mut state = load_processing_state(&mut *conn, &league, &snapshot, now).await?;

            // 4. rounds
            let outcomes = {
                let mut executor = PgClaimExecutor {
                    conn: &mut *conn,
                    league: &league,
                    week,
                    now,
                };
                resolve_claims(&snapshot, &mut state, &mut executor).await
            };

            // 5. finalize: statuses, run counters
            for outcome in &outcomes {
                let (status, reason) = outcome_status(outcome);
                claims::update_status(&mut *conn, outcome.claim_id, status, reason).await?;
            }
            let successful = outcomes.iter().filter(|o| o.is_successful()).count() as i32;
            runs::update_results(&mut *conn, run.id, found, successful).await?;

            let summary = ProcessSummary {
                processed: found,
                successful,
            };

            let events = build_events(&league, &snapshot, &outcomes, summary, &mut *conn).await?;

            info!(
                league_id = league.id,
                season,
                week,
                processed = summary.processed,
                successful = summary.successful,
                "waiver run complete"
            );

            Ok(RunResult::Ran { summary, events })
        })
    })
    .await?;

    match result {
        RunResult::Duplicate => Ok(ProcessSummary::default()),
        RunResult::Ran { summary, events } => {
            events.flush(sink);
            Ok(summary)
        }
    }
}

/// Queue the post-commit event batch: per-claim outcomes, mode-specific
/// priority/budget summaries when anything succeeded, trade invalidations,
/// and the run summary.
async fn build_events(
    league: &League,
    snapshot: &[WaiverClaim],
    outcomes: &[ClaimOutcome],
    summary: ProcessSummary,
    conn: &mut PgConnection,
) -> Result<DeferredEvents, WaiverError> {
    let mut events = DeferredEvents::new();
    let by_id: HashMap<i64, &WaiverClaim> = snapshot.iter().map(|c| (c.id, c)).collect();

    for outcome in outcomes {
        let Some(&claim) = by_id.get(&outcome.claim_id) else {
            continue;
        };
        let (status, reason) = outcome_status(outcome);
        let mut settled = claim.clone();
        settled.status = status;
        settled.failure_reason = reason.map(str::to_string);

        match &outcome.resolution {
            Resolution::Successful { invalidated_trades } => {
                events.push(
                    league.id,
                    WaiverEvent::WaiverClaimSuccessful { claim: settled },
                );
                for &trade_id in invalidated_trades {
                    events.push(league.id, WaiverEvent::TradeInvalidated { trade_id });
                }
            }
            Resolution::Failed { .. } | Resolution::Invalid { .. } => {
                events.push(league.id, WaiverEvent::WaiverClaimFailed { claim: settled });
            }
        }
    }

    if summary.successful > 0 {
        match league.settings.waiver_type {
            WaiverType::Standard => {
                let priorities =
                    priority::get_by_league(&mut *conn, league.id, league.season).await?;
                events.push(league.id, WaiverEvent::WaiverPriorityUpdated { priorities });
            }
            WaiverType::Faab => {
                let budgets = budgets::get_by_league(&mut *conn, league.id, league.season).await?;
                events.push(league.id, WaiverEvent::WaiverBudgetUpdated { budgets });
            }
            WaiverType::None => {}
        }
    }

    events.push(league.id, WaiverEvent::WaiverProcessed { summary });
    Ok(events)
}
