//! In-process stand-ins for the waiver engine's collaborators.
//!
//! The resolver's only effectful seam is `ClaimExecutor`; [`MemoryExecutor`]
//! implements it over plain maps with the same observable behavior as the
//! Postgres executor (ownership arbitration, ledger rows, rotation/deduction
//! recording, fault injection). Scenario tests under `tests/` drive the real
//! round loop against these stand-ins — no database or network required.

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use chrono::{DateTime, TimeZone, Utc};
use lgk_schemas::{ClaimStatus, TransactionType, WaiverClaim, WaiverType};
use lgk_waivers::resolver::{ClaimExecution, ClaimExecutor, ExecuteError};
use lgk_waivers::state::{ProcessingState, RosterProcessingState};

// ---------------------------------------------------------------------------
// Fixture time
// ---------------------------------------------------------------------------

/// The instant "processing happens" in scenario tests.
pub fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 2, 15, 0, 0).unwrap()
}

/// When fixture claims were submitted (well before [`run_time`]).
pub fn submit_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 9, 30, 0).unwrap()
}

// ---------------------------------------------------------------------------
// League fixture
// ---------------------------------------------------------------------------

/// Seed for one roster in a fixture league.
#[derive(Clone, Debug)]
pub struct RosterSeed {
    pub roster_id: i64,
    pub priority: i32,
    pub budget: i32,
    pub owned: Vec<i64>,
}

impl RosterSeed {
    pub fn new(roster_id: i64, priority: i32) -> Self {
        Self {
            roster_id,
            priority,
            budget: 100,
            owned: Vec::new(),
        }
    }

    pub fn budget(mut self, budget: i32) -> Self {
        self.budget = budget;
        self
    }

    pub fn owns(mut self, players: &[i64]) -> Self {
        self.owned = players.to_vec();
        self
    }
}

/// Build the paired in-memory state and executor for one league run. Both
/// views of ownership start identical, as they would after the processor's
/// preload.
pub fn league_fixture(
    waiver_type: WaiverType,
    seeds: &[RosterSeed],
) -> (ProcessingState, MemoryExecutor) {
    let mut rosters = HashMap::new();
    let mut owned_by_league = HashMap::new();

    for seed in seeds {
        for &player in &seed.owned {
            owned_by_league.insert(player, seed.roster_id);
        }
        rosters.insert(
            seed.roster_id,
            RosterProcessingState {
                roster_id: seed.roster_id,
                current_priority: seed.priority,
                remaining_budget: seed.budget,
                owned_players: seed.owned.iter().copied().collect(),
                roster_count: seed.owned.len() as i32,
            },
        );
    }

    let state = ProcessingState {
        waiver_type,
        roster_size_limit: 15,
        waiver_period_days: 2,
        max_priority: seeds.iter().map(|s| s.priority).max().unwrap_or(0),
        now: run_time(),
        rosters,
        owned_by_league: owned_by_league.clone(),
        wire: HashMap::new(),
    };

    let executor = MemoryExecutor::new(waiver_type, owned_by_league);
    (state, executor)
}

/// A pending claim with fixture defaults; adjust fields directly for the
/// scenario at hand.
pub fn pending_claim(id: i64, roster_id: i64, player_id: i64, claim_order: i32) -> WaiverClaim {
    WaiverClaim {
        id,
        league_id: 1,
        roster_id,
        player_id,
        drop_player_id: None,
        bid_amount: 0,
        priority_at_claim: 1,
        status: ClaimStatus::Pending,
        season: 2024,
        week: 5,
        claim_order,
        processing_run_id: Some(1),
        idempotency_key: None,
        processed_at: None,
        failure_reason: None,
        created_at: submit_time(),
        updated_at: submit_time(),
    }
}

// ---------------------------------------------------------------------------
// MemoryExecutor
// ---------------------------------------------------------------------------

/// A ledger entry recorded by [`MemoryExecutor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutedTransaction {
    pub roster_id: i64,
    pub player_id: i64,
    pub kind: TransactionType,
}

/// In-memory `ClaimExecutor`: arbitrates ownership like the database unique
/// index would and records every side effect for assertions.
pub struct MemoryExecutor {
    waiver_type: WaiverType,
    /// Authoritative ownership (player → roster), including rosters with no
    /// claims in the run.
    pub owned: HashMap<i64, i64>,
    /// Claim ids in execution-attempt order.
    pub attempts: Vec<i64>,
    pub transactions: Vec<ExecutedTransaction>,
    /// Rosters whose priority rotated to last, in order.
    pub rotations: Vec<i64>,
    /// `(roster_id, amount)` FAAB deductions, in order.
    pub deductions: Vec<(i64, i32)>,
    pub wire_added: Vec<i64>,
    pub wire_removed: Vec<i64>,
    /// player → open trade ids to expire when that player moves.
    pub pending_trades_by_player: HashMap<i64, Vec<i64>>,
    /// Player ids whose next add attempt fails with a generic error.
    pub fail_add_once_for: HashSet<i64>,
}

impl MemoryExecutor {
    pub fn new(waiver_type: WaiverType, owned: HashMap<i64, i64>) -> Self {
        Self {
            waiver_type,
            owned,
            attempts: Vec::new(),
            transactions: Vec::new(),
            rotations: Vec::new(),
            deductions: Vec::new(),
            wire_added: Vec::new(),
            wire_removed: Vec::new(),
            pending_trades_by_player: HashMap::new(),
            fail_add_once_for: HashSet::new(),
        }
    }

    /// Simulate a concurrent acquisition by an actor outside the run.
    pub fn seed_outside_owner(&mut self, player_id: i64, roster_id: i64) {
        self.owned.insert(player_id, roster_id);
    }

    /// Inject a one-shot generic failure for the player's add.
    pub fn fail_next_add(&mut self, player_id: i64) {
        self.fail_add_once_for.insert(player_id);
    }

    pub fn open_trade(&mut self, player_id: i64, trade_id: i64) {
        self.pending_trades_by_player
            .entry(player_id)
            .or_default()
            .push(trade_id);
    }

    /// Total FAAB spent across all recorded deductions.
    pub fn total_deducted(&self) -> i32 {
        self.deductions.iter().map(|(_, amount)| amount).sum()
    }
}

impl ClaimExecutor for MemoryExecutor {
    async fn execute_claim(
        &mut self,
        claim: &WaiverClaim,
        rotate_to_last: bool,
    ) -> Result<ClaimExecution, ExecuteError> {
        self.attempts.push(claim.id);

        if self.fail_add_once_for.remove(&claim.player_id) {
            return Err(ExecuteError::System(anyhow!(
                "injected add failure for player {}",
                claim.player_id
            )));
        }

        // the unique-index arbitration the Postgres executor hits on insert
        if let Some(owner) = self.owned.get(&claim.player_id) {
            if *owner != claim.roster_id {
                return Err(ExecuteError::OwnershipConflict);
            }
        }

        if let Some(drop_id) = claim.drop_player_id {
            self.owned.remove(&drop_id);
            self.transactions.push(ExecutedTransaction {
                roster_id: claim.roster_id,
                player_id: drop_id,
                kind: TransactionType::Drop,
            });
            self.wire_added.push(drop_id);
        }

        self.owned.insert(claim.player_id, claim.roster_id);
        self.transactions.push(ExecutedTransaction {
            roster_id: claim.roster_id,
            player_id: claim.player_id,
            kind: TransactionType::Add,
        });

        match self.waiver_type {
            WaiverType::Faab => self.deductions.push((claim.roster_id, claim.bid_amount)),
            WaiverType::Standard => {
                if rotate_to_last {
                    self.rotations.push(claim.roster_id);
                }
            }
            WaiverType::None => {}
        }

        self.wire_removed.push(claim.player_id);

        // open trades referencing either moved player expire
        let mut invalidated_trades = self
            .pending_trades_by_player
            .remove(&claim.player_id)
            .unwrap_or_default();
        if let Some(drop_id) = claim.drop_player_id {
            invalidated_trades.extend(
                self.pending_trades_by_player
                    .remove(&drop_id)
                    .unwrap_or_default(),
            );
        }
        invalidated_trades.sort_unstable();

        Ok(ClaimExecution { invalidated_trades })
    }
}
