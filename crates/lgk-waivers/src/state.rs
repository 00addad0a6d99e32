//! In-memory processing state for one league run.
//!
//! Owned exclusively by the task executing the processor; every mutation is
//! mirrored to the database by the executor in the same transaction, so the
//! in-memory view and the row state agree at commit.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use lgk_schemas::{WaiverClaim, WaiverType};

/// Live view of one roster while claims resolve.
#[derive(Clone, Debug)]
pub struct RosterProcessingState {
    pub roster_id: i64,
    pub current_priority: i32,
    pub remaining_budget: i32,
    pub owned_players: HashSet<i64>,
    pub roster_count: i32,
}

/// Everything the round loop consults, loaded once under the waiver lock.
#[derive(Clone, Debug)]
pub struct ProcessingState {
    pub waiver_type: WaiverType,
    pub roster_size_limit: i32,
    pub waiver_period_days: i32,
    /// N — the number of rosters holding a priority slot.
    pub max_priority: i32,
    pub now: DateTime<Utc>,
    pub rosters: HashMap<i64, RosterProcessingState>,
    /// player → owning roster, league-wide (includes rosters with no claims
    /// in this run).
    pub owned_by_league: HashMap<i64, i64>,
    /// player → wire expiry.
    pub wire: HashMap<i64, DateTime<Utc>>,
}

impl ProcessingState {
    /// Standard-mode rotation: the winner takes the last slot, everyone who
    /// was strictly behind it moves up one. The set stays a permutation of
    /// `1..=N`.
    pub fn rotate_to_last(&mut self, roster_id: i64) {
        let Some(previous) = self
            .rosters
            .get(&roster_id)
            .map(|r| r.current_priority)
        else {
            return;
        };
        for roster in self.rosters.values_mut() {
            if roster.current_priority > previous {
                roster.current_priority -= 1;
            }
        }
        if let Some(winner) = self.rosters.get_mut(&roster_id) {
            winner.current_priority = self.max_priority;
        }
    }

    /// Mirror a successful execution: ownership, wire, roster size, and the
    /// mode-specific priority/budget consequence.
    pub fn apply_successful_claim(&mut self, claim: &WaiverClaim) {
        if let Some(drop_id) = claim.drop_player_id {
            if let Some(roster) = self.rosters.get_mut(&claim.roster_id) {
                if roster.owned_players.remove(&drop_id) {
                    roster.roster_count -= 1;
                }
            }
            self.owned_by_league.remove(&drop_id);
            self.wire.insert(
                drop_id,
                self.now + Duration::days(i64::from(self.waiver_period_days)),
            );
        }

        if let Some(roster) = self.rosters.get_mut(&claim.roster_id) {
            roster.owned_players.insert(claim.player_id);
            roster.roster_count += 1;
        }
        self.owned_by_league.insert(claim.player_id, claim.roster_id);
        self.wire.remove(&claim.player_id);

        match self.waiver_type {
            WaiverType::Faab => {
                if let Some(roster) = self.rosters.get_mut(&claim.roster_id) {
                    roster.remaining_budget -= claim.bid_amount;
                }
            }
            WaiverType::Standard => self.rotate_to_last(claim.roster_id),
            WaiverType::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roster(roster_id: i64, priority: i32, owned: &[i64]) -> RosterProcessingState {
        RosterProcessingState {
            roster_id,
            current_priority: priority,
            remaining_budget: 100,
            owned_players: owned.iter().copied().collect(),
            roster_count: owned.len() as i32,
        }
    }

    fn state(waiver_type: WaiverType) -> ProcessingState {
        let rosters: HashMap<i64, RosterProcessingState> = [
            (1, roster(1, 1, &[50])),
            (2, roster(2, 2, &[])),
            (3, roster(3, 3, &[])),
        ]
        .into_iter()
        .collect();
        let owned_by_league = [(50_i64, 1_i64)].into_iter().collect();
        ProcessingState {
            waiver_type,
            roster_size_limit: 15,
            waiver_period_days: 2,
            max_priority: 3,
            now: Utc.with_ymd_and_hms(2024, 10, 2, 15, 0, 0).unwrap(),
            rosters,
            owned_by_league,
            wire: HashMap::new(),
        }
    }

    fn claim(roster_id: i64, player_id: i64, drop: Option<i64>) -> WaiverClaim {
        WaiverClaim {
            id: 1,
            league_id: 9,
            roster_id,
            player_id,
            drop_player_id: drop,
            bid_amount: 10,
            priority_at_claim: 1,
            status: lgk_schemas::ClaimStatus::Pending,
            season: 2024,
            week: 5,
            claim_order: 1,
            processing_run_id: None,
            idempotency_key: None,
            processed_at: None,
            failure_reason: None,
            created_at: Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn rotation_keeps_a_permutation() {
        let mut st = state(WaiverType::Standard);
        st.rotate_to_last(1);
        let mut priorities: Vec<i32> =
            st.rosters.values().map(|r| r.current_priority).collect();
        priorities.sort_unstable();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert_eq!(st.rosters[&1].current_priority, 3);
        assert_eq!(st.rosters[&2].current_priority, 1);
        assert_eq!(st.rosters[&3].current_priority, 2);
    }

    #[test]
    fn rotating_the_last_roster_changes_nothing() {
        let mut st = state(WaiverType::Standard);
        st.rotate_to_last(3);
        assert_eq!(st.rosters[&1].current_priority, 1);
        assert_eq!(st.rosters[&2].current_priority, 2);
        assert_eq!(st.rosters[&3].current_priority, 3);
    }

    #[test]
    fn successful_claim_with_drop_moves_ownership_and_wire() {
        let mut st = state(WaiverType::Faab);
        st.apply_successful_claim(&claim(1, 101, Some(50)));

        assert!(st.rosters[&1].owned_players.contains(&101));
        assert!(!st.rosters[&1].owned_players.contains(&50));
        assert_eq!(st.rosters[&1].roster_count, 1);
        assert_eq!(st.owned_by_league.get(&101), Some(&1));
        assert!(!st.owned_by_league.contains_key(&50));
        // dropped player lands on the wire, gated for waiver_period_days
        let expires = st.wire.get(&50).copied().unwrap();
        assert_eq!(expires, st.now + Duration::days(2));
        // FAAB mode deducts the bid in-memory
        assert_eq!(st.rosters[&1].remaining_budget, 90);
    }
}
