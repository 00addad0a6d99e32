//! Claim comparator — the canonical total order over competing claims.
//!
//! The order is strict: after bids (FAAB only), live priority, and
//! submission time, the claim id breaks any remaining tie, so identical
//! inputs always resolve identically regardless of worker or wall clock.

use std::cmp::Ordering;
use std::collections::HashMap;

use lgk_schemas::{WaiverClaim, WaiverType};

use crate::state::RosterProcessingState;

/// Compare two claims for the same player. `Ordering::Less` means `a` wins
/// ahead of `b`.
///
/// FAAB: higher bid, then lower live priority, then earlier `created_at`,
/// then lower id. Standard: lower live priority, then earlier `created_at`,
/// then lower id. Live priorities come from `rosters`; a roster missing
/// there falls back to its submit-time snapshot.
pub fn compare_claims(
    a: &WaiverClaim,
    b: &WaiverClaim,
    waiver_type: WaiverType,
    rosters: &HashMap<i64, RosterProcessingState>,
) -> Ordering {
    let live_priority = |claim: &WaiverClaim| -> i32 {
        rosters
            .get(&claim.roster_id)
            .map_or(claim.priority_at_claim, |r| r.current_priority)
    };

    if waiver_type == WaiverType::Faab {
        let bid = b.bid_amount.cmp(&a.bid_amount); // higher bid first
        if bid != Ordering::Equal {
            return bid;
        }
    }

    let priority = live_priority(a).cmp(&live_priority(b));
    if priority != Ordering::Equal {
        return priority;
    }

    let submitted = a.created_at.cmp(&b.created_at);
    if submitted != Ordering::Equal {
        return submitted;
    }

    a.id.cmp(&b.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lgk_schemas::ClaimStatus;
    use std::collections::HashSet;

    fn claim(id: i64, roster_id: i64, bid: i32) -> WaiverClaim {
        WaiverClaim {
            id,
            league_id: 1,
            roster_id,
            player_id: 10,
            drop_player_id: None,
            bid_amount: bid,
            priority_at_claim: roster_id as i32,
            status: ClaimStatus::Pending,
            season: 2024,
            week: 3,
            claim_order: 1,
            processing_run_id: None,
            idempotency_key: None,
            processed_at: None,
            failure_reason: None,
            created_at: Utc.with_ymd_and_hms(2024, 9, 18, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 9, 18, 12, 0, 0).unwrap(),
        }
    }

    fn rosters(priorities: &[(i64, i32)]) -> HashMap<i64, RosterProcessingState> {
        priorities
            .iter()
            .map(|&(roster_id, priority)| {
                (
                    roster_id,
                    RosterProcessingState {
                        roster_id,
                        current_priority: priority,
                        remaining_budget: 100,
                        owned_players: HashSet::new(),
                        roster_count: 0,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn faab_higher_bid_wins_over_better_priority() {
        let map = rosters(&[(1, 1), (2, 2)]);
        let a = claim(100, 1, 50);
        let b = claim(200, 2, 60);
        assert_eq!(
            compare_claims(&b, &a, WaiverType::Faab, &map),
            Ordering::Less
        );
    }

    #[test]
    fn faab_equal_bids_fall_back_to_live_priority() {
        let map = rosters(&[(1, 2), (2, 1)]);
        let a = claim(100, 1, 50);
        let b = claim(200, 2, 50);
        // roster 2 holds the better live priority
        assert_eq!(
            compare_claims(&b, &a, WaiverType::Faab, &map),
            Ordering::Less
        );
    }

    #[test]
    fn identical_bids_priorities_and_times_resolve_by_id() {
        let map = rosters(&[(1, 1), (2, 1)]);
        let a = claim(100, 1, 50);
        let b = claim(200, 2, 50);
        assert_eq!(
            compare_claims(&a, &b, WaiverType::Faab, &map),
            Ordering::Less
        );
        assert_eq!(
            compare_claims(&b, &a, WaiverType::Faab, &map),
            Ordering::Greater
        );
    }

    #[test]
    fn standard_ignores_bids_entirely() {
        let map = rosters(&[(1, 1), (2, 2)]);
        let a = claim(100, 1, 0);
        let b = claim(200, 2, 999);
        assert_eq!(
            compare_claims(&a, &b, WaiverType::Standard, &map),
            Ordering::Less
        );
    }

    #[test]
    fn earlier_submission_beats_later_on_equal_priority() {
        let map = rosters(&[(1, 1), (2, 1)]);
        let a = claim(100, 1, 0);
        let mut b = claim(200, 2, 0);
        b.created_at = Utc.with_ymd_and_hms(2024, 9, 18, 12, 0, 1).unwrap();
        assert_eq!(
            compare_claims(&a, &b, WaiverType::Standard, &map),
            Ordering::Less
        );
    }

    #[test]
    fn missing_roster_state_falls_back_to_snapshot_priority() {
        let map = rosters(&[(2, 5)]);
        let a = claim(100, 1, 0); // priority_at_claim = 1
        let b = claim(200, 2, 0); // live priority = 5
        assert_eq!(
            compare_claims(&a, &b, WaiverType::Standard, &map),
            Ordering::Less
        );
    }
}
