//! Scenario: Standard Priority Rotates Between Rounds
//!
//! # Invariant under test
//! Standard-mode round resolution: the best-priority roster wins the
//! contested player and rotates to the back of the line before the next
//! round; an uncontested win while already last skips the rotation
//! statement entirely, so the rotation is invoked exactly once here. The
//! league's priority set stays a permutation of `1..=N` throughout.
//!
//! All tests are pure in-process; no DB or network required.

use lgk_schemas::WaiverType;
use lgk_testkit::{league_fixture, pending_claim, RosterSeed};
use lgk_waivers::resolver::{resolve_claims, Resolution, REASON_OUTBID};

#[tokio::test]
async fn winner_rotates_then_wins_its_second_claim_without_rotating_again() {
    // Roster A (priority 1) claims X then Y; roster B (priority 2) claims X.
    let (mut state, mut executor) = league_fixture(
        WaiverType::Standard,
        &[RosterSeed::new(1, 1), RosterSeed::new(2, 2)],
    );

    let a_x = pending_claim(10, 1, 500, 1);
    let a_y = pending_claim(11, 1, 501, 2);
    let b_x = pending_claim(20, 2, 500, 1);

    let claims = vec![a_x, a_y, b_x];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    // Round 1: A wins X on priority, B is outbid. Round 2: A wins Y.
    assert!(outcomes.iter().find(|o| o.claim_id == 10).unwrap().is_successful());
    assert_eq!(
        outcomes.iter().find(|o| o.claim_id == 20).unwrap().resolution,
        Resolution::Failed {
            reason: REASON_OUTBID.to_string()
        }
    );
    assert!(outcomes.iter().find(|o| o.claim_id == 11).unwrap().is_successful());

    // A rotated to last after winning X; winning Y while already last is a
    // no-op and must not issue a second rotation.
    assert_eq!(executor.rotations, vec![1]);

    // priorities remain a permutation of 1..=2 with A now last
    let mut priorities: Vec<i32> = state
        .rosters
        .values()
        .map(|r| r.current_priority)
        .collect();
    priorities.sort_unstable();
    assert_eq!(priorities, vec![1, 2]);
    assert_eq!(state.rosters[&1].current_priority, 2);
    assert_eq!(state.rosters[&2].current_priority, 1);
}

#[tokio::test]
async fn rotation_hands_the_next_contested_player_to_the_other_roster() {
    // Both rosters claim X first and Y second. After A takes X and rotates,
    // B holds the better priority and must take Y.
    let (mut state, mut executor) = league_fixture(
        WaiverType::Standard,
        &[RosterSeed::new(1, 1), RosterSeed::new(2, 2)],
    );

    let a_x = pending_claim(10, 1, 500, 1);
    let a_y = pending_claim(11, 1, 501, 2);
    let b_x = pending_claim(20, 2, 500, 1);
    let b_y = pending_claim(21, 2, 501, 2);

    let claims = vec![a_x, a_y, b_x, b_y];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert!(outcomes.iter().find(|o| o.claim_id == 10).unwrap().is_successful());
    assert!(outcomes.iter().find(|o| o.claim_id == 21).unwrap().is_successful());
    assert!(!outcomes.iter().find(|o| o.claim_id == 20).unwrap().is_successful());
    assert!(!outcomes.iter().find(|o| o.claim_id == 11).unwrap().is_successful());

    // one rotation per contested win, alternating rosters
    assert_eq!(executor.rotations, vec![1, 2]);
}
