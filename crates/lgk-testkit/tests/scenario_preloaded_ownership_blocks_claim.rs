//! Scenario: Preloaded Ownership Blocks A Claim Without Touching The Roster
//!
//! # Invariant under test
//! The processor preloads the league's full owned-player set, so a claim
//! for a player owned by a roster with no claims in the run is invalidated
//! as "Player already owned" during validation — the executor (and thus
//! `add_player`) is never invoked for it.
//!
//! All tests are pure in-process; no DB or network required.

use lgk_schemas::WaiverType;
use lgk_testkit::{league_fixture, pending_claim, RosterSeed};
use lgk_waivers::resolver::{resolve_claims, Resolution, REASON_ALREADY_OWNED};

#[tokio::test]
async fn claim_for_a_preloaded_owned_player_never_reaches_execution() {
    let (mut state, mut executor) =
        league_fixture(WaiverType::Faab, &[RosterSeed::new(1, 1).budget(100)]);

    // player 777 is owned by roster 9, which has no claims in this run
    state.owned_by_league.insert(777, 9);
    executor.seed_outside_owner(777, 9);

    let mut claim = pending_claim(10, 1, 777, 1);
    claim.bid_amount = 25;

    let claims = vec![claim];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert_eq!(
        outcomes[0].resolution,
        Resolution::Invalid {
            reason: REASON_ALREADY_OWNED.to_string()
        }
    );
    assert!(
        executor.attempts.is_empty(),
        "validation must block the claim before any add_player attempt"
    );
    assert!(executor.transactions.is_empty());
    assert_eq!(executor.total_deducted(), 0);
}

#[tokio::test]
async fn a_race_lost_at_execution_falls_through_to_the_next_candidate() {
    // Ownership appears only on the executor side (a roster outside the run
    // acquired the player after the preload). The first candidate hits the
    // conflict at execution; the second candidate must then be tried.
    let (mut state, mut executor) = league_fixture(
        WaiverType::Faab,
        &[
            RosterSeed::new(1, 1).budget(100),
            RosterSeed::new(2, 2).budget(100),
        ],
    );

    let mut a_x = pending_claim(10, 1, 500, 1);
    a_x.bid_amount = 60;
    let mut b_x = pending_claim(20, 2, 500, 1);
    b_x.bid_amount = 40;

    // concurrent mutation invisible to the preload: roster 9 owns 500
    executor.seed_outside_owner(500, 9);

    let claims = vec![a_x, b_x];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    // both candidates were tried in bid order, both lost to the outside owner
    assert_eq!(executor.attempts, vec![10, 20]);
    for outcome in &outcomes {
        assert_eq!(
            outcome.resolution,
            Resolution::Invalid {
                reason: REASON_ALREADY_OWNED.to_string()
            }
        );
    }
    assert_eq!(executor.owned.get(&500), Some(&9));
}
