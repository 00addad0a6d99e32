//! Scenario: FAAB Bid Supersedes Priority
//!
//! # Invariant under test
//! In FAAB mode the higher bid wins even against a better waiver priority;
//! the winner's budget is debited by exactly the bid and nobody's priority
//! rotates.
//!
//! All tests are pure in-process; no DB or network required.

use lgk_schemas::WaiverType;
use lgk_testkit::{league_fixture, pending_claim, RosterSeed};
use lgk_waivers::resolver::{resolve_claims, Resolution, REASON_OUTBID};

#[tokio::test]
async fn higher_bid_beats_better_priority() {
    let (mut state, mut executor) = league_fixture(
        WaiverType::Faab,
        &[
            RosterSeed::new(1, 1).budget(100), // better priority, lower bid
            RosterSeed::new(2, 2).budget(100),
        ],
    );

    let mut a_x = pending_claim(10, 1, 500, 1);
    a_x.bid_amount = 50;
    let mut b_x = pending_claim(20, 2, 500, 1);
    b_x.bid_amount = 60;

    let claims = vec![a_x, b_x];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert!(outcomes.iter().find(|o| o.claim_id == 20).unwrap().is_successful());
    assert_eq!(
        outcomes.iter().find(|o| o.claim_id == 10).unwrap().resolution,
        Resolution::Failed {
            reason: REASON_OUTBID.to_string()
        }
    );

    assert_eq!(executor.owned.get(&500), Some(&2));
    assert_eq!(executor.deductions, vec![(2, 60)]);
    assert!(executor.rotations.is_empty(), "FAAB never rotates priority");
    assert_eq!(state.rosters[&2].remaining_budget, 40);
    assert_eq!(state.rosters[&1].remaining_budget, 100, "losers keep their budget");
}

#[tokio::test]
async fn an_earlier_spent_budget_constrains_the_next_round() {
    // Roster 1 wins player 500 for 80, leaving 20; its second claim bids 30
    // and must be invalidated for insufficient budget.
    let (mut state, mut executor) =
        league_fixture(WaiverType::Faab, &[RosterSeed::new(1, 1).budget(100)]);

    let mut first = pending_claim(10, 1, 500, 1);
    first.bid_amount = 80;
    let mut second = pending_claim(11, 1, 501, 2);
    second.bid_amount = 30;

    let claims = vec![first, second];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert!(outcomes.iter().find(|o| o.claim_id == 10).unwrap().is_successful());
    assert!(matches!(
        &outcomes.iter().find(|o| o.claim_id == 11).unwrap().resolution,
        Resolution::Invalid { reason } if reason == "Insufficient FAAB budget"
    ));
    assert_eq!(executor.total_deducted(), 80);
}
