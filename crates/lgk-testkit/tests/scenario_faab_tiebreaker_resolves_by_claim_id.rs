//! Scenario: FAAB Tiebreaker Resolves By Claim Id
//!
//! # Invariant under test
//! When two claims for the same player carry identical bids, identical live
//! priorities, and identical submission times, the lower claim id wins and
//! the loser fails with "Outbid by another team". The id tiebreak is what
//! guarantees determinism under fully tied inputs.
//!
//! All tests are pure in-process; no DB or network required.

use lgk_schemas::WaiverType;
use lgk_testkit::{league_fixture, pending_claim, RosterSeed};
use lgk_waivers::resolver::{resolve_claims, Resolution, REASON_OUTBID};

#[tokio::test]
async fn tied_bids_resolve_to_the_lower_claim_id() {
    let (mut state, mut executor) = league_fixture(
        WaiverType::Faab,
        &[
            RosterSeed::new(1, 1).budget(100),
            RosterSeed::new(2, 1).budget(100),
        ],
    );

    let mut first = pending_claim(100, 1, 10, 1);
    first.bid_amount = 50;
    let mut second = pending_claim(200, 2, 10, 1);
    second.bid_amount = 50;
    // identical created_at comes from the fixture defaults

    let claims = vec![first, second];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert_eq!(outcomes.len(), 2);

    let winner = outcomes.iter().find(|o| o.claim_id == 100).unwrap();
    assert!(
        winner.is_successful(),
        "claim 100 must win the tie: {:?}",
        winner.resolution
    );

    let loser = outcomes.iter().find(|o| o.claim_id == 200).unwrap();
    assert_eq!(
        loser.resolution,
        Resolution::Failed {
            reason: REASON_OUTBID.to_string()
        }
    );

    // exactly one execution attempt reached the winner's roster
    assert_eq!(executor.owned.get(&10), Some(&1));
    assert_eq!(executor.total_deducted(), 50);
}

#[tokio::test]
async fn swapping_ids_swaps_the_winner() {
    let (mut state, mut executor) = league_fixture(
        WaiverType::Faab,
        &[
            RosterSeed::new(1, 1).budget(100),
            RosterSeed::new(2, 1).budget(100),
        ],
    );

    // same setup, but roster 2 happened to submit first and got the lower id
    let mut first = pending_claim(100, 2, 10, 1);
    first.bid_amount = 50;
    let mut second = pending_claim(200, 1, 10, 1);
    second.bid_amount = 50;

    let claims = vec![first, second];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert!(outcomes.iter().any(|o| o.claim_id == 100 && o.is_successful()));
    assert_eq!(executor.owned.get(&10), Some(&2));
}
