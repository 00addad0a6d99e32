//! Scenario: A System Error Fails One Claim, Not The Run
//!
//! # Invariant under test
//! A generic error raised while executing a single claim (e.g. a constraint
//! firing during the add) is caught at the per-claim level: that claim
//! fails with "System error during processing" and resolution continues —
//! independent claims in the same run still succeed.
//!
//! All tests are pure in-process; no DB or network required.

use lgk_schemas::WaiverType;
use lgk_testkit::{league_fixture, pending_claim, RosterSeed};
use lgk_waivers::resolver::{resolve_claims, Resolution, REASON_SYSTEM_ERROR};

#[tokio::test]
async fn injected_failure_is_contained_to_its_claim() {
    let (mut state, mut executor) = league_fixture(
        WaiverType::Faab,
        &[
            RosterSeed::new(1, 1).budget(100),
            RosterSeed::new(2, 2).budget(100),
        ],
    );

    let mut poisoned = pending_claim(1, 1, 500, 1);
    poisoned.bid_amount = 10;
    let mut healthy = pending_claim(2, 2, 501, 1);
    healthy.bid_amount = 10;

    executor.fail_next_add(500);

    let claims = vec![poisoned, healthy];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert_eq!(
        outcomes.iter().find(|o| o.claim_id == 1).unwrap().resolution,
        Resolution::Failed {
            reason: REASON_SYSTEM_ERROR.to_string()
        }
    );
    assert!(outcomes.iter().find(|o| o.claim_id == 2).unwrap().is_successful());

    // the failed claim left no trace on ownership or budgets
    assert!(!executor.owned.contains_key(&500));
    assert_eq!(executor.owned.get(&501), Some(&2));
    assert_eq!(executor.deductions, vec![(2, 10)]);
}

#[tokio::test]
async fn failure_of_the_top_candidate_lets_the_next_one_win() {
    // Both rosters want player 500; the higher bid blows up at execution,
    // the runner-up must take the player.
    let (mut state, mut executor) = league_fixture(
        WaiverType::Faab,
        &[
            RosterSeed::new(1, 1).budget(100),
            RosterSeed::new(2, 2).budget(100),
        ],
    );

    let mut a_x = pending_claim(1, 1, 500, 1);
    a_x.bid_amount = 90;
    let mut b_x = pending_claim(2, 2, 500, 1);
    b_x.bid_amount = 10;

    executor.fail_next_add(500); // one-shot: only the first attempt fails

    let claims = vec![a_x, b_x];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert_eq!(
        outcomes.iter().find(|o| o.claim_id == 1).unwrap().resolution,
        Resolution::Failed {
            reason: REASON_SYSTEM_ERROR.to_string()
        }
    );
    assert!(outcomes.iter().find(|o| o.claim_id == 2).unwrap().is_successful());
    assert_eq!(executor.attempts, vec![1, 2]);
    assert_eq!(executor.owned.get(&500), Some(&2));
}
