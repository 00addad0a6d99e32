//! Scenario: Roster Limits, The Wire Gate, And Trade Fallout
//!
//! # Invariant under test
//! A claim without a drop is invalidated once the roster is at its size
//! limit, while an otherwise-identical claim with a drop still clears. A
//! player sitting on the wire admits claims submitted before its expiry.
//! Winning a claim expires open trades referencing the moved players, and
//! the trade ids surface on the outcome for post-commit emission.
//!
//! All tests are pure in-process; no DB or network required.

use chrono::Duration;
use lgk_schemas::WaiverType;
use lgk_testkit::{league_fixture, pending_claim, run_time, RosterSeed};
use lgk_waivers::resolver::{resolve_claims, Resolution, REASON_ROSTER_FULL};

#[tokio::test]
async fn full_roster_blocks_addition_without_a_drop() {
    let full: Vec<i64> = (1000..1015).collect(); // 15 players = the limit
    let (mut state, mut executor) = league_fixture(
        WaiverType::Standard,
        &[RosterSeed::new(1, 1).owns(&full)],
    );
    assert_eq!(state.rosters[&1].roster_count, 15);

    let no_drop = pending_claim(1, 1, 500, 1);
    let mut with_drop = pending_claim(2, 1, 501, 2);
    with_drop.drop_player_id = Some(1000);

    let claims = vec![no_drop, with_drop];
    let outcomes = resolve_claims(&claims, &mut state, &mut executor).await;

    assert_eq!(
        outcomes.iter().find(|o| o.claim_id == 1).unwrap().resolution,
        Resolution::Invalid {
            reason: REASON_ROSTER_FULL.to_string()
        }
    );
    assert!(outcomes.iter().find(|o| o.claim_id == 2).unwrap().is_successful());
    assert_eq!(state.rosters[&1].roster_count, 15, "drop-and-add is size-neutral");
}

#[tokio::test]
async fn wire_entry_admits_claims_submitted_before_expiry() {
    let (mut state, mut executor) =
        league_fixture(WaiverType::Standard, &[RosterSeed::new(1, 1)]);

    // player 500 sits on the wire, gate open until tomorrow; fixture claims
    // were submitted yesterday, i.e. before expiry
    state.wire.insert(500, run_time() + Duration::days(1));

    let claim = pending_claim(1, 1, 500, 1);
    let outcomes = resolve_claims(&[claim], &mut state, &mut executor).await;

    assert!(outcomes[0].is_successful());
    assert_eq!(executor.wire_removed, vec![500]);
    assert!(!state.wire.contains_key(&500), "winning the claim lifts the gate");
}

#[tokio::test]
async fn winning_claim_invalidates_trades_referencing_moved_players() {
    let (mut state, mut executor) = league_fixture(
        WaiverType::Standard,
        &[RosterSeed::new(1, 1).owns(&[50])],
    );

    // trade 900 references the claimed player, trade 901 the dropped one
    executor.open_trade(500, 900);
    executor.open_trade(50, 901);

    let mut claim = pending_claim(1, 1, 500, 1);
    claim.drop_player_id = Some(50);

    let outcomes = resolve_claims(&[claim], &mut state, &mut executor).await;

    match &outcomes[0].resolution {
        Resolution::Successful { invalidated_trades } => {
            assert_eq!(invalidated_trades, &vec![900, 901]);
        }
        other => panic!("expected success, got {other:?}"),
    }
}
