//! League waiver-state initialization and the plain read surfaces.

use lgk_db::{budgets, leagues, priority, run_with_lock, wire, LockDomain};
use lgk_schemas::events::WaiverEvent;
use lgk_schemas::{FaabBudget, WaiverPriority, WaiverType, WaiverWireEntry};
use sqlx::PgPool;
use tracing::info;

use crate::error::WaiverError;
use crate::events::DeferredEvents;

/// Rows created by [`initialize_league`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InitializeOutcome {
    pub priorities_created: i64,
    pub budgets_created: i64,
}

/// Season bootstrap: every roster gets a priority slot (draft order =
/// roster number order) and, in FAAB leagues, a full budget. Idempotent —
/// re-running never reshuffles rosters that already hold a slot.
pub async fn initialize_league(
    pool: &PgPool,
    league_id: i64,
) -> Result<(InitializeOutcome, DeferredEvents), WaiverError> {
    let league = leagues::find_league(pool, league_id)
        .await?
        .ok_or_else(|| WaiverError::not_found("league not found"))?;

    run_with_lock(pool, LockDomain::Waiver, league_id, move |conn| {
        Box::pin(async move {
            let rosters = leagues::list_rosters(&mut *conn, league_id).await?;
            let roster_ids: Vec<i64> = rosters.iter().map(|r| r.id).collect();

            let priorities_created =
                priority::initialize_for_league(conn, league_id, league.season, &roster_ids)
                    .await?;

            let budgets_created = if league.settings.waiver_type == WaiverType::Faab {
                budgets::initialize_for_league(
                    conn,
                    league_id,
                    league.season,
                    &roster_ids,
                    league.settings.faab_budget,
                )
                .await?
            } else {
                0
            };

            info!(
                league_id,
                priorities_created, budgets_created, "league waiver state initialized"
            );

            let mut events = DeferredEvents::new();
            if priorities_created > 0 {
                let priorities = priority::get_by_league(&mut *conn, league_id, league.season).await?;
                events.push(league_id, WaiverEvent::WaiverPriorityUpdated { priorities });
            }

            Ok::<_, WaiverError>((
                InitializeOutcome {
                    priorities_created,
                    budgets_created,
                },
                events,
            ))
        })
    })
    .await
}

/// Current waiver order, best first.
pub async fn priority_list(
    pool: &PgPool,
    league_id: i64,
) -> Result<Vec<WaiverPriority>, WaiverError> {
    let league = leagues::find_league(pool, league_id)
        .await?
        .ok_or_else(|| WaiverError::not_found("league not found"))?;
    Ok(priority::get_by_league(pool, league_id, league.season).await?)
}

/// Current FAAB budgets. Empty for non-FAAB leagues.
pub async fn budget_list(pool: &PgPool, league_id: i64) -> Result<Vec<FaabBudget>, WaiverError> {
    let league = leagues::find_league(pool, league_id)
        .await?
        .ok_or_else(|| WaiverError::not_found("league not found"))?;
    Ok(budgets::get_by_league(pool, league_id, league.season).await?)
}

/// Everything currently on the league's wire.
pub async fn wire_list(pool: &PgPool, league_id: i64) -> Result<Vec<WaiverWireEntry>, WaiverError> {
    if leagues::find_league(pool, league_id).await?.is_none() {
        return Err(WaiverError::not_found("league not found"));
    }
    Ok(wire::get_by_league(pool, league_id).await?)
}
