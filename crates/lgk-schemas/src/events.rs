//! Bus event payloads emitted by the waiver engine.
//!
//! Events are buffered during a transaction and published only after commit
//! (see `lgk_waivers::events::DeferredEvents`); a rollback discards them.
//! The daemon forwards them verbatim over its SSE stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FaabBudget, ProcessSummary, WaiverClaim, WaiverPriority};

/// Envelope for a single published event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BusEvent {
    pub event_id: Uuid,
    pub league_id: i64,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: WaiverEvent,
}

impl BusEvent {
    pub fn new(league_id: i64, payload: WaiverEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            league_id,
            ts: Utc::now(),
            payload,
        }
    }
}

/// Everything the waiver engine tells the outside world.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaiverEvent {
    WaiverClaimed { claim: WaiverClaim },
    WaiverClaimUpdated { claim: WaiverClaim },
    WaiverClaimsReordered { roster_id: i64, claim_ids: Vec<i64> },
    WaiverClaimCancelled { claim: WaiverClaim },
    WaiverClaimSuccessful { claim: WaiverClaim },
    WaiverClaimFailed { claim: WaiverClaim },
    WaiverPriorityUpdated { priorities: Vec<WaiverPriority> },
    WaiverBudgetUpdated { budgets: Vec<FaabBudget> },
    WaiverProcessed { summary: ProcessSummary },
    TradeInvalidated { trade_id: i64 },
}

impl WaiverEvent {
    /// Wire name of the event, as carried in the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            WaiverEvent::WaiverClaimed { .. } => "WAIVER_CLAIMED",
            WaiverEvent::WaiverClaimUpdated { .. } => "WAIVER_CLAIM_UPDATED",
            WaiverEvent::WaiverClaimsReordered { .. } => "WAIVER_CLAIMS_REORDERED",
            WaiverEvent::WaiverClaimCancelled { .. } => "WAIVER_CLAIM_CANCELLED",
            WaiverEvent::WaiverClaimSuccessful { .. } => "WAIVER_CLAIM_SUCCESSFUL",
            WaiverEvent::WaiverClaimFailed { .. } => "WAIVER_CLAIM_FAILED",
            WaiverEvent::WaiverPriorityUpdated { .. } => "WAIVER_PRIORITY_UPDATED",
            WaiverEvent::WaiverBudgetUpdated { .. } => "WAIVER_BUDGET_UPDATED",
            WaiverEvent::WaiverProcessed { .. } => "WAIVER_PROCESSED",
            WaiverEvent::TradeInvalidated { .. } => "TRADE_INVALIDATED",
        }
    }
}
