//! Request and response DTOs for the HTTP surface.
//!
//! Domain rows from `lgk-schemas` serialize straight into responses; the
//! types here only cover request bodies and the envelopes that wrap lists.

use lgk_schemas::{
    ClaimDetails, FaabBudget, ProcessSummary, WaiverClaim, WaiverPriority, WaiverWireEntry,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitClaimRequest {
    pub player_id: i64,
    pub drop_player_id: Option<i64>,
    #[serde(default)]
    pub bid_amount: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClaimRequest {
    pub bid_amount: Option<i32>,
    pub drop_player_id: Option<i64>,
    /// Set to remove the conditional drop.
    #[serde(default)]
    pub clear_drop: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReorderClaimsRequest {
    pub claim_ids: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub claim: WaiverClaim,
}

#[derive(Debug, Serialize)]
pub struct ClaimsResponse {
    pub claims: Vec<WaiverClaim>,
}

#[derive(Debug, Serialize)]
pub struct LeagueClaimsResponse {
    pub claims: Vec<ClaimDetails>,
}

#[derive(Debug, Serialize)]
pub struct PriorityListResponse {
    pub priorities: Vec<WaiverPriority>,
}

#[derive(Debug, Serialize)]
pub struct BudgetListResponse {
    pub budgets: Vec<FaabBudget>,
}

#[derive(Debug, Serialize)]
pub struct WireListResponse {
    pub entries: Vec<WaiverWireEntry>,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub priorities_created: i64,
    pub budgets_created: i64,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    #[serde(flatten)]
    pub summary: ProcessSummary,
}
